// FFI bridge for the mpv player
// Provides C ABI + JNI entrypoints over a registry of player facades.

use mpv_bridge_core::{MpvError, Player, PlayerConfig, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Once};

pub mod c_api;

#[cfg(any(feature = "android", feature = "desktop"))]
mod jni_bridge;

static PLAYER_REGISTRY: Lazy<Mutex<HashMap<i64, Arc<Player>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_PLAYER_ID: Lazy<Mutex<i64>> = Lazy::new(|| Mutex::new(1));
static INIT_LOGGER: Once = Once::new();

/// Install the platform log backend once per process
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("mpvbridge"),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            )
            .try_init();
        }
    });
}

/// Build a player over a fresh libmpv instance. When libmpv cannot be loaded
/// or instantiated the player is still returned, inert.
pub fn create_player() -> Player {
    init_logging();
    let config = PlayerConfig::from_env();

    match mpv_bridge_libmpv::create_engine() {
        Ok(engine) => Player::new(Some(engine), config),
        Err(err) => {
            log::warn!("mpv engine unavailable, player will be inert: {}", err);
            Player::new(None, config)
        }
    }
}

pub(crate) fn register_player(player: Player) -> i64 {
    init_logging();
    let mut next = NEXT_PLAYER_ID.lock();
    let id = *next;
    *next += 1;
    drop(next);

    PLAYER_REGISTRY.lock().insert(id, Arc::new(player));
    log::info!("player {} registered", id);
    id
}

/// Clone the player out so the registry lock is not held across engine calls
pub(crate) fn lookup(id: i64) -> Result<Arc<Player>> {
    PLAYER_REGISTRY
        .lock()
        .get(&id)
        .cloned()
        .ok_or_else(|| MpvError::InvalidInput(format!("unknown player id {}", id)))
}

pub(crate) fn with_player<R>(id: i64, f: impl FnOnce(&Player) -> Result<R>) -> Result<R> {
    let player = lookup(id)?;
    f(&player)
}

/// Remove and dispose a player. Returns false for unknown ids.
pub(crate) fn release_player(id: i64) -> bool {
    let removed = PLAYER_REGISTRY.lock().remove(&id);
    match removed {
        Some(player) => {
            player.dispose();
            log::info!("player {} released", id);
            true
        }
        None => false,
    }
}

pub(crate) fn to_code(result: Result<()>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            log::error!("FFI error: {}", err);
            err.status_code()
        }
    }
}
