// Player facade
// Issues fire-and-forget commands to the engine and folds the event stream into
// an observable state that UI code can poll from any thread.

use crate::bridge::EventBridge;
use crate::callback::{EventListener, ListenerSet};
use crate::command;
use crate::config::PlayerConfig;
use crate::engine::{DrawTarget, Engine};
use crate::error::{MpvError, Result};
use crate::event::{Event, EventKind};
use crate::state::{DisplayState, ObservableState, PlaybackSnapshot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Facade lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// Constructed, `initialize` not called yet
    Created,
    /// Engine initialized, bridge running, properties observed
    Ready,
    /// Setup failed; commands have no effect
    Inert(MpvError),
    /// The engine shut itself down; `dispose` still releases it
    Shutdown,
    /// Engine terminated and bridge stopped
    Disposed,
}

/// Bridge listener: fold into state first, then notify subscribers
struct StateFold {
    state: Arc<ObservableState>,
    subscribers: Arc<ListenerSet>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl EventListener for StateFold {
    fn on_event(&self, event: &Event) {
        self.state.fold(event);
        if event.kind == EventKind::Shutdown {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle == Lifecycle::Ready {
                *lifecycle = Lifecycle::Shutdown;
                log::info!("engine shut down, player no longer accepts commands");
            }
        }
        self.subscribers.dispatch(event);
    }
}

/// Property observations keyed by name, each under its own reply id
struct Observations {
    next_id: u64,
    by_name: HashMap<String, u64>,
}

impl Observations {
    fn new() -> Self {
        Self {
            next_id: 1,
            by_name: HashMap::new(),
        }
    }
}

pub struct Player {
    engine: Option<Arc<dyn Engine>>,
    bridge: Option<EventBridge>,
    state: Arc<ObservableState>,
    subscribers: Arc<ListenerSet>,
    observations: Mutex<Observations>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    config: PlayerConfig,
}

impl Player {
    /// `engine` is `None` when the engine could not be created; the player is
    /// then inert and `initialize` reports `EngineUnavailable`.
    pub fn new(engine: Option<Arc<dyn Engine>>, config: PlayerConfig) -> Self {
        let bridge = engine
            .as_ref()
            .map(|engine| EventBridge::new(engine.clone(), config.poll_timeout));

        Self {
            engine,
            bridge,
            state: Arc::new(ObservableState::new()),
            subscribers: Arc::new(ListenerSet::new()),
            observations: Mutex::new(Observations::new()),
            lifecycle: Arc::new(Mutex::new(Lifecycle::Created)),
            config,
        }
    }

    /// Start the engine, bind the state fold to the event bridge and observe
    /// the configured properties. On failure the player stays inert.
    pub fn initialize(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::Ready => return Ok(()),
            Lifecycle::Disposed | Lifecycle::Shutdown => return Err(MpvError::Terminated),
            Lifecycle::Inert(err) => return Err(err.clone()),
            Lifecycle::Created => {}
        }

        let result = match (&self.engine, &self.bridge) {
            (Some(engine), Some(bridge)) => self.setup(&**engine, bridge),
            _ => Err(MpvError::EngineUnavailable("no engine instance".to_string())),
        };

        match result {
            Ok(()) => {
                *lifecycle = Lifecycle::Ready;
                log::info!("player ready");
                Ok(())
            }
            Err(err) => {
                log::error!("player setup failed, staying inert: {}", err);
                *lifecycle = Lifecycle::Inert(err.clone());
                Err(err)
            }
        }
    }

    fn setup(&self, engine: &dyn Engine, bridge: &EventBridge) -> Result<()> {
        for (name, value) in &self.config.options {
            if let Err(err) = engine.set_option(name, value) {
                log::warn!("option {}={} rejected: {}", name, value, err);
            }
        }

        engine.initialize()?;

        bridge.start(Arc::new(StateFold {
            state: self.state.clone(),
            subscribers: self.subscribers.clone(),
            lifecycle: self.lifecycle.clone(),
        }))?;

        for name in &self.config.observed_properties {
            if let Err(err) = self.register_observation(engine, name) {
                log::warn!("could not observe {}: {}", name, err);
            }
        }
        Ok(())
    }

    fn live_engine(&self) -> Result<&dyn Engine> {
        match &*self.lifecycle.lock() {
            Lifecycle::Ready => self
                .engine
                .as_deref()
                .ok_or(MpvError::NotInitialized),
            Lifecycle::Disposed | Lifecycle::Shutdown => Err(MpvError::Terminated),
            Lifecycle::Created | Lifecycle::Inert(_) => Err(MpvError::NotInitialized),
        }
    }

    /// Send a raw command string
    pub fn command(&self, text: &str) -> Result<()> {
        let engine = self.live_engine()?;
        log::debug!("command: {}", text);
        engine.command(text).map_err(|err| {
            log::debug!("command {:?} failed: {}", text, err);
            err
        })
    }

    /// Replace the current entry with `uri`
    pub fn load(&self, uri: &str) -> Result<()> {
        self.command(&command::loadfile(uri)?)
    }

    /// Load a local path, prefixing `file://` when needed
    pub fn load_file(&self, path: &str) -> Result<()> {
        self.load(&command::file_uri(path))
    }

    pub fn add_to_playlist(&self, uri: &str) -> Result<()> {
        self.command(&command::append(uri)?)
    }

    pub fn playlist_next(&self) -> Result<()> {
        self.command(command::PLAYLIST_NEXT)
    }

    pub fn playlist_prev(&self) -> Result<()> {
        self.command(command::PLAYLIST_PREV)
    }

    pub fn playlist_clear(&self) -> Result<()> {
        self.command(command::PLAYLIST_CLEAR)
    }

    pub fn play(&self) -> Result<()> {
        self.set_property("pause", "no")
    }

    pub fn pause(&self) -> Result<()> {
        self.set_property("pause", "yes")
    }

    /// Flip pause based on the last observed state
    pub fn toggle_pause(&self) -> Result<()> {
        if self.state.is_paused() {
            self.play()
        } else {
            self.pause()
        }
    }

    pub fn stop(&self) -> Result<()> {
        self.command(command::STOP)
    }

    /// Absolute seek, in seconds
    pub fn seek(&self, position: f64) -> Result<()> {
        self.command(&command::seek_absolute(position)?)
    }

    pub fn set_property(&self, name: &str, value: &str) -> Result<()> {
        self.live_engine()?.set_property(name, value)
    }

    pub fn get_property(&self, name: &str) -> Option<String> {
        self.live_engine().ok()?.get_property(name)
    }

    pub fn attach(&self, target: DrawTarget) -> Result<()> {
        self.live_engine()?.attach(target)
    }

    pub fn detach(&self) -> Result<()> {
        self.live_engine()?.detach()
    }

    /// Observe `name`; a name already observed is left as is
    pub fn observe_property(&self, name: &str) -> Result<()> {
        let engine = self.live_engine()?;
        self.register_observation(engine, name)
    }

    /// Stop observing `name`
    pub fn unobserve_property(&self, name: &str) -> Result<()> {
        let engine = self.live_engine()?;
        let mut observations = self.observations.lock();
        let reply_id = *observations
            .by_name
            .get(name)
            .ok_or_else(|| MpvError::NotObserved(name.to_string()))?;
        engine.unobserve(reply_id)?;
        observations.by_name.remove(name);
        log::debug!("unobserved {} (reply id {})", name, reply_id);
        Ok(())
    }

    pub fn observed_properties(&self) -> Vec<String> {
        let observations = self.observations.lock();
        let mut names: Vec<(u64, String)> = observations
            .by_name
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();
        names.sort();
        names.into_iter().map(|(_, name)| name).collect()
    }

    fn register_observation(&self, engine: &dyn Engine, name: &str) -> Result<()> {
        let mut observations = self.observations.lock();
        if observations.by_name.contains_key(name) {
            return Ok(());
        }
        let reply_id = observations.next_id;
        engine.observe(reply_id, name)?;
        observations.next_id += 1;
        observations.by_name.insert(name.to_string(), reply_id);
        log::debug!("observing {} (reply id {})", name, reply_id);
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn time_pos(&self) -> f64 {
        self.state.time_pos()
    }

    pub fn duration(&self) -> f64 {
        self.state.duration()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.snapshot()
    }

    /// Shared handle to the observable fields
    pub fn state(&self) -> Arc<ObservableState> {
        self.state.clone()
    }

    pub fn display_state(&self) -> DisplayState {
        if self.is_ready() {
            self.state.display_state()
        } else {
            DisplayState::Idle
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.lock().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Ready)
    }

    /// Whether the event bridge thread is currently polling
    pub fn is_polling(&self) -> bool {
        self.bridge
            .as_ref()
            .map(|bridge| bridge.is_running())
            .unwrap_or(false)
    }

    /// Receive every event after it has been folded into state.
    /// `throttle_ms > 0` rate-limits `time-pos` changes for this subscriber.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>, throttle_ms: u64) {
        self.subscribers.add(listener, throttle_ms);
    }

    pub fn clear_subscribers(&self) {
        self.subscribers.clear();
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Stop the bridge, then terminate the engine. Idempotent.
    pub fn dispose(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle == Lifecycle::Disposed {
                return;
            }
            *lifecycle = Lifecycle::Disposed;
        }

        if let Some(bridge) = &self.bridge {
            bridge.stop();
        }
        if let Some(engine) = &self.engine {
            engine.terminate();
        }
        self.subscribers.clear();
        log::info!("player disposed");
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.dispose();
    }
}
