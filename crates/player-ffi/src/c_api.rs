// C ABI (iOS/macOS/native hosts)
// Every call takes the player id returned by `mpv_bridge_create`. Status-returning
// calls give 0 on success and a negative status on failure.

use crate::{create_player, lookup, register_player, release_player, to_code, with_player};
use mpv_bridge_core::{DrawTarget, Event, EventListener, MpvError, Player, Result};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::sync::Arc;

/// Event handed to a C callback. The strings are borrowed for the duration
/// of the call and may be null.
#[repr(C)]
pub struct MpvBridgeEvent {
    pub kind: i32,
    pub error: i32,
    pub name: *const c_char,
    pub value: *const c_char,
}

pub type MpvBridgeEventCallback = extern "C" fn(user_data: *mut c_void, event: *const MpvBridgeEvent);

struct CCallback {
    callback: MpvBridgeEventCallback,
    user_data: usize,
}

impl EventListener for CCallback {
    fn on_event(&self, event: &Event) {
        let name = event.name.as_deref().and_then(|s| CString::new(s).ok());
        let value = event.value.as_deref().and_then(|s| CString::new(s).ok());
        let raw = MpvBridgeEvent {
            kind: event.kind.id(),
            error: event.error,
            name: name.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
            value: value.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
        };
        (self.callback)(self.user_data as *mut c_void, &raw);
    }
}

fn str_arg<'a>(arg: *const c_char) -> Result<&'a str> {
    if arg.is_null() {
        return Err(MpvError::InvalidInput("null string argument".to_string()));
    }
    let c_str = unsafe { CStr::from_ptr(arg) };
    c_str
        .to_str()
        .map_err(|_| MpvError::InvalidInput("string argument is not UTF-8".to_string()))
}

fn with_str(player_id: i64, arg: *const c_char, f: impl FnOnce(&Player, &str) -> Result<()>) -> i32 {
    to_code(str_arg(arg).and_then(|s| with_player(player_id, |p| f(p, s))))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_create() -> i64 {
    register_player(create_player())
}

#[no_mangle]
pub extern "C" fn mpv_bridge_initialize(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.initialize()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_attach_window(player_id: i64, window_id: u64) -> i32 {
    to_code(with_player(player_id, |p| p.attach(DrawTarget::WindowId(window_id))))
}

/// Bind a native surface pointer (UIView*, ANativeWindow*, ...). Null detaches nothing and succeeds.
#[no_mangle]
pub extern "C" fn mpv_bridge_attach_pointer(player_id: i64, surface: *mut c_void) -> i32 {
    let target = if surface.is_null() {
        DrawTarget::None
    } else {
        DrawTarget::RawPointer(surface as usize)
    };
    to_code(with_player(player_id, |p| p.attach(target)))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_detach(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.detach()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_command(player_id: i64, command: *const c_char) -> i32 {
    with_str(player_id, command, |p, s| p.command(s))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_load(player_id: i64, uri: *const c_char) -> i32 {
    with_str(player_id, uri, |p, s| p.load(s))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_load_file(player_id: i64, path: *const c_char) -> i32 {
    with_str(player_id, path, |p, s| p.load_file(s))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_add_to_playlist(player_id: i64, uri: *const c_char) -> i32 {
    with_str(player_id, uri, |p, s| p.add_to_playlist(s))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_playlist_next(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.playlist_next()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_playlist_prev(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.playlist_prev()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_playlist_clear(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.playlist_clear()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_play(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.play()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_pause(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.pause()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_toggle_pause(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.toggle_pause()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_stop(player_id: i64) -> i32 {
    to_code(with_player(player_id, |p| p.stop()))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_seek(player_id: i64, position: f64) -> i32 {
    to_code(with_player(player_id, |p| p.seek(position)))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_set_property(
    player_id: i64,
    name: *const c_char,
    value: *const c_char,
) -> i32 {
    let args = str_arg(name).and_then(|n| str_arg(value).map(|v| (n, v)));
    to_code(args.and_then(|(n, v)| with_player(player_id, |p| p.set_property(n, v))))
}

/// Current value as a new C string, or null. Free with `mpv_bridge_free_string`.
#[no_mangle]
pub extern "C" fn mpv_bridge_get_property(player_id: i64, name: *const c_char) -> *mut c_char {
    let value = str_arg(name)
        .and_then(|n| with_player(player_id, |p| Ok(p.get_property(n))))
        .ok()
        .flatten();
    value
        .and_then(|v| CString::new(v).ok())
        .map_or(ptr::null_mut(), CString::into_raw)
}

#[no_mangle]
pub extern "C" fn mpv_bridge_free_string(value: *mut c_char) {
    if !value.is_null() {
        drop(unsafe { CString::from_raw(value) });
    }
}

#[no_mangle]
pub extern "C" fn mpv_bridge_observe_property(player_id: i64, name: *const c_char) -> i32 {
    with_str(player_id, name, |p, s| p.observe_property(s))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_unobserve_property(player_id: i64, name: *const c_char) -> i32 {
    with_str(player_id, name, |p, s| p.unobserve_property(s))
}

/// 1 paused, 0 not paused, -1 unknown id
#[no_mangle]
pub extern "C" fn mpv_bridge_is_paused(player_id: i64) -> i32 {
    lookup(player_id).map(|p| p.is_paused() as i32).unwrap_or(-1)
}

/// Seconds, or -1.0 for an unknown id
#[no_mangle]
pub extern "C" fn mpv_bridge_get_time_pos(player_id: i64) -> f64 {
    lookup(player_id).map(|p| p.time_pos()).unwrap_or(-1.0)
}

#[no_mangle]
pub extern "C" fn mpv_bridge_get_duration(player_id: i64) -> f64 {
    lookup(player_id).map(|p| p.duration()).unwrap_or(-1.0)
}

#[no_mangle]
pub extern "C" fn mpv_bridge_is_loading(player_id: i64) -> i32 {
    lookup(player_id).map(|p| p.is_loading() as i32).unwrap_or(-1)
}

/// 0 idle, 1 loading, 2 playing, 3 paused, -1 unknown id
#[no_mangle]
pub extern "C" fn mpv_bridge_get_state(player_id: i64) -> i32 {
    match lookup(player_id) {
        Ok(player) => player.display_state().code(),
        Err(err) => {
            log::error!("Failed to get state: {}", err);
            -1
        }
    }
}

/// Install (or with a null callback, remove) the event callback. `user_data`
/// is passed back untouched; the callback runs on the event thread.
#[no_mangle]
pub extern "C" fn mpv_bridge_set_event_callback(
    player_id: i64,
    callback: Option<MpvBridgeEventCallback>,
    user_data: *mut c_void,
    throttle_ms: u64,
) -> i32 {
    to_code(with_player(player_id, |p| {
        p.clear_subscribers();
        if let Some(callback) = callback {
            p.subscribe(
                Arc::new(CCallback {
                    callback,
                    user_data: user_data as usize,
                }),
                throttle_ms,
            );
        }
        Ok(())
    }))
}

#[no_mangle]
pub extern "C" fn mpv_bridge_release(player_id: i64) -> i32 {
    if release_player(player_id) {
        0
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpv_bridge_core::mock::MockEngine;
    use mpv_bridge_core::{Engine, PlayerConfig, RawEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn mock_player() -> (i64, Arc<MockEngine>) {
        let engine = Arc::new(MockEngine::new());
        let shared: Arc<dyn Engine> = engine.clone();
        let config = PlayerConfig::default().with_poll_timeout(Duration::from_millis(10));
        (register_player(Player::new(Some(shared), config)), engine)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        assert_eq!(mpv_bridge_play(-1), -1);
        assert_eq!(mpv_bridge_seek(-1, 3.0), -1);
        assert_eq!(mpv_bridge_get_state(-1), -1);
        assert_eq!(mpv_bridge_is_paused(-1), -1);
        assert_eq!(mpv_bridge_get_time_pos(-1), -1.0);
        assert!(mpv_bridge_get_property(-1, c"pause".as_ptr()).is_null());
        assert_eq!(mpv_bridge_release(-1), -1);
    }

    #[test]
    fn test_null_arguments_are_rejected() {
        let (id, engine) = mock_player();
        assert_eq!(mpv_bridge_initialize(id), 0);
        assert_eq!(mpv_bridge_load(id, ptr::null()), -1);
        assert_eq!(mpv_bridge_set_property(id, c"volume".as_ptr(), ptr::null()), -1);
        assert!(engine.commands().is_empty());
        mpv_bridge_release(id);
    }

    #[test]
    fn test_inert_player_reports_idle() {
        let id = register_player(Player::new(None, PlayerConfig::default()));
        assert_eq!(mpv_bridge_initialize(id), -1);
        assert_eq!(mpv_bridge_play(id), -1);
        assert_eq!(mpv_bridge_get_state(id), 0);
        assert_eq!(mpv_bridge_release(id), 0);
    }

    #[test]
    fn test_commands_reach_engine() {
        let (id, engine) = mock_player();
        assert_eq!(mpv_bridge_initialize(id), 0);
        assert_eq!(mpv_bridge_load_file(id, c"/a/b.mp4".as_ptr()), 0);
        assert_eq!(mpv_bridge_seek(id, 10.0), 0);
        assert_eq!(mpv_bridge_pause(id), 0);

        assert_eq!(
            engine.commands(),
            vec!["loadfile \"file:///a/b.mp4\"".to_string(), "seek 10 absolute".to_string()]
        );
        assert!(engine
            .property_writes()
            .contains(&("pause".to_string(), "yes".to_string())));
        assert_eq!(mpv_bridge_release(id), 0);
        assert_eq!(mpv_bridge_play(id), -1);
    }

    #[test]
    fn test_engine_status_passes_through() {
        let (id, engine) = mock_player();
        assert_eq!(mpv_bridge_initialize(id), 0);
        engine.fail_commands(-4);
        assert_eq!(mpv_bridge_command(id, c"stop".as_ptr()), -4);
        mpv_bridge_release(id);
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_pause(_user_data: *mut c_void, event: *const MpvBridgeEvent) {
        let event = unsafe { &*event };
        if event.kind == 22 && !event.name.is_null() {
            let name = unsafe { CStr::from_ptr(event.name) };
            if name.to_str() == Ok("pause") {
                CALLS.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_event_callback_receives_folded_events() {
        let (id, engine) = mock_player();
        assert_eq!(mpv_bridge_initialize(id), 0);
        assert_eq!(
            mpv_bridge_set_event_callback(id, Some(count_pause), ptr::null_mut(), 0),
            0
        );

        engine.push_event(RawEvent::property_change("pause", Some("yes")));
        assert!(wait_for(|| CALLS.load(Ordering::SeqCst) == 1));
        assert_eq!(mpv_bridge_is_paused(id), 1);
        assert_eq!(mpv_bridge_get_state(id), 3);
        mpv_bridge_release(id);
    }
}
