// JNI bindings for Android/JVM
// `MpvNative` is the Android class, `MpvNativeJvm` the desktop one. Both share
// the player registry with the C ABI.

use crate::{create_player, lookup, register_player, release_player, to_code, with_player};
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jboolean, jdouble, jint, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::{JNIEnv, JavaVM};
use mpv_bridge_core::{DrawTarget, Event, EventListener, MpvError, Result};
use std::ptr;
use std::sync::Arc;

const ON_EVENT_SIG: &str = "(IILjava/lang/String;Ljava/lang/String;)V";

fn jstring_to_string(env: &mut JNIEnv, jstr: &JString) -> Result<String> {
    if jstr.is_null() {
        return Err(MpvError::InvalidInput("null string argument".to_string()));
    }
    let java_str = env
        .get_string(jstr)
        .map_err(|e| MpvError::InvalidInput(e.to_string()))?;
    Ok(java_str.into())
}

fn string_to_jstring(env: &JNIEnv, s: &str) -> Result<jstring> {
    env.new_string(s)
        .map(|j| j.into_raw())
        .map_err(|e| MpvError::InvalidInput(e.to_string()))
}

fn to_jboolean(value: bool) -> jboolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// Forwards events to `listener.onEvent(int, int, String, String)`,
/// attaching the event thread to the VM for each call
struct JniListener {
    vm: JavaVM,
    listener: GlobalRef,
}

impl JniListener {
    fn new(env: &JNIEnv, listener: &JObject) -> jni::errors::Result<Self> {
        Ok(Self {
            vm: env.get_java_vm()?,
            listener: env.new_global_ref(listener)?,
        })
    }

    fn deliver(&self, event: &Event) -> jni::errors::Result<()> {
        let mut env = self.vm.attach_current_thread()?;
        let name = match event.name.as_deref() {
            Some(name) => JObject::from(env.new_string(name)?),
            None => JObject::null(),
        };
        let value = match event.value.as_deref() {
            Some(value) => JObject::from(env.new_string(value)?),
            None => JObject::null(),
        };

        let result = env.call_method(
            self.listener.as_obj(),
            "onEvent",
            ON_EVENT_SIG,
            &[
                JValue::Int(event.kind.id()),
                JValue::Int(event.error),
                JValue::Object(&name),
                JValue::Object(&value),
            ],
        );
        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        result.map(|_| ())
    }
}

impl EventListener for JniListener {
    fn on_event(&self, event: &Event) {
        if let Err(err) = self.deliver(event) {
            log::error!("Failed to deliver {} to Java listener: {}", event.kind, err);
        }
    }
}

// -----------------------------------------------------------------------------
// Shared implementations
// -----------------------------------------------------------------------------

fn create() -> jlong {
    let id = register_player(create_player());
    log::info!("Native player created with ID: {}", id);
    id
}

fn with_jstring(
    env: &mut JNIEnv,
    player_id: jlong,
    arg: &JString,
    f: impl FnOnce(&mpv_bridge_core::Player, &str) -> Result<()>,
) -> jint {
    match jstring_to_string(env, arg) {
        Ok(s) => to_code(with_player(player_id, |p| f(p, &s))) as jint,
        Err(err) => {
            log::error!("Failed to read string argument: {}", err);
            -1
        }
    }
}

fn set_property(env: &mut JNIEnv, player_id: jlong, name: &JString, value: &JString) -> jint {
    let args = jstring_to_string(env, name)
        .and_then(|n| jstring_to_string(env, value).map(|v| (n, v)));
    to_code(args.and_then(|(n, v)| with_player(player_id, |p| p.set_property(&n, &v)))) as jint
}

fn get_property(env: &mut JNIEnv, player_id: jlong, name: &JString) -> jstring {
    let value = jstring_to_string(env, name)
        .and_then(|n| with_player(player_id, |p| Ok(p.get_property(&n))))
        .ok()
        .flatten();
    match value {
        Some(v) => string_to_jstring(env, &v).unwrap_or(ptr::null_mut()),
        None => ptr::null_mut(),
    }
}

fn set_listener(env: &JNIEnv, player_id: jlong, listener: &JObject, throttle_ms: jlong) -> jint {
    let result = lookup(player_id).and_then(|player| {
        player.clear_subscribers();
        if !listener.is_null() {
            let jni_listener =
                JniListener::new(env, listener).map_err(|e| MpvError::InvalidInput(e.to_string()))?;
            player.subscribe(Arc::new(jni_listener), throttle_ms.max(0) as u64);
        }
        Ok(())
    });
    to_code(result) as jint
}

fn state_code(player_id: jlong) -> jint {
    lookup(player_id)
        .map(|p| p.display_state().code())
        .unwrap_or(-1)
}

fn release(player_id: jlong) -> jint {
    #[cfg(target_os = "android")]
    surface::release(player_id);
    if release_player(player_id) {
        0
    } else {
        -1
    }
}

// -----------------------------------------------------------------------------
// Android surfaces
// -----------------------------------------------------------------------------

#[cfg(target_os = "android")]
mod surface {
    use super::*;
    use once_cell::sync::Lazy;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::os::raw::c_void;

    #[link(name = "android")]
    extern "C" {
        fn ANativeWindow_fromSurface(env: *mut jni::sys::JNIEnv, surface: jni::sys::jobject) -> *mut c_void;
        fn ANativeWindow_release(window: *mut c_void);
    }

    /// ANativeWindow references held on behalf of each player
    static WINDOWS: Lazy<Mutex<HashMap<jlong, usize>>> = Lazy::new(|| Mutex::new(HashMap::new()));

    pub(super) fn release(player_id: jlong) {
        if let Some(window) = WINDOWS.lock().remove(&player_id) {
            unsafe { ANativeWindow_release(window as *mut c_void) };
        }
    }

    pub(super) fn attach(env: &JNIEnv, player_id: jlong, surface: &JObject) -> Result<()> {
        let player = lookup(player_id)?;
        if surface.is_null() {
            let result = player.detach();
            release(player_id);
            return result;
        }

        let window = unsafe { ANativeWindow_fromSurface(env.get_raw(), surface.as_raw()) };
        if window.is_null() {
            return Err(MpvError::InvalidInput("surface has no native window".to_string()));
        }

        let result = player.attach(DrawTarget::RawPointer(window as usize));
        let previous = WINDOWS.lock().insert(player_id, window as usize);
        if let Some(previous) = previous {
            unsafe { ANativeWindow_release(previous as *mut c_void) };
        }
        result
    }

    pub(super) fn detach(player_id: jlong) -> Result<()> {
        let result = with_player(player_id, |p| p.detach());
        release(player_id);
        result
    }
}

// -----------------------------------------------------------------------------
// Exported entry points
// -----------------------------------------------------------------------------

/// `int nativeX(long playerId)` entry points that forward to a player method
macro_rules! jni_status_fns {
    ($($name:ident => $method:ident;)*) => {$(
        #[no_mangle]
        pub extern "system" fn $name(_env: JNIEnv, _class: JClass, player_id: jlong) -> jint {
            to_code(with_player(player_id, |p| p.$method())) as jint
        }
    )*};
}

/// `int nativeX(long playerId, String arg)` entry points
macro_rules! jni_string_fns {
    ($($name:ident => $method:ident;)*) => {$(
        #[no_mangle]
        pub extern "system" fn $name(
            mut env: JNIEnv,
            _class: JClass,
            player_id: jlong,
            arg: JString,
        ) -> jint {
            with_jstring(&mut env, player_id, &arg, |p, s| p.$method(s))
        }
    )*};
}

jni_status_fns! {
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeInitialize => initialize;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativePlaylistNext => playlist_next;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativePlaylistPrev => playlist_prev;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativePlaylistClear => playlist_clear;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativePlay => play;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativePause => pause;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeTogglePause => toggle_pause;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeStop => stop;

    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeInitialize => initialize;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeDetach => detach;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativePlaylistNext => playlist_next;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativePlaylistPrev => playlist_prev;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativePlaylistClear => playlist_clear;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativePlay => play;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativePause => pause;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeTogglePause => toggle_pause;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeStop => stop;
}

jni_string_fns! {
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeCommand => command;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeLoad => load;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeLoadFile => load_file;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeAddToPlaylist => add_to_playlist;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeObserveProperty => observe_property;
    Java_com_guyuuan_mpv_1kmp_MpvNative_nativeUnobserveProperty => unobserve_property;

    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeCommand => command;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeLoad => load;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeLoadFile => load_file;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeAddToPlaylist => add_to_playlist;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeObserveProperty => observe_property;
    Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeUnobserveProperty => unobserve_property;
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeCreate(
    _env: JNIEnv,
    _class: JClass,
) -> jlong {
    create()
}

#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeAttachSurface(
    env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    surface: JObject,
) -> jint {
    to_code(surface::attach(&env, player_id, &surface)) as jint
}

#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeDetach(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    to_code(surface::detach(player_id)) as jint
}

#[cfg(not(target_os = "android"))]
#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeDetach(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    to_code(with_player(player_id, |p| p.detach())) as jint
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeSeek(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    position: jdouble,
) -> jint {
    to_code(with_player(player_id, |p| p.seek(position))) as jint
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeSetProperty(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    name: JString,
    value: JString,
) -> jint {
    set_property(&mut env, player_id, &name, &value)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeGetProperty(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    name: JString,
) -> jstring {
    get_property(&mut env, player_id, &name)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeIsPaused(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jboolean {
    to_jboolean(lookup(player_id).map(|p| p.is_paused()).unwrap_or(false))
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeIsLoading(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jboolean {
    to_jboolean(lookup(player_id).map(|p| p.is_loading()).unwrap_or(false))
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeGetTimePos(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jdouble {
    lookup(player_id).map(|p| p.time_pos()).unwrap_or(-1.0)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeGetDuration(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jdouble {
    lookup(player_id).map(|p| p.duration()).unwrap_or(-1.0)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeGetState(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    state_code(player_id)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeSetListener(
    env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    listener: JObject,
    throttle_ms: jlong,
) -> jint {
    set_listener(&env, player_id, &listener, throttle_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNative_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    release(player_id)
}

// JVM desktop bindings mirror the Android signatures but use MpvNativeJvm and
// take an AWT/native window id instead of a Surface.

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeCreate(
    _env: JNIEnv,
    _class: JClass,
) -> jlong {
    create()
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeAttachWindow(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    window_id: jlong,
) -> jint {
    let target = if window_id == 0 {
        DrawTarget::None
    } else {
        DrawTarget::WindowId(window_id as u64)
    };
    to_code(with_player(player_id, |p| p.attach(target))) as jint
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeSeek(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    position: jdouble,
) -> jint {
    to_code(with_player(player_id, |p| p.seek(position))) as jint
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeSetProperty(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    name: JString,
    value: JString,
) -> jint {
    set_property(&mut env, player_id, &name, &value)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeGetProperty(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    name: JString,
) -> jstring {
    get_property(&mut env, player_id, &name)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeIsPaused(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jboolean {
    to_jboolean(lookup(player_id).map(|p| p.is_paused()).unwrap_or(false))
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeIsLoading(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jboolean {
    to_jboolean(lookup(player_id).map(|p| p.is_loading()).unwrap_or(false))
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeGetTimePos(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jdouble {
    lookup(player_id).map(|p| p.time_pos()).unwrap_or(-1.0)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeGetDuration(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jdouble {
    lookup(player_id).map(|p| p.duration()).unwrap_or(-1.0)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeGetState(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    state_code(player_id)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeSetListener(
    env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    listener: JObject,
    throttle_ms: jlong,
) -> jint {
    set_listener(&env, player_id, &listener, throttle_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_guyuuan_mpv_1kmp_MpvNativeJvm_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    release(player_id)
}
