// libmpv-backed engine
// Wraps one mpv_handle. The handle lives behind a RwLock so terminate waits
// for in-flight calls and nothing touches it once destroyed.

use crate::loader::MpvLibrary;
use crate::raw::{self, mpv_event, mpv_event_property, mpv_handle};
use mpv_bridge_core::{DrawTarget, Engine, EventKind, MpvError, RawEvent, RawProperty, Result};
use parking_lot::RwLock;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct RawHandle(NonNull<mpv_handle>);

// libmpv's client API is thread-safe; the lock orders destruction against use
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

pub struct LibmpvEngine {
    lib: Arc<MpvLibrary>,
    handle: RwLock<Option<RawHandle>>,
    initialized: AtomicBool,
}

impl LibmpvEngine {
    /// Create a fresh, uninitialized engine instance
    pub fn create(lib: Arc<MpvLibrary>) -> Result<Self> {
        let ptr = unsafe { (lib.api().create)() };
        let handle = NonNull::new(ptr).ok_or_else(|| {
            MpvError::EngineUnavailable("mpv_create returned null".to_string())
        })?;
        log::info!("mpv instance created");

        Ok(Self {
            lib,
            handle: RwLock::new(Some(RawHandle(handle))),
            initialized: AtomicBool::new(false),
        })
    }

    /// Run `f` against the live handle
    fn with_handle<R>(&self, f: impl FnOnce(*mut mpv_handle) -> R) -> Result<R> {
        let guard = self.handle.read();
        match guard.as_ref() {
            Some(handle) => Ok(f(handle.0.as_ptr())),
            None => Err(MpvError::Terminated),
        }
    }

    fn set_property_string(&self, name: &str, value: &str) -> Result<()> {
        let c_name = c_string(name)?;
        let c_value = c_string(value)?;
        let api = self.lib.api();
        let code = self.with_handle(|h| unsafe {
            (api.set_property_string)(h, c_name.as_ptr(), c_value.as_ptr())
        })?;
        check(code, MpvError::PropertySetFailed)
    }
}

impl Engine for LibmpvEngine {
    fn initialize(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let api = self.lib.api();
        let code = self.with_handle(|h| unsafe { (api.initialize)(h) })?;
        check(code, MpvError::InitFailed)?;
        self.initialized.store(true, Ordering::Release);
        log::info!("mpv instance initialized");
        Ok(())
    }

    fn set_option(&self, name: &str, value: &str) -> Result<()> {
        let c_name = c_string(name)?;
        let c_value = c_string(value)?;
        let api = self.lib.api();
        let code = self.with_handle(|h| unsafe {
            (api.set_option_string)(h, c_name.as_ptr(), c_value.as_ptr())
        })?;
        check(code, MpvError::PropertySetFailed)
    }

    fn attach(&self, target: DrawTarget) -> Result<()> {
        let mut wid = match target.window_id() {
            Some(wid) => wid,
            None => return Ok(()),
        };
        let api = self.lib.api();
        let code = self.with_handle(|h| unsafe {
            (api.set_property)(
                h,
                c"wid".as_ptr(),
                raw::MPV_FORMAT_INT64,
                &mut wid as *mut i64 as *mut c_void,
            )
        })?;
        check(code, MpvError::PropertySetFailed)
    }

    fn detach(&self) -> Result<()> {
        self.set_property_string("wid", "0")
    }

    fn command(&self, text: &str) -> Result<()> {
        let c_text = c_string(text)?;
        let api = self.lib.api();
        let code = self.with_handle(|h| unsafe { (api.command_string)(h, c_text.as_ptr()) })?;
        check(code, MpvError::CommandFailed)
    }

    fn set_property(&self, name: &str, value: &str) -> Result<()> {
        self.set_property_string(name, value)
    }

    fn get_property(&self, name: &str) -> Option<String> {
        let c_name = CString::new(name).ok()?;
        let api = self.lib.api();
        self.with_handle(|h| unsafe {
            let ptr = (api.get_property_string)(h, c_name.as_ptr());
            if ptr.is_null() {
                return None;
            }
            let value = CStr::from_ptr(ptr).to_string_lossy().into_owned();
            (api.free)(ptr as *mut c_void);
            Some(value)
        })
        .ok()
        .flatten()
    }

    fn observe(&self, reply_id: u64, name: &str) -> Result<()> {
        let c_name = c_string(name)?;
        let api = self.lib.api();
        let code = self.with_handle(|h| unsafe {
            (api.observe_property)(h, reply_id, c_name.as_ptr(), raw::MPV_FORMAT_STRING)
        })?;
        check(code, MpvError::ObserveFailed)
    }

    fn unobserve(&self, reply_id: u64) -> Result<()> {
        let api = self.lib.api();
        let code = self.with_handle(|h| unsafe { (api.unobserve_property)(h, reply_id) })?;
        check(code, MpvError::ObserveFailed)
    }

    fn wait_event(&self, timeout: Duration) -> Option<RawEvent> {
        let api = self.lib.api();
        // The record is only valid until the next wait, so copy it under the lock
        self.with_handle(|h| unsafe {
            let event = (api.wait_event)(h, timeout.as_secs_f64());
            event.as_ref().and_then(|event| copy_event(event))
        })
        .ok()
        .flatten()
    }

    fn wakeup(&self) {
        // Recursive read so a queued terminate never blocks the wakeup it waits for
        let guard = self.handle.read_recursive();
        if let Some(handle) = guard.as_ref() {
            unsafe { (self.lib.api().wakeup)(handle.0.as_ptr()) };
        }
    }

    fn terminate(&self) {
        self.wakeup();
        let handle = self.handle.write().take();
        if let Some(handle) = handle {
            unsafe { (self.lib.api().terminate_destroy)(handle.0.as_ptr()) };
            self.initialized.store(false, Ordering::Release);
            log::info!("mpv instance destroyed");
        }
    }

    fn is_alive(&self) -> bool {
        self.handle.read().is_some()
    }
}

impl Drop for LibmpvEngine {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| MpvError::InvalidInput(format!("string contains NUL: {:?}", value)))
}

fn check(code: c_int, err: fn(i32) -> MpvError) -> Result<()> {
    if code < 0 {
        log::warn!("mpv call failed: {}", err(code));
        Err(err(code))
    } else {
        Ok(())
    }
}

/// Owned copy of a native event record. `None` for the "no event" record.
///
/// # Safety
/// `event.data` must be null or point at the payload libmpv documents for `event.event_id`.
pub(crate) unsafe fn copy_event(event: &mpv_event) -> Option<RawEvent> {
    if event.event_id == raw::MPV_EVENT_NONE {
        return None;
    }

    let carries_property = EventKind::from_id(event.event_id).carries_property();
    let property = if carries_property && !event.data.is_null() {
        Some(copy_property(&*(event.data as *const mpv_event_property)))
    } else {
        None
    };

    Some(RawEvent {
        event_id: event.event_id,
        error: event.error,
        reply_userdata: event.reply_userdata,
        property,
    })
}

/// # Safety
/// `prop.name` must be null or a C string; `prop.data` must match `prop.format`.
pub(crate) unsafe fn copy_property(prop: &mpv_event_property) -> RawProperty {
    let name = if prop.name.is_null() {
        None
    } else {
        Some(CStr::from_ptr(prop.name).to_string_lossy().into_owned())
    };

    let value = if prop.data.is_null() {
        None
    } else {
        match prop.format {
            raw::MPV_FORMAT_STRING | raw::MPV_FORMAT_OSD_STRING => {
                let text = *(prop.data as *const *const c_char);
                if text.is_null() {
                    None
                } else {
                    Some(CStr::from_ptr(text).to_string_lossy().into_owned())
                }
            }
            raw::MPV_FORMAT_FLAG => {
                let flag = *(prop.data as *const c_int);
                Some(if flag != 0 { "yes" } else { "no" }.to_string())
            }
            raw::MPV_FORMAT_INT64 => Some((*(prop.data as *const i64)).to_string()),
            raw::MPV_FORMAT_DOUBLE => Some((*(prop.data as *const f64)).to_string()),
            _ => None,
        }
    };

    RawProperty { name, value }
}
