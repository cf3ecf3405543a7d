// Engine capability
// All platform-specific engine implementations must implement this trait

use crate::error::Result;
use crate::event::RawEvent;
use std::time::Duration;

/// Platform drawable the engine renders into, resolved once at the platform boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    /// Integer window handle (X11 window, HWND, ...)
    WindowId(u64),
    /// Pointer-sized surface handle (ANativeWindow*, UIView*, ...)
    RawPointer(usize),
    /// Nothing to bind
    None,
}

impl DrawTarget {
    /// Value written to the engine's `wid` property, if any
    pub fn window_id(self) -> Option<i64> {
        match self {
            DrawTarget::WindowId(wid) => Some(wid as i64),
            DrawTarget::RawPointer(ptr) => Some(ptr as i64),
            DrawTarget::None => None,
        }
    }
}

/// One live instance of the external playback engine.
///
/// Methods take `&self`; implementations synchronize internally. Once
/// [`Engine::terminate`] has run, every other call must fail with
/// `MpvError::Terminated`, return `None`, or do nothing.
pub trait Engine: Send + Sync {
    /// One-time startup. Succeeds without reinitializing on a live, initialized handle.
    fn initialize(&self) -> Result<()>;

    /// Write an option before `initialize`
    fn set_option(&self, name: &str, value: &str) -> Result<()>;

    /// Bind a draw target. `DrawTarget::None` is a no-op.
    fn attach(&self, target: DrawTarget) -> Result<()>;

    /// Clear the draw target binding
    fn detach(&self) -> Result<()>;

    /// Run a command string synchronously
    fn command(&self, text: &str) -> Result<()>;

    fn set_property(&self, name: &str, value: &str) -> Result<()>;

    fn get_property(&self, name: &str) -> Option<String>;

    /// Ask for `PropertyChange` events for `name`, tagged with `reply_id`
    fn observe(&self, reply_id: u64, name: &str) -> Result<()>;

    /// Drop every observation registered under `reply_id`
    fn unobserve(&self, reply_id: u64) -> Result<()>;

    /// Block up to `timeout` for the next event. `None` on timeout.
    /// Only one thread may wait on a handle at a time.
    fn wait_event(&self, timeout: Duration) -> Option<RawEvent>;

    /// Make a pending `wait_event` return immediately
    fn wakeup(&self);

    /// Wake any waiter, then destroy the instance
    fn terminate(&self);

    fn is_alive(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_target_window_id() {
        assert_eq!(DrawTarget::WindowId(42).window_id(), Some(42));
        assert_eq!(DrawTarget::RawPointer(0x1000).window_id(), Some(0x1000));
        assert_eq!(DrawTarget::None.window_id(), None);
    }
}
