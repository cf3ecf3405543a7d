// Listener plumbing for decoded engine events
// Subscribers added on top of the facade can throttle high-frequency time-pos updates

use crate::event::Event;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receives decoded events on the bridge thread.
/// Implementations should return quickly; the next event waits on them.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> EventListener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Throttled listener wrapper
/// Rate-limits `time-pos` change notifications; every other event passes through
pub struct ThrottledListener {
    inner: Arc<dyn EventListener>,
    last_position_update: Mutex<Option<Instant>>,
    position_update_interval: Duration,
}

impl ThrottledListener {
    pub fn new(listener: Arc<dyn EventListener>, update_interval_ms: u64) -> Self {
        Self {
            inner: listener,
            last_position_update: Mutex::new(None),
            position_update_interval: Duration::from_millis(update_interval_ms),
        }
    }

    pub fn dispatch(&self, event: &Event) {
        if event.changed_property() == Some("time-pos") && !self.position_update_interval.is_zero() {
            let mut last_update = self.last_position_update.lock();
            let due = last_update
                .map(|at| at.elapsed() >= self.position_update_interval)
                .unwrap_or(true);
            if !due {
                return;
            }
            *last_update = Some(Instant::now());
        }
        self.inner.on_event(event);
    }
}

/// Fan-out to any number of subscribers, in subscription order
#[derive(Default)]
pub struct ListenerSet {
    listeners: Mutex<Vec<Arc<ThrottledListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn EventListener>, throttle_ms: u64) {
        let throttled = Arc::new(ThrottledListener::new(listener, throttle_ms));
        self.listeners.lock().push(throttled);
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispatch(&self, event: &Event) {
        // Snapshot so a subscriber may add/clear listeners from its callback
        let listeners: Vec<_> = self.listeners.lock().clone();
        for listener in listeners {
            listener.dispatch(event);
        }
    }
}

/// Recording listener for tests
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(any(test, feature = "test-util"))]
impl EventListener for RecordingListener {
    fn on_event(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use std::thread;

    #[test]
    fn test_throttled_time_pos() {
        let recorder = Arc::new(RecordingListener::new());
        let throttled = ThrottledListener::new(recorder.clone(), 100);

        // Send multiple position updates rapidly
        for i in 0..10 {
            let value = format!("{}.0", i);
            throttled.dispatch(&Event::property_change("time-pos", Some(&value)));
            thread::sleep(Duration::from_millis(10));
        }

        let events = recorder.events();
        assert!(!events.is_empty());
        assert!(events.len() < 10);
        assert_eq!(events[0].value.as_deref(), Some("0.0"));
    }

    #[test]
    fn test_non_throttled_events() {
        let recorder = Arc::new(RecordingListener::new());
        let throttled = ThrottledListener::new(recorder.clone(), 100);

        throttled.dispatch(&Event::new(EventKind::StartFile));
        throttled.dispatch(&Event::property_change("duration", Some("10")));
        throttled.dispatch(&Event::property_change("duration", Some("11")));
        throttled.dispatch(&Event::new(EventKind::FileLoaded));

        assert_eq!(recorder.len(), 4);
    }

    #[test]
    fn test_zero_interval_disables_throttling() {
        let recorder = Arc::new(RecordingListener::new());
        let throttled = ThrottledListener::new(recorder.clone(), 0);
        for _ in 0..5 {
            throttled.dispatch(&Event::property_change("time-pos", Some("1.0")));
        }
        assert_eq!(recorder.len(), 5);
    }

    #[test]
    fn test_listener_set_fans_out_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();
        for tag in ["first", "second"] {
            let order = order.clone();
            set.add(Arc::new(move |_: &Event| order.lock().push(tag)), 0);
        }

        set.dispatch(&Event::new(EventKind::Idle));
        assert_eq!(*order.lock(), vec!["first", "second"]);

        set.clear();
        set.dispatch(&Event::new(EventKind::Idle));
        assert_eq!(order.lock().len(), 2);
        assert!(set.is_empty());
    }
}
