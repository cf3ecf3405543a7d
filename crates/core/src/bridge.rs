// Event bridge
// Drains the engine's event queue on one background thread and hands each
// decoded event to the registered listener, in receipt order.

use crate::callback::EventListener;
use crate::engine::Engine;
use crate::error::{MpvError, Result};
use crate::event::{Event, EventKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type ListenerSlot = Arc<Mutex<Option<Arc<dyn EventListener>>>>;

pub struct EventBridge {
    engine: Arc<dyn Engine>,
    poll_timeout: Duration,
    running: Arc<AtomicBool>,
    /// Set by `stop`; a closed bridge never spawns again
    closed: AtomicBool,
    listener: ListenerSlot,
    worker: Mutex<Option<JoinHandle<()>>>,
    spawned: AtomicUsize,
}

impl EventBridge {
    pub fn new(engine: Arc<dyn Engine>, poll_timeout: Duration) -> Self {
        Self {
            engine,
            poll_timeout,
            running: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            listener: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Install `listener` and make sure the poll thread is running.
    /// While a worker is alive this only swaps the listener.
    pub fn start(&self, listener: Arc<dyn EventListener>) -> Result<()> {
        let mut worker = self.worker.lock();
        if self.closed.load(Ordering::SeqCst) {
            return Err(MpvError::Terminated);
        }

        *self.listener.lock() = Some(listener);

        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() {
                log::debug!("event bridge already running, listener replaced");
                return Ok(());
            }
        }
        // Reap a worker that ended on its own (engine shutdown)
        if let Some(handle) = worker.take() {
            let _ = handle.join();
        }

        if !self.engine.is_alive() {
            return Err(MpvError::Terminated);
        }

        self.running.store(true, Ordering::Release);
        let engine = self.engine.clone();
        let running = self.running.clone();
        let slot = self.listener.clone();
        let timeout = self.poll_timeout;

        let handle = thread::Builder::new()
            .name("mpv-event-bridge".to_string())
            .spawn(move || poll_loop(engine, running, slot, timeout))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                log::error!("failed to spawn event bridge: {}", e);
                e
            })?;

        self.spawned.fetch_add(1, Ordering::SeqCst);
        *worker = Some(handle);
        log::info!("event bridge started (poll timeout {:?})", timeout);
        Ok(())
    }

    /// Two-phase shutdown: clear `running`, wake the engine, join the worker.
    /// The bridge stays closed afterwards.
    pub fn stop(&self) {
        let handle = {
            let mut worker = self.worker.lock();
            self.closed.store(true, Ordering::SeqCst);
            self.running.store(false, Ordering::Release);
            worker.take()
        };

        self.engine.wakeup();

        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                // Called from a listener; the loop exits once this callback returns
                log::debug!("event bridge stopped from its own worker, not joining");
            } else if handle.join().is_err() {
                log::error!("event bridge worker panicked");
            } else {
                log::info!("event bridge stopped");
            }
        }

        self.listener.lock().take();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self
                .worker
                .lock()
                .as_ref()
                .map(|handle| !handle.is_finished())
                .unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of worker threads spawned over this bridge's lifetime
    pub fn spawned_workers(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(
    engine: Arc<dyn Engine>,
    running: Arc<AtomicBool>,
    listener: ListenerSlot,
    timeout: Duration,
) {
    log::debug!("event bridge worker entered");
    let mut delivered: u64 = 0;

    while running.load(Ordering::Acquire) {
        let raw = match engine.wait_event(timeout) {
            Some(raw) => raw,
            None if engine.is_alive() => continue,
            None => {
                // A terminated engine answers every wait immediately
                log::info!("engine terminated under the event bridge, exiting");
                break;
            }
        };

        let event = Event::decode(raw);
        if event.kind == EventKind::None {
            log::debug!("forwarding unrecognized engine event");
        } else {
            log::trace!("event: {} name={:?} value={:?}", event.kind, event.name, event.value);
        }

        // Clone out so the slot is not locked while the listener runs
        let current = listener.lock().clone();
        if let Some(current) = current {
            current.on_event(&event);
            delivered += 1;
        }

        if event.kind == EventKind::Shutdown {
            log::info!("engine shut down, event bridge exiting");
            break;
        }
    }

    running.store(false, Ordering::Release);
    log::debug!("event bridge worker exited after {} events", delivered);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::RecordingListener;
    use crate::event::RawEvent;
    use crate::mock::MockEngine;
    use std::time::Instant;

    const FAST_POLL: Duration = Duration::from_millis(10);

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_events_delivered_in_order() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), FAST_POLL);
        let recorder = Arc::new(RecordingListener::new());

        for id in [6, 22, 8, 7] {
            engine.push_event(RawEvent::new(id));
        }
        bridge.start(recorder.clone()).unwrap();

        assert!(wait_for(|| recorder.len() == 4));
        let kinds: Vec<_> = recorder.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::StartFile, EventKind::PropertyChange, EventKind::FileLoaded, EventKind::EndFile]
        );
        bridge.stop();
    }

    #[test]
    fn test_unrecognized_ids_are_forwarded() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), FAST_POLL);
        let recorder = Arc::new(RecordingListener::new());
        bridge.start(recorder.clone()).unwrap();

        engine.push_event(RawEvent::new(99));
        engine.push_event(RawEvent::new(-7));
        engine.push_event(RawEvent::new(11));

        assert!(wait_for(|| recorder.len() == 3));
        let kinds: Vec<_> = recorder.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::None, EventKind::None, EventKind::Idle]);
        bridge.stop();
    }

    #[test]
    fn test_timeouts_never_reach_listener() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), FAST_POLL);
        let recorder = Arc::new(RecordingListener::new());
        bridge.start(recorder.clone()).unwrap();

        assert!(wait_for(|| engine.timeouts() >= 5));
        assert!(recorder.is_empty());
        bridge.stop();
    }

    #[test]
    fn test_restart_does_not_spawn_second_worker() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), FAST_POLL);
        let first = Arc::new(RecordingListener::new());
        let second = Arc::new(RecordingListener::new());

        bridge.start(first.clone()).unwrap();
        bridge.start(second.clone()).unwrap();
        assert_eq!(bridge.spawned_workers(), 1);

        engine.push_event(RawEvent::new(EventKind::Tick.id()));
        assert!(wait_for(|| second.len() == 1));
        assert!(first.is_empty());
        bridge.stop();
    }

    #[test]
    fn test_stop_wakes_long_poll_promptly() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), Duration::from_secs(30));
        bridge.start(Arc::new(RecordingListener::new())).unwrap();
        assert!(wait_for(|| engine.wait_calls() >= 1));

        let started = Instant::now();
        bridge.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!bridge.is_running());
        assert!(engine.wakeups() >= 1);
    }

    #[test]
    fn test_stopped_bridge_stays_closed() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), FAST_POLL);
        bridge.start(Arc::new(RecordingListener::new())).unwrap();
        bridge.stop();

        let result = bridge.start(Arc::new(RecordingListener::new()));
        assert_eq!(result, Err(MpvError::Terminated));
        assert!(bridge.is_closed());
        assert_eq!(bridge.spawned_workers(), 1);
    }

    #[test]
    fn test_shutdown_event_ends_worker() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), FAST_POLL);
        let recorder = Arc::new(RecordingListener::new());
        bridge.start(recorder.clone()).unwrap();

        engine.push_event(RawEvent::new(EventKind::Shutdown.id()));
        assert!(wait_for(|| !bridge.is_running()));
        assert_eq!(recorder.events()[0].kind, EventKind::Shutdown);
    }

    #[test]
    fn test_worker_exits_when_engine_terminated() {
        let engine = Arc::new(MockEngine::new());
        let bridge = EventBridge::new(engine.clone(), Duration::from_secs(1));
        bridge.start(Arc::new(RecordingListener::new())).unwrap();
        assert!(wait_for(|| engine.wait_calls() >= 1));

        engine.terminate();
        assert!(wait_for(|| !bridge.is_running()));

        let calls = engine.wait_calls();
        assert!(calls <= 3, "worker kept polling: {} waits", calls);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.wait_calls(), calls);
    }

    #[test]
    fn test_listener_may_stop_its_own_bridge() {
        let engine = Arc::new(MockEngine::new());
        let bridge = Arc::new(EventBridge::new(engine.clone(), FAST_POLL));
        let weak = Arc::downgrade(&bridge);
        bridge
            .start(Arc::new(move |_: &Event| {
                if let Some(bridge) = weak.upgrade() {
                    bridge.stop();
                }
            }))
            .unwrap();

        engine.push_event(RawEvent::new(EventKind::Idle.id()));
        assert!(wait_for(|| bridge.is_closed()));
        assert!(wait_for(|| !bridge.is_running()));
    }
}
