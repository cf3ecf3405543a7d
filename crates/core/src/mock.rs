// Scriptable in-memory engine for tests

use crate::engine::{DrawTarget, Engine};
use crate::error::{MpvError, Result};
use crate::event::RawEvent;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Queue {
    events: VecDeque<RawEvent>,
    woken: bool,
}

#[derive(Default)]
struct Journal {
    commands: Vec<String>,
    property_writes: Vec<(String, String)>,
    options: Vec<(String, String)>,
    observed: Vec<(u64, String)>,
    unobserved: Vec<u64>,
    targets: Vec<DrawTarget>,
    properties: HashMap<String, String>,
}

/// Engine double: records every call and replays queued raw events
#[derive(Default)]
pub struct MockEngine {
    queue: Mutex<Queue>,
    ready: Condvar,
    journal: Mutex<Journal>,
    initialized: AtomicBool,
    terminated: AtomicBool,
    init_failure: Mutex<Option<i32>>,
    command_failure: Mutex<Option<i32>>,
    init_calls: AtomicUsize,
    wait_calls: AtomicUsize,
    timeouts: AtomicUsize,
    wakeups: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `initialize` fail with `code`
    pub fn fail_initialize(&self, code: i32) {
        *self.init_failure.lock() = Some(code);
    }

    /// Make every command fail with `code`
    pub fn fail_commands(&self, code: i32) {
        *self.command_failure.lock() = Some(code);
    }

    /// Queue a raw event for the next `wait_event`
    pub fn push_event(&self, event: RawEvent) {
        self.queue.lock().events.push_back(event);
        self.ready.notify_all();
    }

    pub fn pending_events(&self) -> usize {
        self.queue.lock().events.len()
    }

    pub fn commands(&self) -> Vec<String> {
        self.journal.lock().commands.clone()
    }

    pub fn property_writes(&self) -> Vec<(String, String)> {
        self.journal.lock().property_writes.clone()
    }

    pub fn options(&self) -> Vec<(String, String)> {
        self.journal.lock().options.clone()
    }

    pub fn observed(&self) -> Vec<(u64, String)> {
        self.journal.lock().observed.clone()
    }

    pub fn unobserved(&self) -> Vec<u64> {
        self.journal.lock().unobserved.clone()
    }

    pub fn targets(&self) -> Vec<DrawTarget> {
        self.journal.lock().targets.clone()
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn wait_calls(&self) -> usize {
        self.wait_calls.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::SeqCst)
    }

    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.terminated.load(Ordering::SeqCst) {
            Err(MpvError::Terminated)
        } else {
            Ok(())
        }
    }
}

impl Engine for MockEngine {
    fn initialize(&self) -> Result<()> {
        self.ensure_alive()?;
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(code) = *self.init_failure.lock() {
            return Err(MpvError::InitFailed(code));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_option(&self, name: &str, value: &str) -> Result<()> {
        self.ensure_alive()?;
        self.journal
            .lock()
            .options
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn attach(&self, target: DrawTarget) -> Result<()> {
        self.ensure_alive()?;
        if target != DrawTarget::None {
            self.journal.lock().targets.push(target);
        }
        Ok(())
    }

    fn detach(&self) -> Result<()> {
        self.ensure_alive()?;
        self.journal.lock().targets.push(DrawTarget::None);
        Ok(())
    }

    fn command(&self, text: &str) -> Result<()> {
        self.ensure_alive()?;
        self.journal.lock().commands.push(text.to_string());
        match *self.command_failure.lock() {
            Some(code) => Err(MpvError::CommandFailed(code)),
            None => Ok(()),
        }
    }

    fn set_property(&self, name: &str, value: &str) -> Result<()> {
        self.ensure_alive()?;
        let mut journal = self.journal.lock();
        journal
            .property_writes
            .push((name.to_string(), value.to_string()));
        journal
            .properties
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn get_property(&self, name: &str) -> Option<String> {
        self.ensure_alive().ok()?;
        self.journal.lock().properties.get(name).cloned()
    }

    fn observe(&self, reply_id: u64, name: &str) -> Result<()> {
        self.ensure_alive()?;
        self.journal
            .lock()
            .observed
            .push((reply_id, name.to_string()));
        Ok(())
    }

    fn unobserve(&self, reply_id: u64) -> Result<()> {
        self.ensure_alive()?;
        self.journal.lock().unobserved.push(reply_id);
        Ok(())
    }

    fn wait_event(&self, timeout: Duration) -> Option<RawEvent> {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
        let deadline = Instant::now() + timeout;
        let mut queue = self.queue.lock();
        loop {
            if self.terminated.load(Ordering::SeqCst) {
                return None;
            }
            if let Some(event) = queue.events.pop_front() {
                return Some(event);
            }
            if queue.woken {
                queue.woken = false;
                return None;
            }
            if self.ready.wait_until(&mut queue, deadline).timed_out() {
                self.timeouts.fetch_add(1, Ordering::SeqCst);
                return None;
            }
        }
    }

    fn wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().woken = true;
        self.ready.notify_all();
    }

    fn terminate(&self) {
        if self.terminated.load(Ordering::SeqCst) {
            return;
        }
        self.wakeup();
        self.terminated.store(true, Ordering::SeqCst);
        self.ready.notify_all();
    }

    fn is_alive(&self) -> bool {
        !self.terminated.load(Ordering::SeqCst)
    }
}
