// Observable playback state
// Written only by folding engine events on the bridge thread; readable from any thread

use crate::event::{Event, EventKind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Display state derived from the observable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// No live engine behind the facade
    Idle,
    /// A file is being opened
    Loading,
    /// Media is playing
    Playing,
    /// Media is paused
    Paused,
}

impl DisplayState {
    /// Stable integer used by the C and JNI bindings
    pub fn code(self) -> i32 {
        match self {
            DisplayState::Idle => 0,
            DisplayState::Loading => 1,
            DisplayState::Playing => 2,
            DisplayState::Paused => 3,
        }
    }
}

/// Point-in-time copy of the observable fields
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub is_paused: bool,
    /// Playback position in seconds
    pub time_pos: f64,
    /// Media duration in seconds
    pub duration: f64,
    pub is_loading: bool,
}

impl PlaybackSnapshot {
    pub fn display_state(&self) -> DisplayState {
        if self.is_loading {
            DisplayState::Loading
        } else if self.is_paused {
            DisplayState::Paused
        } else {
            DisplayState::Playing
        }
    }
}

/// An f64 behind an AtomicU64 (bit pattern)
#[derive(Debug, Default)]
struct AtomicSeconds(AtomicU64);

impl AtomicSeconds {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// Lock-free observable state
/// Single writer (the bridge listener), any number of readers
#[derive(Debug, Default)]
pub struct ObservableState {
    is_paused: AtomicBool,
    time_pos: AtomicSeconds,
    duration: AtomicSeconds,
    is_loading: AtomicBool,
}

impl ObservableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused.load(Ordering::Acquire)
    }

    pub fn time_pos(&self) -> f64 {
        self.time_pos.load()
    }

    pub fn duration(&self) -> f64 {
        self.duration.load()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_paused: self.is_paused(),
            time_pos: self.time_pos(),
            duration: self.duration(),
            is_loading: self.is_loading(),
        }
    }

    pub fn display_state(&self) -> DisplayState {
        self.snapshot().display_state()
    }

    /// Apply one event. Returns true when a field was written.
    pub fn fold(&self, event: &Event) -> bool {
        match event.kind {
            EventKind::PropertyChange => {
                let value = event.value.as_deref();
                match event.name.as_deref() {
                    Some("pause") => {
                        self.is_paused
                            .store(value == Some("yes"), Ordering::Release);
                    }
                    Some("time-pos") => self.time_pos.store(parse_seconds(value)),
                    Some("duration") => self.duration.store(parse_seconds(value)),
                    _ => return false,
                }
            }
            EventKind::StartFile => self.is_loading.store(true, Ordering::Release),
            EventKind::FileLoaded | EventKind::EndFile => {
                self.is_loading.store(false, Ordering::Release)
            }
            _ => return false,
        }
        log::trace!("state after {}: {:?}", event.kind, self.snapshot());
        true
    }
}

/// Seconds from a property string; anything unusable reads as 0.0
fn parse_seconds(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = ObservableState::new();
        assert_eq!(state.snapshot(), PlaybackSnapshot::default());
        assert!(!state.is_paused());
        assert_eq!(state.time_pos(), 0.0);
        assert_eq!(state.duration(), 0.0);
        assert!(!state.is_loading());
        assert_eq!(state.display_state(), DisplayState::Playing);
    }

    #[test]
    fn test_pause_fold() {
        let state = ObservableState::new();
        state.fold(&Event::property_change("pause", Some("yes")));
        assert!(state.is_paused());
        state.fold(&Event::property_change("pause", Some("no")));
        assert!(!state.is_paused());
        state.fold(&Event::property_change("pause", Some("yes")));
        state.fold(&Event::property_change("pause", None));
        assert!(!state.is_paused());
    }

    #[test]
    fn test_numeric_folds() {
        let state = ObservableState::new();
        state.fold(&Event::property_change("time-pos", Some("12.25")));
        state.fold(&Event::property_change("duration", Some("596.5")));
        assert_eq!(state.time_pos(), 12.25);
        assert_eq!(state.duration(), 596.5);
    }

    #[test]
    fn test_malformed_numbers_reset_to_zero() {
        let state = ObservableState::new();
        state.fold(&Event::property_change("time-pos", Some("30")));
        state.fold(&Event::property_change("duration", Some("60")));

        for bad in [Some("abc"), Some(""), Some("NaN"), Some("inf"), Some("-5"), None] {
            state.fold(&Event::property_change("time-pos", Some("30")));
            state.fold(&Event::property_change("time-pos", bad));
            assert_eq!(state.time_pos(), 0.0, "time-pos with {:?}", bad);

            state.fold(&Event::property_change("duration", Some("60")));
            state.fold(&Event::property_change("duration", bad));
            assert_eq!(state.duration(), 0.0, "duration with {:?}", bad);
        }
    }

    #[test]
    fn test_fold_is_idempotent() {
        let events = [
            Event::property_change("pause", Some("yes")),
            Event::property_change("pause", Some("no")),
            Event::property_change("time-pos", Some("3.5")),
            Event::property_change("duration", Some("oops")),
        ];
        for event in events.iter() {
            let once = ObservableState::new();
            once.fold(event);
            let twice = ObservableState::new();
            twice.fold(event);
            twice.fold(event);
            assert_eq!(once.snapshot(), twice.snapshot(), "{:?}", event);
        }
    }

    #[test]
    fn test_file_lifecycle() {
        let state = ObservableState::new();
        assert!(state.fold(&Event::new(EventKind::StartFile)));
        assert!(state.is_loading());
        assert_eq!(state.display_state(), DisplayState::Loading);

        assert!(state.fold(&Event::new(EventKind::FileLoaded)));
        assert!(!state.is_loading());

        state.fold(&Event::new(EventKind::StartFile));
        state.fold(&Event::new(EventKind::EndFile));
        assert!(!state.is_loading());
    }

    #[test]
    fn test_other_events_do_not_change_state() {
        let state = ObservableState::new();
        state.fold(&Event::property_change("duration", Some("10")));
        let before = state.snapshot();

        for kind in EventKind::ALL {
            if matches!(
                kind,
                EventKind::StartFile | EventKind::FileLoaded | EventKind::EndFile | EventKind::PropertyChange
            ) {
                continue;
            }
            assert!(!state.fold(&Event::new(kind)));
        }
        assert!(!state.fold(&Event::property_change("volume", Some("50"))));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_loading_takes_priority() {
        let state = ObservableState::new();
        state.fold(&Event::property_change("pause", Some("yes")));
        assert_eq!(state.display_state(), DisplayState::Paused);
        state.fold(&Event::new(EventKind::StartFile));
        assert_eq!(state.display_state(), DisplayState::Loading);
    }
}
