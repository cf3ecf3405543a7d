// Core types and traits for the mpv bridge

pub mod bridge;
pub mod callback;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod player;
pub mod state;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

// Re-export commonly used types
pub use bridge::EventBridge;
pub use callback::{EventListener, ListenerSet, ThrottledListener};
pub use config::PlayerConfig;
pub use engine::{DrawTarget, Engine};
pub use error::{MpvError, Result};
pub use event::{Event, EventKind, RawEvent, RawProperty};
pub use player::{Lifecycle, Player};
pub use state::{DisplayState, ObservableState, PlaybackSnapshot};
