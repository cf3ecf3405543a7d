// Engine event model
// Raw records copied out of the engine queue are decoded into a uniform `Event`

use std::fmt;

/// Event tag, numbered exactly like the engine's event ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventKind {
    /// Unrecognized id (also the engine's "no event")
    None = 0,
    Shutdown = 1,
    LogMessage = 2,
    GetPropertyReply = 3,
    SetPropertyReply = 4,
    CommandReply = 5,
    StartFile = 6,
    EndFile = 7,
    FileLoaded = 8,
    TracksChanged = 9,
    TrackSwitched = 10,
    Idle = 11,
    Pause = 12,
    Unpause = 13,
    Tick = 14,
    ScriptInputDispatch = 15,
    ClientMessage = 16,
    VideoReconfig = 17,
    AudioReconfig = 18,
    MetadataUpdate = 19,
    Seek = 20,
    PlaybackRestart = 21,
    PropertyChange = 22,
    ChapterChange = 23,
    QueueOverflow = 24,
    Hook = 25,
}

impl EventKind {
    /// Every tag, in id order
    pub const ALL: [EventKind; 26] = [
        EventKind::None,
        EventKind::Shutdown,
        EventKind::LogMessage,
        EventKind::GetPropertyReply,
        EventKind::SetPropertyReply,
        EventKind::CommandReply,
        EventKind::StartFile,
        EventKind::EndFile,
        EventKind::FileLoaded,
        EventKind::TracksChanged,
        EventKind::TrackSwitched,
        EventKind::Idle,
        EventKind::Pause,
        EventKind::Unpause,
        EventKind::Tick,
        EventKind::ScriptInputDispatch,
        EventKind::ClientMessage,
        EventKind::VideoReconfig,
        EventKind::AudioReconfig,
        EventKind::MetadataUpdate,
        EventKind::Seek,
        EventKind::PlaybackRestart,
        EventKind::PropertyChange,
        EventKind::ChapterChange,
        EventKind::QueueOverflow,
        EventKind::Hook,
    ];

    /// Map a native event id to its tag. Total: anything outside 1..=25 is `None`.
    pub fn from_id(id: i32) -> Self {
        match id {
            1..=25 => Self::ALL[id as usize],
            _ => EventKind::None,
        }
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    /// Whether records of this kind carry a property name/value payload
    pub fn carries_property(self) -> bool {
        matches!(self, EventKind::PropertyChange | EventKind::GetPropertyReply)
    }

    /// Name used by the engine's own event documentation
    pub fn wire_name(self) -> &'static str {
        match self {
            EventKind::None => "none",
            EventKind::Shutdown => "shutdown",
            EventKind::LogMessage => "log-message",
            EventKind::GetPropertyReply => "get-property-reply",
            EventKind::SetPropertyReply => "set-property-reply",
            EventKind::CommandReply => "command-reply",
            EventKind::StartFile => "start-file",
            EventKind::EndFile => "end-file",
            EventKind::FileLoaded => "file-loaded",
            EventKind::TracksChanged => "tracks-changed",
            EventKind::TrackSwitched => "track-switched",
            EventKind::Idle => "idle",
            EventKind::Pause => "pause",
            EventKind::Unpause => "unpause",
            EventKind::Tick => "tick",
            EventKind::ScriptInputDispatch => "script-input-dispatch",
            EventKind::ClientMessage => "client-message",
            EventKind::VideoReconfig => "video-reconfig",
            EventKind::AudioReconfig => "audio-reconfig",
            EventKind::MetadataUpdate => "metadata-update",
            EventKind::Seek => "seek",
            EventKind::PlaybackRestart => "playback-restart",
            EventKind::PropertyChange => "property-change",
            EventKind::ChapterChange => "chapter-change",
            EventKind::QueueOverflow => "queue-overflow",
            EventKind::Hook => "hook",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Property payload copied out of a native event record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProperty {
    pub name: Option<String>,
    /// Value rendered as a string; absent for formats that have no string form
    pub value: Option<String>,
}

/// Owned copy of one native event record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub event_id: i32,
    pub error: i32,
    pub reply_userdata: u64,
    pub property: Option<RawProperty>,
}

impl RawEvent {
    pub fn new(event_id: i32) -> Self {
        Self {
            event_id,
            ..Default::default()
        }
    }

    pub fn property_change(name: &str, value: Option<&str>) -> Self {
        Self {
            event_id: EventKind::PropertyChange.id(),
            property: Some(RawProperty {
                name: Some(name.to_string()),
                value: value.map(str::to_string),
            }),
            ..Default::default()
        }
    }
}

/// Decoded engine event, handed to the listener and then dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Property name; only set for property-bearing kinds
    pub name: Option<String>,
    /// String-encoded property value; only set for property-bearing kinds
    pub value: Option<String>,
    /// Engine status code, 0 = success
    pub error: i32,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            name: None,
            value: None,
            error: 0,
        }
    }

    pub fn property_change(name: &str, value: Option<&str>) -> Self {
        Self {
            kind: EventKind::PropertyChange,
            name: Some(name.to_string()),
            value: value.map(str::to_string),
            error: 0,
        }
    }

    /// Decode a raw record. Payload fields survive only on property-bearing kinds.
    pub fn decode(raw: RawEvent) -> Self {
        let kind = EventKind::from_id(raw.event_id);
        let (name, value) = match raw.property {
            Some(prop) if kind.carries_property() => (prop.name, prop.value),
            _ => (None, None),
        };

        Self {
            kind,
            name,
            value,
            error: raw.error,
        }
    }

    /// Property name when this is a change notification for it
    pub fn changed_property(&self) -> Option<&str> {
        match self.kind {
            EventKind::PropertyChange => self.name.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_ids_map_injectively() {
        let mut seen = HashSet::new();
        for id in 1..=25 {
            let kind = EventKind::from_id(id);
            assert_ne!(kind, EventKind::None, "id {} fell through", id);
            assert_eq!(kind.id(), id);
            assert!(seen.insert(kind), "id {} reused tag {:?}", id, kind);
        }
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn test_out_of_range_ids_fall_back() {
        for id in [0, -1, 26, 27, 100, i32::MIN, i32::MAX] {
            assert_eq!(EventKind::from_id(id), EventKind::None);
        }
    }

    #[test]
    fn test_glossary_order() {
        assert_eq!(EventKind::from_id(6), EventKind::StartFile);
        assert_eq!(EventKind::from_id(7), EventKind::EndFile);
        assert_eq!(EventKind::from_id(8), EventKind::FileLoaded);
        assert_eq!(EventKind::from_id(22), EventKind::PropertyChange);
        assert_eq!(EventKind::from_id(25), EventKind::Hook);
        for (idx, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.id(), idx as i32);
        }
    }

    #[test]
    fn test_decode_property_change() {
        let raw = RawEvent::property_change("duration", Some("596.5"));
        let event = Event::decode(raw);
        assert_eq!(event.kind, EventKind::PropertyChange);
        assert_eq!(event.name.as_deref(), Some("duration"));
        assert_eq!(event.value.as_deref(), Some("596.5"));
        assert_eq!(event.error, 0);
    }

    #[test]
    fn test_decode_strips_payload_from_other_kinds() {
        let mut raw = RawEvent::property_change("pause", Some("yes"));
        raw.event_id = EventKind::Seek.id();
        raw.error = -3;

        let event = Event::decode(raw);
        assert_eq!(event.kind, EventKind::Seek);
        assert!(event.name.is_none());
        assert!(event.value.is_none());
        assert_eq!(event.error, -3);
    }

    #[test]
    fn test_decode_property_reply_keeps_payload() {
        let mut raw = RawEvent::property_change("volume", Some("80"));
        raw.event_id = EventKind::GetPropertyReply.id();

        let event = Event::decode(raw);
        assert_eq!(event.name.as_deref(), Some("volume"));
        assert_eq!(event.changed_property(), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(EventKind::PropertyChange.to_string(), "property-change");
        assert_eq!(EventKind::None.to_string(), "none");
    }
}
