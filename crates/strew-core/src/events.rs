use serde::{Deserialize, Serialize};

/// Watch event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    Error,
}

/// A single event from a watch stream.
///
/// `object` is optional because servers emit bookmark and error frames
/// without a payload; consumers must tolerate events that carry nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent<T> {
    #[serde(rename = "type")]
    pub event_type: WatchEventType,
    pub object: Option<T>,
}

impl<T> WatchEvent<T> {
    /// Create an ADDED event
    pub fn added(object: T) -> Self {
        Self {
            event_type: WatchEventType::Added,
            object: Some(object),
        }
    }

    /// Create a MODIFIED event
    pub fn modified(object: T) -> Self {
        Self {
            event_type: WatchEventType::Modified,
            object: Some(object),
        }
    }

    /// Create a DELETED event
    pub fn deleted(object: T) -> Self {
        Self {
            event_type: WatchEventType::Deleted,
            object: Some(object),
        }
    }
}
