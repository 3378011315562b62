//! Built message values.
//!
//! A [`Message`] is pure data: the operation kind plus the exact JSON
//! document the ingestion endpoint expects. Messages are never mutated after
//! a builder returns them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// The ordered JSON document of a message.
pub type MessageData = Map<String, JsonValue>;

/// Which ingestion endpoint a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFamily {
    /// Event messages (`track`, `alias`).
    Track,
    /// Profile (engage) messages.
    People,
}

impl std::fmt::Display for MessageFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Track => write!(f, "track"),
            Self::People => write!(f, "people"),
        }
    }
}

/// The protocol operation a message performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Track,
    Alias,
    PeopleSet,
    PeopleSetOnce,
    PeopleAdd,
    PeopleAppend,
    PeopleUnion,
    PeopleRemove,
    PeopleUnset,
    PeopleDelete,
    PeopleTrackCharge,
    Batch,
}

impl MessageKind {
    /// The family this kind is delivered with. Batches have none.
    pub fn family(self) -> Option<MessageFamily> {
        match self {
            Self::Track | Self::Alias => Some(MessageFamily::Track),
            Self::Batch => None,
            _ => Some(MessageFamily::People),
        }
    }

    /// The people operation key, e.g. `$set`.
    pub fn operation(self) -> Option<&'static str> {
        match self {
            Self::PeopleSet => Some("$set"),
            Self::PeopleSetOnce => Some("$set_once"),
            Self::PeopleAdd => Some("$add"),
            Self::PeopleAppend | Self::PeopleTrackCharge => Some("$append"),
            Self::PeopleUnion => Some("$union"),
            Self::PeopleRemove => Some("$remove"),
            Self::PeopleUnset => Some("$unset"),
            Self::PeopleDelete => Some("$delete"),
            Self::Track | Self::Alias | Self::Batch => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Track => "track",
            Self::Alias => "alias",
            Self::PeopleSet => "people_set",
            Self::PeopleSetOnce => "people_set_once",
            Self::PeopleAdd => "people_add",
            Self::PeopleAppend => "people_append",
            Self::PeopleUnion => "people_union",
            Self::PeopleRemove => "people_remove",
            Self::PeopleUnset => "people_unset",
            Self::PeopleDelete => "people_delete",
            Self::PeopleTrackCharge => "people_track_charge",
            Self::Batch => "batch",
        };
        f.write_str(name)
    }
}

/// A fully built protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub data: MessageData,
}

impl Message {
    pub fn new(kind: MessageKind, data: MessageData) -> Self {
        Self { kind, data }
    }

    pub fn family(&self) -> Option<MessageFamily> {
        self.kind.family()
    }

    /// The document as a JSON value.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_families() {
        assert_eq!(MessageKind::Track.family(), Some(MessageFamily::Track));
        assert_eq!(MessageKind::Alias.family(), Some(MessageFamily::Track));
        assert_eq!(MessageKind::PeopleUnset.family(), Some(MessageFamily::People));
        assert_eq!(MessageKind::PeopleTrackCharge.family(), Some(MessageFamily::People));
        assert_eq!(MessageKind::Batch.family(), None);
    }

    #[test]
    fn track_charge_appends() {
        assert_eq!(MessageKind::PeopleTrackCharge.operation(), Some("$append"));
        assert_eq!(MessageKind::Track.operation(), None);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&MessageKind::PeopleSetOnce).unwrap();
        assert_eq!(json, "\"people_set_once\"");
    }
}
