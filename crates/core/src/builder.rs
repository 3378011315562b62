//! Message builders, one per protocol operation.
//!
//! Every builder resolves a [`MessageCandidate`], checks the required fields
//! and assembles the wire document. A missing or invalid required field fails
//! the whole message; any other property that fails its parser is dropped.
//!
//! # Example
//!
//! ```
//! use panelwire_core::{MessageBuilder, Value};
//!
//! let builder = MessageBuilder::new("1234");
//! let message = builder
//!     .track("TestEvent", Some(&"456".into()), &Value::map([("StringProperty", "Tatooine")]))
//!     .unwrap();
//! assert_eq!(
//!     serde_json::to_string(&message.data).unwrap(),
//!     r#"{"event":"TestEvent","properties":{"token":"1234","distinct_id":"456","StringProperty":"Tatooine"}}"#
//! );
//! ```

use chrono::Utc;
use serde_json::{Map, Value as JsonValue};

use crate::candidate::{CandidateInput, MessageCandidate};
use crate::error::{Error, ParseError, Result};
use crate::format::NameFormat;
use crate::message::{Message, MessageData, MessageFamily, MessageKind};
use crate::parse::{self, ParseResult};
use crate::property::{ObjectProperty, PropertyOrigin};
use crate::schema::{Scope, keys};
use crate::value::Value;

const ALIAS_EVENT: &str = "$create_alias";
const TRANSACTIONS: &str = "$transactions";
const AMOUNT: &str = "$amount";

/// A profile (engage) operation and its operation-specific arguments.
#[derive(Debug, Clone, Copy)]
pub enum PeopleOperation<'a> {
    Set,
    SetOnce,
    Add,
    Append,
    Union,
    Remove,
    /// Property names to remove from the profile.
    Unset(&'a [String]),
    Delete {
        ignore_alias: bool,
    },
    TrackCharge {
        amount: &'a Value,
        time: &'a Value,
    },
}

impl PeopleOperation<'_> {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Set => MessageKind::PeopleSet,
            Self::SetOnce => MessageKind::PeopleSetOnce,
            Self::Add => MessageKind::PeopleAdd,
            Self::Append => MessageKind::PeopleAppend,
            Self::Union => MessageKind::PeopleUnion,
            Self::Remove => MessageKind::PeopleRemove,
            Self::Unset(_) => MessageKind::PeopleUnset,
            Self::Delete { .. } => MessageKind::PeopleDelete,
            Self::TrackCharge { .. } => MessageKind::PeopleTrackCharge,
        }
    }
}

/// Builds messages for one project token with a fixed set of super
/// properties.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    token: String,
    super_properties: Value,
    name_format: NameFormat,
}

impl MessageBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Default properties merged into every message. Raw properties and
    /// explicit parameters override them.
    pub fn with_super_properties(mut self, super_properties: impl Into<Value>) -> Self {
        self.super_properties = super_properties.into();
        self
    }

    pub fn with_name_format(mut self, name_format: NameFormat) -> Self {
        self.name_format = name_format;
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn super_properties(&self) -> &Value {
        &self.super_properties
    }

    fn candidate(
        &self,
        family: MessageFamily,
        distinct_id: Option<&Value>,
        properties: &Value,
    ) -> MessageCandidate {
        MessageCandidate::assemble(CandidateInput {
            family,
            name_format: self.name_format,
            token: Some(&self.token),
            super_properties: &self.super_properties,
            properties,
            distinct_id,
        })
    }

    /// An event message. The distinct id is optional for events.
    pub fn track(
        &self,
        event: &str,
        distinct_id: Option<&Value>,
        properties: &Value,
    ) -> Result<Message> {
        let candidate = self.candidate(MessageFamily::Track, distinct_id, properties);
        build_track(&candidate, event)
    }

    /// Link `alias` to an existing `distinct_id`.
    pub fn alias(&self, distinct_id: &Value, alias: &Value) -> Result<Message> {
        let candidate = self.candidate(MessageFamily::Track, Some(distinct_id), &Value::Null);
        build_alias(&candidate, alias)
    }

    /// Any profile operation.
    pub fn people(
        &self,
        operation: PeopleOperation<'_>,
        distinct_id: &Value,
        properties: &Value,
    ) -> Result<Message> {
        let candidate = self.candidate(MessageFamily::People, Some(distinct_id), properties);
        build_people(&candidate, operation)
    }

    pub fn people_set(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        self.people(PeopleOperation::Set, distinct_id, properties)
    }

    pub fn people_set_once(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        self.people(PeopleOperation::SetOnce, distinct_id, properties)
    }

    pub fn people_add(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        self.people(PeopleOperation::Add, distinct_id, properties)
    }

    pub fn people_append(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        self.people(PeopleOperation::Append, distinct_id, properties)
    }

    pub fn people_union(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        self.people(PeopleOperation::Union, distinct_id, properties)
    }

    pub fn people_remove(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        self.people(PeopleOperation::Remove, distinct_id, properties)
    }

    pub fn people_unset(&self, distinct_id: &Value, names: &[String]) -> Result<Message> {
        self.people(PeopleOperation::Unset(names), distinct_id, &Value::Null)
    }

    pub fn people_delete(&self, distinct_id: &Value, ignore_alias: bool) -> Result<Message> {
        self.people(PeopleOperation::Delete { ignore_alias }, distinct_id, &Value::Null)
    }

    /// Record a charge. `time` defaults to now when null.
    pub fn people_track_charge(
        &self,
        distinct_id: &Value,
        amount: &Value,
        time: &Value,
    ) -> Result<Message> {
        let now;
        let time = if time.is_null() {
            now = Value::DateTime(Utc::now());
            &now
        } else {
            time
        };
        self.people(
            PeopleOperation::TrackCharge { amount, time },
            distinct_id,
            &Value::Null,
        )
    }
}

/// Parse user properties with `parser`, dropping the ones it rejects.
fn parse_user<'a>(
    properties: impl Iterator<Item = (&'a str, &'a ObjectProperty)>,
    parser: impl Fn(&Value) -> ParseResult,
) -> Map<String, JsonValue> {
    let mut out = Map::new();
    for (name, property) in properties {
        match parser(&property.value) {
            Ok(parsed) => {
                out.insert(name.to_string(), parsed);
            }
            Err(err) => {
                tracing::debug!(property = name, error = %err, "Dropping user property");
            }
        }
    }
    out
}

/// Assemble a track message from a resolved candidate.
pub fn build_track(candidate: &MessageCandidate, event: &str) -> Result<Message> {
    if event.is_empty() {
        return Err(Error::MissingProperty { field: "event" });
    }
    candidate.required(keys::track::TOKEN)?;

    let mut properties = Map::new();
    for (key, value) in candidate.parsed_specials() {
        properties.insert(key.to_string(), value);
    }
    for (name, value) in parse_user(candidate.user_properties(), |v| parse::generic(v, true)) {
        properties.entry(name).or_insert(value);
    }

    let mut data = MessageData::new();
    data.insert("event".into(), JsonValue::String(event.to_string()));
    data.insert("properties".into(), JsonValue::Object(properties));
    Ok(Message::new(MessageKind::Track, data))
}

/// Assemble a `$create_alias` message from a resolved candidate.
pub fn build_alias(candidate: &MessageCandidate, alias: &Value) -> Result<Message> {
    let token = candidate.required(keys::track::TOKEN)?;
    let distinct_id = candidate.required(keys::track::DISTINCT_ID)?;
    let alias = parse::distinct_id(alias).map_err(|e| match e {
        ParseError::Null => Error::MissingProperty {
            field: keys::track::ALIAS,
        },
        other => Error::invalid(keys::track::ALIAS, other),
    })?;

    let mut properties = Map::new();
    properties.insert(keys::track::TOKEN.into(), token);
    properties.insert(keys::track::DISTINCT_ID.into(), distinct_id);
    properties.insert(keys::track::ALIAS.into(), alias);

    let mut data = MessageData::new();
    data.insert("event".into(), JsonValue::String(ALIAS_EVENT.into()));
    data.insert("properties".into(), JsonValue::Object(properties));
    Ok(Message::new(MessageKind::Alias, data))
}

/// Assemble a profile message from a resolved candidate.
///
/// Super properties only seed the message-level special fields here; any
/// super property that is not special is dropped rather than written to the
/// profile.
pub fn build_people(candidate: &MessageCandidate, operation: PeopleOperation<'_>) -> Result<Message> {
    candidate.required(keys::people::TOKEN)?;
    candidate.required(keys::people::DISTINCT_ID)?;

    let schema = candidate.schema();
    let specials = candidate.parsed_specials();
    let mut data = MessageData::new();
    for (key, value) in &specials {
        if schema.get(key).is_some_and(|s| s.scope == Scope::Message) {
            data.insert(key.to_string(), value.clone());
        }
    }

    let user = || {
        candidate
            .user_properties()
            .filter(|(_, p)| p.origin != PropertyOrigin::SuperProperty)
    };

    let kind = operation.kind();
    let op_value = match operation {
        PeopleOperation::Set | PeopleOperation::SetOnce => {
            let mut values = Map::new();
            for (key, value) in &specials {
                if schema.get(key).is_some_and(|s| s.scope == Scope::Profile) {
                    values.insert(key.to_string(), value.clone());
                }
            }
            for (name, value) in parse_user(user(), |v| parse::generic(v, true)) {
                values.entry(name).or_insert(value);
            }
            JsonValue::Object(values)
        }
        PeopleOperation::Add => JsonValue::Object(parse_user(user(), parse::number)),
        PeopleOperation::Append | PeopleOperation::Remove => {
            JsonValue::Object(parse_user(user(), |v| parse::generic(v, false)))
        }
        PeopleOperation::Union => JsonValue::Object(parse_user(user(), |v| {
            parse::collection(v, |item| parse::generic(item, false))
        })),
        PeopleOperation::Unset(names) => JsonValue::Array(
            names
                .iter()
                .map(|name| match schema.lookup(name) {
                    Some(special) if special.scope == Scope::Profile => special.key.to_string(),
                    _ => name.clone(),
                })
                .map(JsonValue::String)
                .collect(),
        ),
        PeopleOperation::Delete { ignore_alias } => {
            if ignore_alias {
                data.insert(keys::people::IGNORE_ALIAS.into(), JsonValue::Bool(true));
            }
            JsonValue::String(String::new())
        }
        PeopleOperation::TrackCharge { amount, time } => {
            let amount = parse::number(amount).map_err(|e| Error::invalid("amount", e))?;
            let time = parse::protocol_time(time).map_err(|e| Error::invalid("time", e))?;
            let mut transaction = Map::new();
            transaction.insert(keys::people::TIME.into(), time);
            transaction.insert(AMOUNT.into(), amount);
            let mut values = Map::new();
            values.insert(TRANSACTIONS.into(), JsonValue::Object(transaction));
            JsonValue::Object(values)
        }
    };

    if let Some(op) = kind.operation() {
        data.insert(op.to_string(), op_value);
    }
    Ok(Message::new(kind, data))
}
