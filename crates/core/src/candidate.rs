//! Message candidates: one resolved property set per message.
//!
//! Properties are written in precedence order, lowest first:
//! super properties, then the raw properties object, then explicit
//! parameters. A later write to the same name replaces the earlier value but
//! keeps the original position.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::format::NameFormat;
use crate::message::MessageFamily;
use crate::property::{NameSource, ObjectProperty, PropertyOrigin, extract};
use crate::schema::Schema;
use crate::value::Value;

static NULL: Value = Value::Null;

/// Inputs to [`MessageCandidate::assemble`].
#[derive(Debug, Clone, Copy)]
pub struct CandidateInput<'a> {
    pub family: MessageFamily,
    pub name_format: NameFormat,
    /// Explicit token; ignored when empty.
    pub token: Option<&'a str>,
    pub super_properties: &'a Value,
    pub properties: &'a Value,
    /// Explicit distinct id; ignored when null.
    pub distinct_id: Option<&'a Value>,
}

impl<'a> CandidateInput<'a> {
    pub fn new(family: MessageFamily) -> Self {
        Self {
            family,
            name_format: NameFormat::None,
            token: None,
            super_properties: &NULL,
            properties: &NULL,
            distinct_id: None,
        }
    }
}

/// Insertion-ordered property map.
#[derive(Debug, Clone, Default)]
struct PropertyMap {
    entries: Vec<(String, ObjectProperty)>,
    index: HashMap<String, usize>,
}

impl PropertyMap {
    fn insert(&mut self, name: String, property: ObjectProperty) {
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = property,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, property));
            }
        }
    }

    fn get(&self, name: &str) -> Option<&ObjectProperty> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn remove(&mut self, name: &str) {
        if let Some(i) = self.index.remove(name) {
            self.entries.remove(i);
            for slot in self.index.values_mut() {
                if *slot > i {
                    *slot -= 1;
                }
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &ObjectProperty)> {
        self.entries.iter().map(|(name, p)| (name.as_str(), p))
    }
}

/// The resolved special and user properties of one message.
#[derive(Debug, Clone)]
pub struct MessageCandidate {
    schema: &'static Schema,
    special: PropertyMap,
    user: PropertyMap,
}

impl MessageCandidate {
    /// Resolve all property sources into one candidate.
    pub fn assemble(input: CandidateInput<'_>) -> Self {
        let mut candidate = Self {
            schema: Schema::for_family(input.family),
            special: PropertyMap::default(),
            user: PropertyMap::default(),
        };

        let extracted = extract(input.super_properties, PropertyOrigin::SuperProperty)
            .into_iter()
            .chain(extract(input.properties, PropertyOrigin::RawProperty));
        for property in extracted {
            candidate.add(property, input.name_format);
        }

        if let Some(token) = input.token.filter(|t| !t.is_empty()) {
            let key = candidate.schema.token_key();
            candidate.set_parameter(key, Value::from(token));
        }

        if let Some(distinct_id) = input.distinct_id.filter(|id| !id.is_null()) {
            let key = candidate.schema.distinct_id_key();
            candidate.set_parameter(key, distinct_id.clone());
        }

        candidate
    }

    fn add(&mut self, property: ObjectProperty, name_format: NameFormat) {
        if let Some(special) = self.schema.lookup(&property.name) {
            self.user.remove(special.key);
            self.special.insert(special.key.to_string(), property);
            return;
        }

        let name = match property.name_source {
            NameSource::Default => name_format.apply(&property.name),
            NameSource::DeclaredOverride | NameSource::SchemaMember => property.name.clone(),
        };
        if !self.special.contains(&name) {
            self.user.insert(name, property);
        }
    }

    fn set_parameter(&mut self, key: &'static str, value: Value) {
        self.user.remove(key);
        self.special
            .insert(key.to_string(), ObjectProperty::parameter(key, value));
    }

    pub fn family(&self) -> MessageFamily {
        self.schema.family
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// A special property by canonical key.
    pub fn special(&self, key: &str) -> Option<&ObjectProperty> {
        self.special.get(key)
    }

    /// Parse a required special property, failing the message if it is
    /// missing or rejected.
    pub fn required(&self, key: &'static str) -> Result<JsonValue> {
        let special = self
            .schema
            .get(key)
            .ok_or(Error::MissingProperty { field: key })?;
        let property = self
            .special
            .get(key)
            .ok_or(Error::MissingProperty { field: key })?;
        (special.parser)(&property.value).map_err(|e| Error::invalid(key, e))
    }

    /// Parsed special properties present on this candidate, in schema order.
    /// Values the parser rejects are dropped.
    pub fn parsed_specials(&self) -> Vec<(&'static str, JsonValue)> {
        self.schema
            .properties()
            .iter()
            .filter_map(|special| {
                let property = self.special.get(special.key)?;
                match (special.parser)(&property.value) {
                    Ok(parsed) => Some((special.key, parsed)),
                    Err(err) => {
                        tracing::debug!(key = special.key, error = %err, "Dropping special property");
                        None
                    }
                }
            })
            .collect()
    }

    /// User properties in first-seen order, keyed by formatted name.
    pub fn user_properties(&self) -> impl Iterator<Item = (&str, &ObjectProperty)> {
        self.user.iter()
    }
}
