//! Property extraction from arbitrary input values.

use crate::value::Value;

/// How a property's name was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// Map key or declared member name; subject to name formatting.
    Default,
    /// Explicit per-member rename.
    DeclaredOverride,
    /// Structural-contract member name.
    SchemaMember,
}

/// Where a property came from. Later origins take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PropertyOrigin {
    SuperProperty,
    RawProperty,
    Parameter,
}

/// A single name/value pair pulled out of caller input.
#[derive(Debug, Clone)]
pub struct ObjectProperty {
    pub name: String,
    pub name_source: NameSource,
    pub origin: PropertyOrigin,
    pub value: Value,
}

impl ObjectProperty {
    pub fn new(
        name: impl Into<String>,
        name_source: NameSource,
        origin: PropertyOrigin,
        value: Value,
    ) -> Self {
        Self {
            name: name.into(),
            name_source,
            origin,
            value,
        }
    }

    /// An explicitly passed parameter (token, distinct id, ...).
    pub fn parameter(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, NameSource::Default, PropertyOrigin::Parameter, value)
    }
}

/// Extract the properties of `input`, tagging each with `origin`.
///
/// - string-keyed maps yield every entry
/// - key/value pair collections yield only the entries with string keys
/// - registered records yield their resolved members
///
/// Anything else, including null, yields nothing.
pub fn extract(input: &Value, origin: PropertyOrigin) -> Vec<ObjectProperty> {
    match input {
        Value::Map(entries) => entries
            .iter()
            .map(|(name, value)| ObjectProperty::new(name, NameSource::Default, origin, value.clone()))
            .collect(),
        Value::Pairs(entries) => entries
            .iter()
            .filter_map(|(key, value)| match key {
                Value::String(name) => Some(ObjectProperty::new(
                    name,
                    NameSource::Default,
                    origin,
                    value.clone(),
                )),
                _ => None,
            })
            .collect(),
        Value::Record(record) => record
            .members()
            .iter()
            .map(|m| {
                let value = record.read_member(m.member).unwrap_or_default();
                ObjectProperty::new(m.wire_name, m.name_source, origin, value)
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::debug!(kind = other.kind(), "Ignoring non-container properties input");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MemberDescriptor, Record, TypeDescriptor};

    #[derive(Debug)]
    struct Pilot {
        call_sign: String,
        kills: i32,
        notes: String,
    }

    impl Record for Pilot {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::new("Pilot")
                .member(MemberDescriptor::new("call_sign").rename("$name"))
                .member(MemberDescriptor::new("kills"))
                .member(MemberDescriptor::new("notes").ignore())
        }

        fn member(&self, name: &str) -> Option<Value> {
            match name {
                "call_sign" => Some(self.call_sign.as_str().into()),
                "kills" => Some(self.kills.into()),
                "notes" => Some(self.notes.as_str().into()),
                _ => None,
            }
        }
    }

    #[test]
    fn null_yields_nothing() {
        assert!(extract(&Value::Null, PropertyOrigin::RawProperty).is_empty());
    }

    #[test]
    fn map_entries_keep_order_and_origin() {
        let input = Value::map([("b", 1), ("a", 2)]);
        let props = extract(&input, PropertyOrigin::SuperProperty);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "b");
        assert_eq!(props[1].name, "a");
        assert!(props.iter().all(|p| p.origin == PropertyOrigin::SuperProperty));
        assert!(props.iter().all(|p| p.name_source == NameSource::Default));
    }

    #[test]
    fn pairs_drop_non_string_keys() {
        let input = Value::Pairs(vec![
            (Value::from("kept"), Value::from(1)),
            (Value::from(42), Value::from(2)),
            (Value::from('c'), Value::from(3)),
        ]);
        let props = extract(&input, PropertyOrigin::RawProperty);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "kept");
    }

    #[test]
    fn record_members_use_resolved_names() {
        let pilot = Value::record(Pilot {
            call_sign: "Red Five".into(),
            kills: 3,
            notes: "classified".into(),
        });
        let props = extract(&pilot, PropertyOrigin::RawProperty);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "$name");
        assert_eq!(props[0].name_source, NameSource::DeclaredOverride);
        assert_eq!(props[0].value.as_str(), Some("Red Five"));
        assert_eq!(props[1].name, "kills");
        assert!(matches!(props[1].value, Value::Int(3)));
    }

    #[test]
    fn scalar_input_yields_nothing() {
        assert!(extract(&Value::from("just a string"), PropertyOrigin::RawProperty).is_empty());
    }
}
