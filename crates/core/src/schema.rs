//! Special property tables.
//!
//! Each message family reserves a fixed set of property names. A reserved
//! name maps to exactly one canonical wire key and one parser. Lookup is
//! case-insensitive and ignores a leading `$` and any underscores, so
//! `distinctId`, `distinct_id` and `$distinct_id` all resolve alike.

use crate::message::MessageFamily;
use crate::parse::{self, Parser};

/// Canonical wire keys.
pub mod keys {
    pub mod track {
        pub const TOKEN: &str = "token";
        pub const DISTINCT_ID: &str = "distinct_id";
        pub const TIME: &str = "time";
        pub const IP: &str = "ip";
        pub const DURATION: &str = "$duration";
        pub const OS: &str = "$os";
        pub const SCREEN_WIDTH: &str = "$screen_width";
        pub const SCREEN_HEIGHT: &str = "$screen_height";
        pub const ALIAS: &str = "alias";
    }

    pub mod people {
        pub const TOKEN: &str = "$token";
        pub const DISTINCT_ID: &str = "$distinct_id";
        pub const IP: &str = "$ip";
        pub const TIME: &str = "$time";
        pub const IGNORE_TIME: &str = "$ignore_time";
        pub const IGNORE_ALIAS: &str = "$ignore_alias";
        pub const FIRST_NAME: &str = "$first_name";
        pub const LAST_NAME: &str = "$last_name";
        pub const NAME: &str = "$name";
        pub const EMAIL: &str = "$email";
        pub const PHONE: &str = "$phone";
        pub const CREATED: &str = "$created";
    }
}

/// Where a special property lands in the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Track: inside `properties`. People: top level of the message.
    Message,
    /// People only: inside the `$set`/`$set_once` operation value.
    Profile,
}

/// One reserved property.
#[derive(Debug)]
pub struct SpecialProperty {
    pub key: &'static str,
    /// Normalized lookup name.
    alias: &'static str,
    pub parser: Parser,
    pub scope: Scope,
}

const fn special(key: &'static str, alias: &'static str, parser: Parser, scope: Scope) -> SpecialProperty {
    SpecialProperty {
        key,
        alias,
        parser,
        scope,
    }
}

/// The reserved property table for one message family.
#[derive(Debug)]
pub struct Schema {
    pub family: MessageFamily,
    properties: &'static [SpecialProperty],
}

static TRACK_PROPERTIES: [SpecialProperty; 8] = [
    special(keys::track::TOKEN, "token", parse::string, Scope::Message),
    special(keys::track::DISTINCT_ID, "distinctid", parse::distinct_id, Scope::Message),
    special(keys::track::TIME, "time", parse::unix_time, Scope::Message),
    special(keys::track::IP, "ip", parse::ip, Scope::Message),
    special(keys::track::DURATION, "duration", parse::duration, Scope::Message),
    special(keys::track::OS, "os", parse::string, Scope::Message),
    special(keys::track::SCREEN_WIDTH, "screenwidth", parse::number, Scope::Message),
    special(keys::track::SCREEN_HEIGHT, "screenheight", parse::number, Scope::Message),
];

static PEOPLE_PROPERTIES: [SpecialProperty; 12] = [
    special(keys::people::TOKEN, "token", parse::string, Scope::Message),
    special(keys::people::DISTINCT_ID, "distinctid", parse::distinct_id, Scope::Message),
    special(keys::people::IP, "ip", parse::ip, Scope::Message),
    special(keys::people::TIME, "time", parse::unix_time, Scope::Message),
    special(keys::people::IGNORE_TIME, "ignoretime", parse::boolean, Scope::Message),
    special(keys::people::IGNORE_ALIAS, "ignorealias", parse::boolean, Scope::Message),
    special(keys::people::FIRST_NAME, "firstname", parse::string, Scope::Profile),
    special(keys::people::LAST_NAME, "lastname", parse::string, Scope::Profile),
    special(keys::people::NAME, "name", parse::string, Scope::Profile),
    special(keys::people::EMAIL, "email", parse::string, Scope::Profile),
    special(keys::people::PHONE, "phone", parse::string, Scope::Profile),
    special(keys::people::CREATED, "created", parse::protocol_time, Scope::Profile),
];

static TRACK_SCHEMA: Schema = Schema {
    family: MessageFamily::Track,
    properties: &TRACK_PROPERTIES,
};

static PEOPLE_SCHEMA: Schema = Schema {
    family: MessageFamily::People,
    properties: &PEOPLE_PROPERTIES,
};

fn normalize(raw_name: &str) -> String {
    raw_name
        .strip_prefix('$')
        .unwrap_or(raw_name)
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl Schema {
    pub fn for_family(family: MessageFamily) -> &'static Schema {
        match family {
            MessageFamily::Track => &TRACK_SCHEMA,
            MessageFamily::People => &PEOPLE_SCHEMA,
        }
    }

    pub fn token_key(&self) -> &'static str {
        match self.family {
            MessageFamily::Track => keys::track::TOKEN,
            MessageFamily::People => keys::people::TOKEN,
        }
    }

    pub fn distinct_id_key(&self) -> &'static str {
        match self.family {
            MessageFamily::Track => keys::track::DISTINCT_ID,
            MessageFamily::People => keys::people::DISTINCT_ID,
        }
    }

    /// Map a caller-supplied name to its special property, if reserved.
    pub fn lookup(&self, raw_name: &str) -> Option<&'static SpecialProperty> {
        let normalized = normalize(raw_name);
        self.properties.iter().find(|p| p.alias == normalized)
    }

    /// Find a special property by canonical wire key.
    pub fn get(&self, key: &str) -> Option<&'static SpecialProperty> {
        self.properties.iter().find(|p| p.key == key)
    }

    /// All special properties, in wire order.
    pub fn properties(&self) -> &'static [SpecialProperty] {
        self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_id_spellings_resolve() {
        let schema = Schema::for_family(MessageFamily::Track);
        for raw in ["distinctId", "distinct_id", "$distinct_id", "DISTINCT_ID", "DistinctID"] {
            let special = schema.lookup(raw).unwrap_or_else(|| panic!("{raw} not mapped"));
            assert_eq!(special.key, "distinct_id");
        }
    }

    #[test]
    fn families_use_different_keys() {
        let track = Schema::for_family(MessageFamily::Track);
        let people = Schema::for_family(MessageFamily::People);
        assert_eq!(track.lookup("token").unwrap().key, "token");
        assert_eq!(people.lookup("token").unwrap().key, "$token");
        assert_eq!(track.lookup("duration").unwrap().key, "$duration");
        assert!(people.lookup("duration").is_none());
        assert!(track.lookup("email").is_none());
        assert_eq!(people.lookup("$email").unwrap().scope, Scope::Profile);
    }

    #[test]
    fn unknown_names_are_not_special() {
        let track = Schema::for_family(MessageFamily::Track);
        assert!(track.lookup("StringProperty").is_none());
        assert!(track.lookup("timestamp").is_none());
        assert!(track.lookup("$$time").is_none());
    }

    #[test]
    fn created_uses_protocol_time() {
        let people = Schema::for_family(MessageFamily::People);
        let created = people.get("$created").unwrap();
        let parsed = (created.parser)(&"2013-11-30T00:00:00".into()).unwrap();
        assert_eq!(parsed, serde_json::json!("2013-11-30T00:00:00"));
    }
}
