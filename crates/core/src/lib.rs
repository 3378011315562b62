//! # Panelwire Core
//!
//! Message construction, validation, batching and wire encoding for the
//! track/engage analytics ingestion protocol. This crate performs **no I/O**:
//! it turns loosely-structured caller input into protocol documents and
//! transport bodies, and leaves delivery to `panelwire-client`.
//!
//! ## Pipeline
//!
//! caller [`Value`] → [`property::extract`] → [`MessageCandidate`]
//! (precedence + [`schema`] lookup + [`parse`]) → [`MessageBuilder`] →
//! [`batch::split`] → [`wire`] encoding.

pub mod batch;
pub mod builder;
pub mod candidate;
pub mod error;
pub mod format;
pub mod message;
pub mod parse;
pub mod property;
pub mod record;
pub mod schema;
pub mod value;
pub mod wire;

// Re-export key types at crate root for ergonomics
pub use batch::{Batch, MAX_BATCH_SIZE};
pub use builder::{MessageBuilder, PeopleOperation};
pub use candidate::{CandidateInput, MessageCandidate};
pub use error::{Error, ParseError, Result};
pub use format::NameFormat;
pub use message::{Message, MessageData, MessageFamily, MessageKind};
pub use property::{NameSource, ObjectProperty, PropertyOrigin};
pub use record::{MemberDescriptor, Record, TypeDescriptor};
pub use value::Value;
