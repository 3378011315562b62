//! # Panelwire Client
//!
//! Delivers messages built by `panelwire-core` to the ingestion endpoints.
//!
//! The [`Client`] owns a project token, super properties and an immutable
//! [`ClientConfig`](panelwire_config::ClientConfig). Every operation has a
//! build-only `*_message` form and a sending form. Network access goes through
//! the [`Transport`] trait so it can be swapped out in tests.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod transport;

pub use client::{ChunkOutcome, Client, MessageRequest, PeopleRequest, SendReport, Strictness};
pub use error::{ClientError, Result};
pub use transport::{HttpTransport, Transport};

pub use tokio_util::sync::CancellationToken;
