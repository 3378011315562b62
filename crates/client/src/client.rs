//! The client facade.

use std::sync::Arc;

use futures::future::join_all;
use panelwire_config::ClientConfig;
use panelwire_core::batch::{self, Batch};
use panelwire_core::{Message, MessageBuilder, MessageFamily, PeopleOperation, Value, wire};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::endpoint;
use crate::error::Result;
use crate::transport::{HttpTransport, Transport};

/// What to do when one message of a batch fails to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Skip the message and keep going.
    #[default]
    Lenient,
    /// Fail the whole batch with the first error.
    Strict,
}

impl From<bool> for Strictness {
    fn from(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }
}

/// An owned profile operation, for queuing into batches.
#[derive(Debug, Clone)]
pub enum PeopleRequest {
    Set,
    SetOnce,
    Add,
    Append,
    Union,
    Remove,
    Unset(Vec<String>),
    Delete { ignore_alias: bool },
    /// A null `time` means now.
    TrackCharge { amount: Value, time: Value },
}

/// One message to build as part of a batch.
#[derive(Debug, Clone)]
pub enum MessageRequest {
    Track {
        event: String,
        distinct_id: Option<Value>,
        properties: Value,
    },
    Alias {
        distinct_id: Value,
        alias: Value,
    },
    People {
        operation: PeopleRequest,
        distinct_id: Value,
        properties: Value,
    },
}

impl MessageRequest {
    pub fn track(event: impl Into<String>, distinct_id: Option<Value>, properties: Value) -> Self {
        Self::Track {
            event: event.into(),
            distinct_id,
            properties,
        }
    }

    pub fn people(operation: PeopleRequest, distinct_id: Value, properties: Value) -> Self {
        Self::People {
            operation,
            distinct_id,
            properties,
        }
    }

    fn build(&self, builder: &MessageBuilder) -> panelwire_core::Result<Message> {
        match self {
            Self::Track {
                event,
                distinct_id,
                properties,
            } => builder.track(event, distinct_id.as_ref(), properties),
            Self::Alias { distinct_id, alias } => builder.alias(distinct_id, alias),
            Self::People {
                operation,
                distinct_id,
                properties,
            } => {
                let operation = match operation {
                    PeopleRequest::Set => PeopleOperation::Set,
                    PeopleRequest::SetOnce => PeopleOperation::SetOnce,
                    PeopleRequest::Add => PeopleOperation::Add,
                    PeopleRequest::Append => PeopleOperation::Append,
                    PeopleRequest::Union => PeopleOperation::Union,
                    PeopleRequest::Remove => PeopleOperation::Remove,
                    PeopleRequest::Unset(names) => PeopleOperation::Unset(names),
                    PeopleRequest::Delete { ignore_alias } => PeopleOperation::Delete {
                        ignore_alias: *ignore_alias,
                    },
                    PeopleRequest::TrackCharge { amount, time } => {
                        return builder.people_track_charge(distinct_id, amount, time);
                    }
                };
                builder.people(operation, distinct_id, properties)
            }
        }
    }
}

/// Delivery outcome of one batch chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub family: MessageFamily,
    pub size: usize,
    pub sent: bool,
}

/// Per-chunk results of [`Client::send_batch`], in chunk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    pub chunks: Vec<ChunkOutcome>,
}

impl SendReport {
    /// True when every chunk was accepted. An empty report counts as sent.
    pub fn all_sent(&self) -> bool {
        self.chunks.iter().all(|c| c.sent)
    }

    /// Number of messages in accepted chunks.
    pub fn sent_messages(&self) -> usize {
        self.chunks.iter().filter(|c| c.sent).map(|c| c.size).sum()
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.chunks.iter().filter(|c| !c.sent)
    }
}

/// A project-scoped client.
///
/// Holds the token, super properties and configuration for every message it
/// builds. Sending forms honour the client's cancellation token: once it is
/// cancelled, nothing further reaches the network.
pub struct Client {
    builder: MessageBuilder,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl Client {
    /// A client delivering over HTTP.
    pub fn new(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::with_transport(token, config, Arc::new(transport)))
    }

    pub fn with_transport(
        token: impl Into<String>,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let builder = MessageBuilder::new(token).with_name_format(config.name_format);
        Self {
            builder,
            config,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_super_properties(mut self, super_properties: impl Into<Value>) -> Self {
        self.builder = self.builder.with_super_properties(super_properties);
        self
    }

    /// Tie sends to an externally owned token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn builder(&self) -> &MessageBuilder {
        &self.builder
    }

    /// The batch strictness configured by `strict_batches`.
    pub fn strictness(&self) -> Strictness {
        self.config.strict_batches.into()
    }

    // --- Build-only forms ---

    pub fn track_message(
        &self,
        event: &str,
        distinct_id: Option<&Value>,
        properties: &Value,
    ) -> Result<Message> {
        Ok(self.builder.track(event, distinct_id, properties)?)
    }

    pub fn alias_message(&self, distinct_id: &Value, alias: &Value) -> Result<Message> {
        Ok(self.builder.alias(distinct_id, alias)?)
    }

    pub fn people_set_message(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        Ok(self.builder.people_set(distinct_id, properties)?)
    }

    pub fn people_set_once_message(
        &self,
        distinct_id: &Value,
        properties: &Value,
    ) -> Result<Message> {
        Ok(self.builder.people_set_once(distinct_id, properties)?)
    }

    pub fn people_add_message(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        Ok(self.builder.people_add(distinct_id, properties)?)
    }

    pub fn people_append_message(
        &self,
        distinct_id: &Value,
        properties: &Value,
    ) -> Result<Message> {
        Ok(self.builder.people_append(distinct_id, properties)?)
    }

    pub fn people_union_message(&self, distinct_id: &Value, properties: &Value) -> Result<Message> {
        Ok(self.builder.people_union(distinct_id, properties)?)
    }

    pub fn people_remove_message(
        &self,
        distinct_id: &Value,
        properties: &Value,
    ) -> Result<Message> {
        Ok(self.builder.people_remove(distinct_id, properties)?)
    }

    pub fn people_unset_message(&self, distinct_id: &Value, names: &[String]) -> Result<Message> {
        Ok(self.builder.people_unset(distinct_id, names)?)
    }

    pub fn people_delete_message(&self, distinct_id: &Value, ignore_alias: bool) -> Result<Message> {
        Ok(self.builder.people_delete(distinct_id, ignore_alias)?)
    }

    pub fn people_track_charge_message(
        &self,
        distinct_id: &Value,
        amount: &Value,
        time: &Value,
    ) -> Result<Message> {
        Ok(self.builder.people_track_charge(distinct_id, amount, time)?)
    }

    // --- Sending forms ---

    pub async fn track(
        &self,
        event: &str,
        distinct_id: Option<&Value>,
        properties: &Value,
    ) -> Result<bool> {
        let message = self.track_message(event, distinct_id, properties)?;
        self.send(&message).await
    }

    pub async fn alias(&self, distinct_id: &Value, alias: &Value) -> Result<bool> {
        let message = self.alias_message(distinct_id, alias)?;
        self.send(&message).await
    }

    pub async fn people_set(&self, distinct_id: &Value, properties: &Value) -> Result<bool> {
        let message = self.people_set_message(distinct_id, properties)?;
        self.send(&message).await
    }

    pub async fn people_set_once(&self, distinct_id: &Value, properties: &Value) -> Result<bool> {
        let message = self.people_set_once_message(distinct_id, properties)?;
        self.send(&message).await
    }

    pub async fn people_add(&self, distinct_id: &Value, properties: &Value) -> Result<bool> {
        let message = self.people_add_message(distinct_id, properties)?;
        self.send(&message).await
    }

    pub async fn people_append(&self, distinct_id: &Value, properties: &Value) -> Result<bool> {
        let message = self.people_append_message(distinct_id, properties)?;
        self.send(&message).await
    }

    pub async fn people_union(&self, distinct_id: &Value, properties: &Value) -> Result<bool> {
        let message = self.people_union_message(distinct_id, properties)?;
        self.send(&message).await
    }

    pub async fn people_remove(&self, distinct_id: &Value, properties: &Value) -> Result<bool> {
        let message = self.people_remove_message(distinct_id, properties)?;
        self.send(&message).await
    }

    pub async fn people_unset(&self, distinct_id: &Value, names: &[String]) -> Result<bool> {
        let message = self.people_unset_message(distinct_id, names)?;
        self.send(&message).await
    }

    pub async fn people_delete(&self, distinct_id: &Value, ignore_alias: bool) -> Result<bool> {
        let message = self.people_delete_message(distinct_id, ignore_alias)?;
        self.send(&message).await
    }

    pub async fn people_track_charge(
        &self,
        distinct_id: &Value,
        amount: &Value,
        time: &Value,
    ) -> Result<bool> {
        let message = self.people_track_charge_message(distinct_id, amount, time)?;
        self.send(&message).await
    }

    /// Send one already-built message as a single JSON object.
    pub async fn send(&self, message: &Message) -> Result<bool> {
        let body = wire::encode_message(message)?;
        let Some(family) = message.family() else {
            return Ok(false);
        };
        let url = endpoint::url(&self.config, family);

        let sent = self.transport.send(&url, &body, &self.cancel).await;
        if !sent {
            warn!(kind = %message.kind, "Message was not delivered");
        }
        Ok(sent)
    }

    /// Build every request, skipping or failing on build errors per
    /// `strictness`.
    pub fn build_batch(
        &self,
        requests: &[MessageRequest],
        strictness: Strictness,
    ) -> Result<Vec<Message>> {
        let mut messages = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            match request.build(&self.builder) {
                Ok(message) => messages.push(message),
                Err(e) if strictness == Strictness::Lenient => {
                    warn!(index, error = %e, "Skipping message that failed to build");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(messages)
    }

    /// Split `messages` into per-family chunks and send every chunk
    /// concurrently.
    ///
    /// Encoding happens before any network call, so an encode failure sends
    /// nothing.
    pub async fn send_batch(&self, messages: &[Message]) -> Result<SendReport> {
        let batches = batch::split(messages);
        let requests = batches
            .iter()
            .map(|b| -> Result<(&Batch<'_>, String, String)> {
                let body = wire::encode_batch(b)?;
                Ok((b, endpoint::url(&self.config, b.family), body))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(chunks = requests.len(), "Sending batch");

        let sends = requests.iter().map(|(batch, url, body)| async move {
            let sent = self.transport.send(url, body, &self.cancel).await;
            if !sent {
                warn!(family = %batch.family, size = batch.len(), "Batch chunk was not delivered");
            }
            ChunkOutcome {
                family: batch.family,
                size: batch.len(),
                sent,
            }
        });

        Ok(SendReport {
            chunks: join_all(sends).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and accepts all of them.
    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, url: &str, body: &str, cancel: &CancellationToken) -> bool {
            if cancel.is_cancelled() {
                return false;
            }
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), body.to_string()));
            true
        }
    }

    fn client(config: ClientConfig) -> (Client, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let client = Client::with_transport("tok", config, transport.clone());
        (client, transport)
    }

    #[test]
    fn strictness_from_config() {
        let (lenient, _) = client(ClientConfig::default());
        assert_eq!(lenient.strictness(), Strictness::Lenient);

        let (strict, _) = client(ClientConfig {
            strict_batches: true,
            ..ClientConfig::default()
        });
        assert_eq!(strict.strictness(), Strictness::Strict);
    }

    #[test]
    fn name_format_comes_from_config() {
        let (client, _) = client(ClientConfig {
            name_format: panelwire_core::NameFormat::LowerCase,
            ..ClientConfig::default()
        });
        let message = client
            .track_message("E", None, &Value::map([("PropName", 1)]))
            .unwrap();
        assert_eq!(message.data["properties"]["prop name"], 1);
    }

    #[test]
    fn lenient_build_skips_failures() {
        let (client, _) = client(ClientConfig::default());
        let requests = vec![
            MessageRequest::track("ok", None, Value::Null),
            MessageRequest::track("", None, Value::Null),
            MessageRequest::people(PeopleRequest::Set, Value::Null, Value::Null),
            MessageRequest::Alias {
                distinct_id: "a".into(),
                alias: "b".into(),
            },
        ];
        let messages = client.build_batch(&requests, Strictness::Lenient).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn strict_build_fails_on_first_error() {
        let (client, _) = client(ClientConfig::default());
        let requests = vec![
            MessageRequest::track("ok", None, Value::Null),
            MessageRequest::people(PeopleRequest::Add, Value::Null, Value::Null),
        ];
        let err = client
            .build_batch(&requests, Strictness::Strict)
            .unwrap_err();
        assert!(err.to_string().contains("$distinct_id"));
    }

    #[test]
    fn track_charge_request_defaults_time() {
        let (client, _) = client(ClientConfig::default());
        let requests = vec![MessageRequest::people(
            PeopleRequest::TrackCharge {
                amount: 9.99.into(),
                time: Value::Null,
            },
            "id".into(),
            Value::Null,
        )];
        let messages = client.build_batch(&requests, Strictness::Strict).unwrap();
        let transaction = &messages[0].data["$append"]["$transactions"];
        assert_eq!(transaction["$amount"], 9.99);
        assert!(transaction["$time"].is_string());
    }

    #[tokio::test]
    async fn send_routes_by_family() {
        let (client, transport) = client(ClientConfig::default());
        assert!(client.track("E", None, &Value::Null).await.unwrap());
        assert!(client.people_set(&"id".into(), &Value::Null).await.unwrap());

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, "https://api.mixpanel.com/track");
        assert_eq!(calls[1].0, "https://api.mixpanel.com/engage");
        assert!(calls.iter().all(|(_, body)| body.starts_with("data=")));
    }

    #[tokio::test]
    async fn build_failure_never_reaches_transport() {
        let (client, transport) = client(ClientConfig::default());
        assert!(client.alias(&"id".into(), &Value::Null).await.is_err());
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_client_reports_not_sent() {
        let (client, transport) = client(ClientConfig::default());
        client.cancellation_token().cancel();
        assert!(!client.track("E", None, &Value::Null).await.unwrap());
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn report_summaries() {
        let report = SendReport {
            chunks: vec![
                ChunkOutcome {
                    family: MessageFamily::Track,
                    size: 50,
                    sent: true,
                },
                ChunkOutcome {
                    family: MessageFamily::People,
                    size: 3,
                    sent: false,
                },
            ],
        };
        assert!(!report.all_sent());
        assert_eq!(report.sent_messages(), 50);
        assert_eq!(report.failed_chunks().count(), 1);
        assert!(SendReport::default().all_sent());
    }
}
