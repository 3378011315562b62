//! Wire encoding.
//!
//! Messages serialize to compact JSON with keys in insertion order. The
//! transport body is `data=` followed by the base64 of the UTF-8 JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::batch::Batch;
use crate::error::{Error, Result};
use crate::message::{Message, MessageKind};

/// Form field carrying the encoded payload.
pub const DATA_FIELD: &str = "data";

fn encodable(message: &Message) -> Result<&Message> {
    if message.kind == MessageKind::Batch {
        return Err(Error::Unencodable(message.kind.to_string()));
    }
    Ok(message)
}

/// Compact JSON of a single message document.
pub fn message_json(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(&encodable(message)?.data)?)
}

/// Compact JSON array of message documents.
pub fn batch_json(messages: &[&Message]) -> Result<String> {
    let documents = messages
        .iter()
        .map(|m| encodable(m).map(|m| &m.data))
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string(&documents)?)
}

/// Wrap JSON text into the transport body.
pub fn to_body(json: &str) -> String {
    format!("{DATA_FIELD}={}", STANDARD.encode(json.as_bytes()))
}

/// Transport body for one message.
pub fn encode_message(message: &Message) -> Result<String> {
    message_json(message).map(|json| to_body(&json))
}

/// Transport body for one batch.
pub fn encode_batch(batch: &Batch<'_>) -> Result<String> {
    batch_json(&batch.messages).map(|json| to_body(&json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MessageBuilder;
    use crate::value::Value;
    use serde_json::json;

    fn decode_body(body: &str) -> serde_json::Value {
        let encoded = body.strip_prefix("data=").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn message_json_is_compact_and_ordered() {
        let message = MessageBuilder::new("1234")
            .track(
                "TestEvent",
                Some(&"456".into()),
                &Value::map([("StringProperty", "Tatooine")]),
            )
            .unwrap();
        assert_eq!(
            message_json(&message).unwrap(),
            r#"{"event":"TestEvent","properties":{"token":"1234","distinct_id":"456","StringProperty":"Tatooine"}}"#
        );
    }

    #[test]
    fn body_decodes_to_same_document() {
        let message = MessageBuilder::new("tok")
            .people_set(
                &"id".into(),
                &Value::map([
                    ("Quote", Value::from("\"Do. Or do not.\"\n")),
                    ("Ratio", Value::from(0.25)),
                    ("Big", Value::from(9_007_199_254_740_993u64)),
                    ("Neg", Value::from(-12)),
                ]),
            )
            .unwrap();
        let body = encode_message(&message).unwrap();
        assert!(body.starts_with("data="));
        assert_eq!(decode_body(&body), message.to_json());
    }

    #[test]
    fn numbers_use_invariant_formatting() {
        let message = MessageBuilder::new("t")
            .track("E", None, &Value::map([("Price", 1234567.5)]))
            .unwrap();
        let json = message_json(&message).unwrap();
        assert!(json.contains(r#""Price":1234567.5"#));
    }

    #[test]
    fn batch_body_is_json_array() {
        let builder = MessageBuilder::new("t");
        let messages = vec![
            builder.track("A", None, &Value::Null).unwrap(),
            builder.track("B", None, &Value::Null).unwrap(),
        ];
        let batches = crate::batch::split(&messages);
        let decoded = decode_body(&encode_batch(&batches[0]).unwrap());
        assert_eq!(
            decoded,
            json!([
                {"event": "A", "properties": {"token": "t"}},
                {"event": "B", "properties": {"token": "t"}}
            ])
        );
    }

    #[test]
    fn batch_kind_is_not_encodable() {
        let message = Message::new(MessageKind::Batch, Default::default());
        assert!(matches!(
            message_json(&message).unwrap_err(),
            Error::Unencodable(_)
        ));
    }
}
