//! Batch splitting.
//!
//! Groups built messages by family and cuts each family's stream into chunks
//! of at most [`MAX_BATCH_SIZE`], filled greedily in input order.

use crate::message::{Message, MessageFamily};

/// Maximum messages per batch request.
pub const MAX_BATCH_SIZE: usize = 50;

/// One chunk of same-family messages, sent as a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<'a> {
    pub family: MessageFamily,
    pub messages: Vec<&'a Message>,
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Split `messages` into per-family batches.
///
/// Families appear in the order their first message was seen; within a
/// family, chunks keep input order and only the last may be short. Messages
/// with no data, and batch messages, are skipped.
pub fn split(messages: &[Message]) -> Vec<Batch<'_>> {
    let mut families: Vec<(MessageFamily, Vec<Vec<&Message>>)> = Vec::new();

    for message in messages {
        let Some(family) = message.family() else {
            tracing::trace!(kind = %message.kind, "Skipping nested batch message");
            continue;
        };
        if message.data.is_empty() {
            tracing::trace!(kind = %message.kind, "Skipping message with no data");
            continue;
        }

        let index = match families.iter().position(|(f, _)| *f == family) {
            Some(i) => i,
            None => {
                families.push((family, Vec::new()));
                families.len() - 1
            }
        };
        let chunks = &mut families[index].1;

        match chunks.last_mut() {
            Some(chunk) if chunk.len() < MAX_BATCH_SIZE => chunk.push(message),
            _ => chunks.push(vec![message]),
        }
    }

    families
        .into_iter()
        .flat_map(|(family, chunks)| {
            chunks
                .into_iter()
                .map(move |messages| Batch { family, messages })
        })
        .collect()
}
