use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Message;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("a transcript needs at least one message")]
    Empty,
}

/// Ordered conversation history.
///
/// Only grows by `push`; `reset` is the single way back to the one-message
/// greeting state. It can never be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::model(greeting)],
        }
    }

    pub fn restore(messages: Vec<Message>) -> Result<Self, TranscriptError> {
        if messages.is_empty() {
            return Err(TranscriptError::Empty);
        }
        Ok(Self { messages })
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn reset(&mut self, greeting: impl Into<String>) {
        self.messages.clear();
        self.messages.push(Message::model(greeting));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> &Message {
        // Non-empty by construction.
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True while only the initial message is present; such a snapshot is
    /// never worth persisting.
    pub fn is_trivial(&self) -> bool {
        self.messages.len() < 2
    }
}

impl<'de> Deserialize<'de> for Transcript {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let messages = Vec::<Message>::deserialize(deserializer)?;
        Transcript::restore(messages).map_err(serde::de::Error::custom)
    }
}
