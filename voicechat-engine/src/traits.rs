use async_trait::async_trait;
use serde_json::Value;
use voicechat_core::types::Message;

use crate::events::RecognitionSink;

/// One unit of synthesized speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    pub rate: f32,
}

/// Remote response generation.
///
/// Receives the full transcript (including the newest user message) and the
/// session's auxiliary context, passed through untouched.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        transcript: &[Message],
        context: Option<&Value>,
    ) -> anyhow::Result<String>;
}

/// Whole-snapshot transcript storage. Knows nothing about consent.
pub trait TranscriptPersistence: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<Vec<Message>>>;
    fn save(&self, messages: &[Message]) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Continuous speech recognition engine.
///
/// Updates, errors and the end-of-capture notification are pushed through
/// the sink handed to `start`. The engine may end capture on its own (e.g.
/// silence timeout) and must report that with `RecognitionSink::ended`.
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;
    fn start(&self, sink: RecognitionSink) -> anyhow::Result<()>;
    fn stop(&self);
}

/// Speech synthesis engine, queried for availability on every call.
pub trait SpeechSynthesizer: Send + Sync {
    fn is_available(&self) -> bool;
    fn speak(&self, utterance: &Utterance) -> anyhow::Result<()>;
    fn cancel(&self);
    fn is_speaking(&self) -> bool;
}
