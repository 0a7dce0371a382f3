use voicechat_engine::events::RecognitionSink;
use voicechat_engine::traits::{SpeechRecognizer, SpeechSynthesizer, Utterance};

/// Stand-in for platforms without speech recognition.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&self, _sink: RecognitionSink) -> anyhow::Result<()> {
        anyhow::bail!("speech recognition is not supported on this platform")
    }

    fn stop(&self) {}
}

/// Stand-in for platforms without speech synthesis, or for muted sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSynthesizer;

impl SpeechSynthesizer for UnsupportedSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _utterance: &Utterance) -> anyhow::Result<()> {
        anyhow::bail!("speech synthesis is not supported on this platform")
    }

    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}
