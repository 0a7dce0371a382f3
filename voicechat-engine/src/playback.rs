use std::sync::Arc;

use crate::error::ChatError;
use crate::traits::{SpeechSynthesizer, Utterance};

/// Speaks one utterance at a time; every new utterance silences the
/// previous one first.
pub struct PlaybackController {
    engine: Arc<dyn SpeechSynthesizer>,
    locale: String,
    rate: f32,
    unavailable_reported: bool,
}

impl PlaybackController {
    pub fn new(engine: Arc<dyn SpeechSynthesizer>, locale: impl Into<String>, rate: f32) -> Self {
        Self {
            engine,
            locale: locale.into(),
            rate,
            unavailable_reported: false,
        }
    }

    fn available(&mut self) -> bool {
        if self.engine.is_available() {
            return true;
        }
        if !self.unavailable_reported {
            self.unavailable_reported = true;
            log::warn!(
                "{}",
                ChatError::PlaybackUnavailable("no speech synthesis engine".into())
            );
        }
        false
    }

    pub fn speak(&mut self, text: &str) {
        if !self.available() {
            return;
        }
        self.cancel_all();

        let utterance = Utterance {
            text: text.to_string(),
            locale: self.locale.clone(),
            rate: self.rate,
        };
        if let Err(e) = self.engine.speak(&utterance) {
            log::warn!("speech playback failed: {e:#}");
        }
    }

    pub fn cancel_all(&mut self) {
        if !self.available() {
            return;
        }
        if self.engine.is_speaking() {
            self.engine.cancel();
        }
    }
}
