use std::io::Write;

use voicechat_engine::traits::{SpeechSynthesizer, Utterance};

/// "Speaks" by printing the utterance to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSynthesizer;

pub fn format_utterance(utterance: &Utterance) -> String {
    format!(
        "[speak:{} x{:.1}] {}",
        utterance.locale, utterance.rate, utterance.text
    )
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&self, utterance: &Utterance) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", format_utterance(utterance))?;
        stdout.flush()?;
        Ok(())
    }

    // Printing finishes immediately, so there is never anything to cut off.
    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_locale_rate_and_text() {
        let u = Utterance {
            text: "Stay hydrated.".into(),
            locale: "en-US".into(),
            rate: 1.0,
        };
        assert_eq!(format_utterance(&u), "[speak:en-US x1.0] Stay hydrated.");
    }
}
