use serde::{Deserialize, Serialize};

use crate::types::ConsentState;

pub const DEFAULT_GREETING: &str = "Hello! I'm your AI health assistant. I can share general \
information about symptoms, wellness and medications, but I am not a doctor. For a diagnosis \
or an emergency, please contact a qualified medical professional.";

pub const DEFAULT_APOLOGY: &str =
    "I'm sorry, I couldn't process that request right now. Please try again in a moment.";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful, friendly health assistant. Give \
clear, general guidance in plain language, keep answers short enough to be read aloud, and \
always recommend seeing a medical professional for diagnosis or urgent symptoms.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSettings {
    pub locale: String,
    pub rate: f32,

    // When off, narration is disabled for the whole session.
    #[serde(default = "default_true")]
    pub auto_speak: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTexts {
    pub greeting: String,
    pub apology: String,
}

impl Default for SessionTexts {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.into(),
            apology: DEFAULT_APOLOGY.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub generation: GenerationSettings,
    pub speech: SpeechSettings,
    #[serde(default)]
    pub session: SessionTexts,
    #[serde(default)]
    pub persistence_consent: ConsentState,

    // Defaults to a file next to the config when unset.
    #[serde(default)]
    pub transcript_path: Option<String>,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_true() -> bool {
    true
}
