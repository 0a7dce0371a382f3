use std::path::{Path, PathBuf};

use voicechat_core::config::{
    AppConfig, DEFAULT_SYSTEM_PROMPT, GenerationSettings, SessionTexts, SpeechSettings,
};
use voicechat_core::types::ConsentState;

pub const TRANSCRIPT_FILENAME: &str = "transcript.json";

pub fn default_app_config() -> AppConfig {
    AppConfig {
        generation: GenerationSettings {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.3,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        },
        speech: SpeechSettings {
            locale: "en-US".into(),
            rate: 1.0,
            auto_speak: true,
        },
        session: SessionTexts::default(),
        persistence_consent: ConsentState::Pending,
        transcript_path: None,
    }
}

/// Explicit `transcript_path` wins; otherwise the file sits next to the config.
pub fn transcript_path(cfg: &AppConfig, config_dir: &Path) -> PathBuf {
    match cfg.transcript_path.as_deref() {
        Some(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => config_dir.join(TRANSCRIPT_FILENAME),
    }
}
