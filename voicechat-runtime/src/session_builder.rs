use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use voicechat_core::config::AppConfig;
use voicechat_engine::session::{ChatSession, SessionConfig, SessionProviders};
use voicechat_engine::traits::{
    ResponseGenerator, SpeechRecognizer, SpeechSynthesizer, TranscriptPersistence,
};
use voicechat_engine::SessionHandle;
use voicechat_platform::UnsupportedSynthesizer;

use crate::defaults::transcript_path;
use crate::generator::OpenAiCompatibleGenerator;
use crate::transcript_file::TranscriptFile;

/// Speech engines supplied by the front-end.
#[derive(Clone)]
pub struct SpeechEngines {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

pub fn session_config_from(cfg: &AppConfig, auxiliary_context: Option<Value>) -> SessionConfig {
    SessionConfig {
        greeting: cfg.session.greeting.clone(),
        apology: cfg.session.apology.clone(),
        locale: cfg.speech.locale.clone(),
        rate: cfg.speech.rate,
        auxiliary_context,
    }
}

/// Wires config, storage and the remote generator into session providers.
///
/// Keeps front-ends thin: they only bring speech engines and the API key.
pub fn build_providers_from_config(
    cfg: &AppConfig,
    config_dir: &Path,
    api_key: String,
    speech: SpeechEngines,
) -> anyhow::Result<SessionProviders> {
    let generator: Arc<dyn ResponseGenerator> =
        Arc::new(OpenAiCompatibleGenerator::new(&cfg.generation, api_key)?);

    let persistence: Arc<dyn TranscriptPersistence> =
        Arc::new(TranscriptFile::at_path(transcript_path(cfg, config_dir)));

    let synthesizer: Arc<dyn SpeechSynthesizer> = if cfg.speech.auto_speak {
        speech.synthesizer
    } else {
        Arc::new(UnsupportedSynthesizer)
    };

    Ok(SessionProviders {
        generator,
        recognizer: speech.recognizer,
        synthesizer,
        persistence,
    })
}

/// Builds and spawns a session on the current tokio runtime.
pub fn spawn_session_from_config(
    cfg: &AppConfig,
    config_dir: &Path,
    api_key: String,
    speech: SpeechEngines,
    auxiliary_context: Option<Value>,
) -> anyhow::Result<SessionHandle> {
    let providers = build_providers_from_config(cfg, config_dir, api_key, speech)?;
    let session_cfg = session_config_from(cfg, auxiliary_context);

    log::info!(
        "starting session: model={} consent={:?} speech={}",
        cfg.generation.model,
        cfg.persistence_consent,
        if cfg.speech.auto_speak { "on" } else { "off" }
    );
    Ok(ChatSession::spawn(
        session_cfg,
        providers,
        cfg.persistence_consent,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicechat_core::types::{ConsentState, Message, SessionPhase};
    use voicechat_engine::testing::{Journal, RecordingSynthesizer, ScriptedRecognizer};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::defaults::default_app_config;

    #[tokio::test]
    async fn session_persists_to_file_when_consented() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"choices":[{"message":{"content":"Apply ice for 15 minutes."}}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut cfg = default_app_config();
        cfg.generation.base_url = server.uri();
        cfg.persistence_consent = ConsentState::Accepted;

        let synthesizer = Arc::new(RecordingSynthesizer::new(Journal::new()));
        let handle = spawn_session_from_config(
            &cfg,
            dir.path(),
            String::new(),
            SpeechEngines {
                recognizer: Arc::new(ScriptedRecognizer::new()),
                synthesizer: synthesizer.clone(),
            },
            None,
        )
        .unwrap();

        handle.edit_input("My ankle is swollen").unwrap();
        handle.submit().unwrap();
        let snap = handle
            .wait_for(|s| s.phase == SessionPhase::Idle && s.transcript.len() == 3)
            .await
            .unwrap();
        assert_eq!(snap.transcript[2], Message::model("Apply ice for 15 minutes."));
        assert_eq!(synthesizer.spoken_texts(), vec!["Apply ice for 15 minutes."]);

        let file = TranscriptFile::at_path(dir.path().join("transcript.json"));
        assert_eq!(file.load().unwrap(), Some(snap.transcript.clone()));

        // A new session picks the conversation back up.
        handle.shutdown().unwrap();
        handle.closed().await;
        let restored = spawn_session_from_config(
            &cfg,
            dir.path(),
            String::new(),
            SpeechEngines {
                recognizer: Arc::new(ScriptedRecognizer::new()),
                synthesizer: Arc::new(RecordingSynthesizer::new(Journal::new())),
            },
            None,
        )
        .unwrap();
        assert_eq!(restored.snapshot().transcript, snap.transcript);
    }

    #[test]
    fn muted_sessions_never_speak() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = default_app_config();
        cfg.speech.auto_speak = false;

        let providers = build_providers_from_config(
            &cfg,
            dir.path(),
            String::new(),
            SpeechEngines {
                recognizer: Arc::new(ScriptedRecognizer::new()),
                synthesizer: Arc::new(RecordingSynthesizer::new(Journal::new())),
            },
        )
        .unwrap();

        assert!(!providers.synthesizer.is_available());
    }
}
