use thiserror::Error;

/// Failure kinds a session can run into. None of them ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("response generation failed: {0}")]
    Generation(String),

    #[error("speech capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("speech playback unavailable: {0}")]
    PlaybackUnavailable(String),

    #[error("transcript persistence failed: {0}")]
    Persistence(String),

    #[error("session event loop has stopped")]
    SessionClosed,
}

impl ChatError {
    pub fn generation(e: &anyhow::Error) -> Self {
        Self::Generation(format!("{e:#}"))
    }

    pub fn persistence(e: &anyhow::Error) -> Self {
        Self::Persistence(format!("{e:#}"))
    }
}
