use std::sync::Arc;

use voicechat_core::transcript::Transcript;
use voicechat_core::types::{ConsentState, Message};

use crate::error::ChatError;
use crate::traits::TranscriptPersistence;

/// Wraps a persistence backend so that nothing reaches it unless consent
/// was accepted.
pub struct ConsentGate {
    inner: Arc<dyn TranscriptPersistence>,
    consent: ConsentState,
}

impl ConsentGate {
    pub fn new(inner: Arc<dyn TranscriptPersistence>, consent: ConsentState) -> Self {
        Self { inner, consent }
    }

    pub fn consent(&self) -> ConsentState {
        self.consent
    }
}

impl TranscriptPersistence for ConsentGate {
    fn load(&self) -> anyhow::Result<Option<Vec<Message>>> {
        if !self.consent.is_accepted() {
            return Ok(None);
        }
        self.inner.load()
    }

    fn save(&self, messages: &[Message]) -> anyhow::Result<()> {
        if !self.consent.is_accepted() {
            return Ok(());
        }
        self.inner.save(messages)
    }

    fn clear(&self) -> anyhow::Result<()> {
        if !self.consent.is_accepted() {
            return Ok(());
        }
        self.inner.clear()
    }
}

/// Load-once / save-on-change / clear-on-demand lifecycle of the session
/// transcript. Storage failures are logged and otherwise ignored.
pub struct TranscriptStore {
    backend: ConsentGate,
}

impl TranscriptStore {
    pub fn new(backend: Arc<dyn TranscriptPersistence>, consent: ConsentState) -> Self {
        Self {
            backend: ConsentGate::new(backend, consent),
        }
    }

    pub fn load(&self) -> Option<Transcript> {
        match self.backend.load() {
            Ok(Some(messages)) => Transcript::restore(messages).ok(),
            Ok(None) => None,
            Err(e) => {
                log::warn!("{}", ChatError::persistence(&e));
                None
            }
        }
    }

    /// Persists the whole transcript; the bare greeting is never written.
    pub fn save(&self, transcript: &Transcript) {
        if transcript.is_trivial() {
            return;
        }
        if let Err(e) = self.backend.save(transcript.messages()) {
            log::warn!("{}", ChatError::persistence(&e));
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.backend.clear() {
            log::warn!("{}", ChatError::persistence(&e));
        }
    }
}
