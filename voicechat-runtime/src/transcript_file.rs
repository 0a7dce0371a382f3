use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use voicechat_core::types::Message;
use voicechat_engine::traits::TranscriptPersistence;

use crate::files::write_atomically;

/// Transcript snapshot stored as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct TranscriptFile {
    path: PathBuf,
}

impl TranscriptFile {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptPersistence for TranscriptFile {
    fn load(&self) -> anyhow::Result<Option<Vec<Message>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read transcript: {}", self.path.display()))?;
        let messages: Vec<Message> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse transcript: {}", self.path.display()))?;
        Ok(if messages.is_empty() { None } else { Some(messages) })
    }

    fn save(&self, messages: &[Message]) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(messages).context("encode transcript JSON")?;
        write_atomically(&self.path, &json)
            .with_context(|| format!("failed to save transcript: {}", self.path.display()))
    }

    fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove transcript: {}", self.path.display()))?;
        }
        Ok(())
    }
}
