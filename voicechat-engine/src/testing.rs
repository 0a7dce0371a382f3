//! Deterministic collaborators for exercising a session without real
//! speech engines, storage or network.
//!
//! Every double can share a [`Journal`] so tests can assert the relative
//! order of side effects across collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;
use voicechat_core::types::{Message, RecognitionResult};

use crate::events::RecognitionSink;
use crate::traits::{
    ResponseGenerator, SpeechRecognizer, SpeechSynthesizer, TranscriptPersistence, Utterance,
};

#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }
}

/// Recognizer driven by the test: results are pushed through `emit_*`.
#[derive(Debug)]
pub struct ScriptedRecognizer {
    available: bool,
    sink: Mutex<Option<RecognitionSink>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::with_availability(true)
    }

    pub fn unavailable() -> Self {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> Self {
        Self {
            available,
            sink: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn emit(&self, results: Vec<RecognitionResult>) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.results(results),
            None => false,
        }
    }

    pub fn emit_interim(&self, text: &str) -> bool {
        self.emit(vec![RecognitionResult::interim(text)])
    }

    pub fn emit_final(&self, text: &str) -> bool {
        self.emit(vec![RecognitionResult::finalized(text)])
    }

    pub fn emit_error(&self, message: &str) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.error(message),
            None => false,
        }
    }

    /// Simulates the engine ending capture on its own.
    pub fn end(&self) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.ended(),
            None => false,
        }
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&self, sink: RecognitionSink) -> anyhow::Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthesizer that records utterances instead of playing them.
///
/// An utterance counts as speaking until it is cancelled or `finish` is
/// called.
#[derive(Debug)]
pub struct RecordingSynthesizer {
    available: bool,
    speaking: AtomicBool,
    spoken: Mutex<Vec<Utterance>>,
    cancel_calls: AtomicUsize,
    journal: Journal,
}

impl RecordingSynthesizer {
    pub fn new(journal: Journal) -> Self {
        Self {
            available: true,
            speaking: AtomicBool::new(false),
            spoken: Mutex::new(vec![]),
            cancel_calls: AtomicUsize::new(0),
            journal,
        }
    }

    pub fn unavailable(journal: Journal) -> Self {
        Self {
            available: false,
            ..Self::new(journal)
        }
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken().into_iter().map(|u| u.text).collect()
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn finish(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }
}

impl SpeechSynthesizer for RecordingSynthesizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&self, utterance: &Utterance) -> anyhow::Result<()> {
        self.journal.record(format!("speak:{}", utterance.text));
        self.spoken.lock().unwrap().push(utterance.clone());
        self.speaking.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&self) {
        self.journal.record("cancel");
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// In-memory persistence that counts every call it receives.
#[derive(Debug)]
pub struct MemoryPersistence {
    saved: Mutex<Option<Vec<Message>>>,
    failing: bool,
    loads: AtomicUsize,
    saves: AtomicUsize,
    clears: AtomicUsize,
    journal: Journal,
}

impl MemoryPersistence {
    pub fn new(journal: Journal) -> Self {
        Self {
            saved: Mutex::new(None),
            failing: false,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
            journal,
        }
    }

    pub fn with_saved(journal: Journal, messages: Vec<Message>) -> Self {
        let p = Self::new(journal);
        *p.saved.lock().unwrap() = Some(messages);
        p
    }

    /// Every call fails with an I/O-style error.
    pub fn failing(journal: Journal) -> Self {
        Self {
            failing: true,
            ..Self::new(journal)
        }
    }

    pub fn saved(&self) -> Option<Vec<Message>> {
        self.saved.lock().unwrap().clone()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.loads() + self.saves() + self.clears()
    }
}

impl TranscriptPersistence for MemoryPersistence {
    fn load(&self) -> anyhow::Result<Option<Vec<Message>>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.journal.record("load");
        if self.failing {
            return Err(anyhow!("disk unavailable"));
        }
        Ok(self.saved.lock().unwrap().clone())
    }

    fn save(&self, messages: &[Message]) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("save:{}", messages.len()));
        if self.failing {
            return Err(anyhow!("disk unavailable"));
        }
        *self.saved.lock().unwrap() = Some(messages.to_vec());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.journal.record("clear");
        if self.failing {
            return Err(anyhow!("disk unavailable"));
        }
        *self.saved.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCall {
    pub transcript: Vec<Message>,
    pub context: Option<Value>,
}

/// Generator with queued replies. Held replies wait until `release` is
/// called, which keeps a request in flight for as long as a test needs.
#[derive(Debug)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<GenerationCall>>,
    gate: Option<Semaphore>,
    journal: Journal,
}

impl ScriptedGenerator {
    pub fn new(journal: Journal) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(vec![]),
            gate: None,
            journal,
        }
    }

    pub fn held(journal: Journal) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(journal)
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        transcript: &[Message],
        context: Option<&Value>,
    ) -> anyhow::Result<String> {
        self.journal.record(format!("generate:{}", transcript.len()));
        self.calls.lock().unwrap().push(GenerationCall {
            transcript: transcript.to_vec(),
            context: context.cloned(),
        });

        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}
