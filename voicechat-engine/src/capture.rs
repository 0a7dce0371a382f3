use std::sync::Arc;

use tokio::sync::mpsc::WeakUnboundedSender;
use voicechat_core::types::{RecognitionResult, RecordingState};

use crate::error::ChatError;
use crate::events::{RecognitionEvent, RecognitionSink, SessionEvent};
use crate::traits::SpeechRecognizer;

/// Running text of one recognition cycle.
///
/// Each update carries the whole result list of the cycle. Entries reported
/// as final are committed in order and never revised afterwards; the
/// remaining (interim) entries form a provisional suffix that is rebuilt on
/// every update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveTranscript {
    finalized: Vec<String>,
    interim: String,
}

impl LiveTranscript {
    pub fn apply(&mut self, results: &[RecognitionResult]) {
        self.interim.clear();
        for result in results.iter().skip(self.finalized.len()) {
            // A final entry can only be committed once everything before it is.
            if result.is_final && self.interim.is_empty() {
                self.finalized.push(result.transcript.clone());
            } else {
                self.interim.push_str(&result.transcript);
            }
        }
    }

    pub fn text(&self) -> String {
        let mut out = self.finalized.concat();
        out.push_str(&self.interim);
        out
    }

    pub fn reset(&mut self) {
        self.finalized.clear();
        self.interim.clear();
    }
}

/// Owns the speech recognizer for a session.
///
/// An unavailable recognizer is reported once at construction and the
/// controller stays inactive for the rest of the session.
pub struct CaptureController {
    engine: Option<Arc<dyn SpeechRecognizer>>,
    events: WeakUnboundedSender<SessionEvent>,
    active: bool,
    cycle: u64,
    live: LiveTranscript,
}

impl CaptureController {
    pub fn new(
        engine: Arc<dyn SpeechRecognizer>,
        events: WeakUnboundedSender<SessionEvent>,
    ) -> Self {
        let engine = if engine.is_available() {
            Some(engine)
        } else {
            log::warn!(
                "{}",
                ChatError::CaptureUnavailable("no speech recognition engine".into())
            );
            None
        };

        Self {
            engine,
            events,
            active: false,
            cycle: 0,
            live: LiveTranscript::default(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn live_text(&self) -> String {
        self.live.text()
    }

    pub fn state(&self) -> RecordingState {
        RecordingState {
            is_active: self.active,
            live_text: self.live.text(),
        }
    }

    /// Returns true if a new capture cycle was started.
    pub fn start(&mut self) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            return false;
        };
        if self.active {
            return false;
        }

        self.cycle = self.cycle.wrapping_add(1);
        self.live.reset();

        let sink = RecognitionSink::new(self.cycle, self.events.clone());
        if let Err(e) = engine.start(sink) {
            log::error!("speech capture failed to start: {e:#}");
            return false;
        }

        self.active = true;
        log::info!("recording started (cycle {})", self.cycle);
        true
    }

    /// Returns true if an active capture was stopped. Live text is kept.
    pub fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        if let Some(engine) = self.engine.as_ref() {
            engine.stop();
        }
        self.active = false;
        log::info!("recording stopped (cycle {})", self.cycle);
        true
    }

    pub fn clear_live_text(&mut self) {
        self.live.reset();
    }

    /// Applies an engine event. Returns the new live text when the event
    /// was a result update for the running cycle.
    pub fn handle(&mut self, cycle: u64, event: RecognitionEvent) -> Option<String> {
        if cycle != self.cycle {
            log::debug!("dropping recognition event from stale cycle {cycle}");
            return None;
        }

        match event {
            RecognitionEvent::Results(results) => {
                if !self.active {
                    return None;
                }
                self.live.apply(&results);
                Some(self.live.text())
            }
            RecognitionEvent::Error(message) => {
                log::error!("speech capture error: {message}");
                None
            }
            RecognitionEvent::Ended => {
                if self.active {
                    self.active = false;
                    log::info!("speech capture ended by engine (cycle {cycle})");
                }
                None
            }
        }
    }
}
