use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{
    UnboundedReceiver, UnboundedSender, WeakUnboundedSender, unbounded_channel,
};
use tokio::sync::watch;
use voicechat_core::config::{DEFAULT_APOLOGY, DEFAULT_GREETING};
use voicechat_core::text::{preview_text, submittable_input};
use voicechat_core::transcript::Transcript;
use voicechat_core::types::{ConsentState, Message, RecordingState, SessionPhase};

use crate::capture::CaptureController;
use crate::error::ChatError;
use crate::events::{RecognitionEvent, SessionCommand, SessionEvent};
use crate::handle::SessionHandle;
use crate::playback::PlaybackController;
use crate::store::TranscriptStore;
use crate::traits::{
    ResponseGenerator, SpeechRecognizer, SpeechSynthesizer, TranscriptPersistence,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub greeting: String,
    pub apology: String,
    pub locale: String,
    pub rate: f32,

    // Passed to every generation request as-is.
    pub auxiliary_context: Option<Value>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.into(),
            apology: DEFAULT_APOLOGY.into(),
            locale: "en-US".into(),
            rate: 1.0,
            auxiliary_context: None,
        }
    }
}

#[derive(Clone)]
pub struct SessionProviders {
    pub generator: Arc<dyn ResponseGenerator>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub persistence: Arc<dyn TranscriptPersistence>,
}

/// Point-in-time view of a session, published after every applied event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub transcript: Vec<Message>,
    pub pending_input: String,
    pub recording: RecordingState,
}

/// The session state machine.
///
/// Owns the transcript, the pending input and the in-flight request flag.
/// All mutation goes through `apply`, one event at a time; generation runs
/// in a spawned task that reports back through the same event queue.
///
/// The session only keeps weak senders to its own queue, so the event loop
/// ends once every `SessionHandle` is gone.
pub struct ChatSession {
    cfg: SessionConfig,
    transcript: Transcript,
    pending_input: String,
    phase: SessionPhase,
    next_request_id: u64,
    capture: CaptureController,
    playback: PlaybackController,
    store: TranscriptStore,
    generator: Arc<dyn ResponseGenerator>,
    events: WeakUnboundedSender<SessionEvent>,
}

impl ChatSession {
    pub fn new(
        cfg: SessionConfig,
        providers: SessionProviders,
        consent: ConsentState,
        events: &UnboundedSender<SessionEvent>,
    ) -> Self {
        let store = TranscriptStore::new(providers.persistence, consent);
        let transcript = match store.load() {
            Some(restored) => {
                log::info!("restored transcript with {} messages", restored.len());
                restored
            }
            None => Transcript::with_greeting(cfg.greeting.clone()),
        };

        let capture = CaptureController::new(providers.recognizer, events.downgrade());
        let playback = PlaybackController::new(providers.synthesizer, cfg.locale.clone(), cfg.rate);

        Self {
            cfg,
            transcript,
            pending_input: String::new(),
            phase: SessionPhase::Idle,
            next_request_id: 0,
            capture,
            playback,
            store,
            generator: providers.generator,
            events: events.downgrade(),
        }
    }

    /// Builds a session and runs its event loop on the current runtime.
    pub fn spawn(
        cfg: SessionConfig,
        providers: SessionProviders,
        consent: ConsentState,
    ) -> SessionHandle {
        let (tx, rx) = unbounded_channel();
        let session = ChatSession::new(cfg, providers, consent, &tx);
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());
        tokio::spawn(session.run(rx, snapshots_tx));
        SessionHandle::new(tx, snapshots_rx)
    }

    async fn run(
        mut self,
        mut events: UnboundedReceiver<SessionEvent>,
        snapshots: watch::Sender<SessionSnapshot>,
    ) {
        loop {
            let Some(event) = events.recv().await else {
                log::info!("all session handles dropped");
                self.shutdown();
                break;
            };
            let keep_running = self.apply(event);
            snapshots.send_replace(self.snapshot());
            if !keep_running {
                break;
            }
        }
        log::info!("session event loop stopped");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            transcript: self.transcript.messages().to_vec(),
            pending_input: self.pending_input.clone(),
            recording: self.capture.state(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_active()
    }

    /// Applies one event. Returns false once the session has shut down.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Command(cmd) => match cmd {
                SessionCommand::EditInput(text) => self.edit_input(text),
                SessionCommand::ToggleRecording => self.toggle_recording(),
                SessionCommand::Submit => {
                    self.submit();
                }
                SessionCommand::Clear => self.clear(),
                SessionCommand::Shutdown => {
                    self.shutdown();
                    return false;
                }
            },
            SessionEvent::Recognition { cycle, event } => self.on_recognition(cycle, event),
            SessionEvent::GenerationFinished {
                request_id,
                outcome,
            } => self.finish_request(request_id, outcome),
        }
        true
    }

    pub fn edit_input(&mut self, text: String) {
        self.pending_input = text;
    }

    pub fn toggle_recording(&mut self) {
        if !self.capture.is_supported() {
            log::debug!("toggle recording ignored: speech capture unsupported");
            return;
        }

        if self.capture.is_active() {
            self.capture.stop();
        } else {
            self.pending_input.clear();
            self.capture.clear_live_text();
            self.capture.start();
        }
    }

    /// Sends the pending input. Returns false when the submission was
    /// rejected (request already in flight, or nothing to send).
    pub fn submit(&mut self) -> bool {
        if self.phase == SessionPhase::AwaitingResponse {
            log::debug!("submit ignored: a response is still pending");
            return false;
        }
        let Some(text) = submittable_input(&self.pending_input).map(str::to_owned) else {
            return false;
        };

        self.capture.stop();
        self.playback.cancel_all();

        log::info!("user message: {}", preview_text(&text));
        self.transcript.push(Message::user(text));
        self.pending_input.clear();
        self.capture.clear_live_text();
        self.set_phase(SessionPhase::AwaitingResponse);
        self.store.save(&self.transcript);

        self.next_request_id = self.next_request_id.wrapping_add(1);
        let request_id = self.next_request_id;
        let messages = self.transcript.messages().to_vec();
        let context = self.cfg.auxiliary_context.clone();
        let generator = self.generator.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let outcome = generator
                .generate(&messages, context.as_ref())
                .await
                .map_err(|e| ChatError::generation(&e));
            let Some(events) = events.upgrade() else {
                log::debug!("generation request {request_id} finished after session closed");
                return;
            };
            let _ = events.send(SessionEvent::GenerationFinished {
                request_id,
                outcome,
            });
        });

        log::info!("generation request {request_id} issued");
        true
    }

    /// Resets to the greeting. An in-flight request is left running and its
    /// reply lands in the fresh transcript.
    pub fn clear(&mut self) {
        self.store.clear();
        self.transcript.reset(self.cfg.greeting.clone());
        self.playback.cancel_all();
        self.capture.stop();
        self.capture.clear_live_text();
        log::info!("session cleared (phase: {})", self.phase.label());
    }

    fn shutdown(&mut self) {
        self.capture.stop();
        self.playback.cancel_all();
    }

    fn on_recognition(&mut self, cycle: u64, event: RecognitionEvent) {
        if let Some(live_text) = self.capture.handle(cycle, event) {
            self.pending_input = live_text;
        }
    }

    fn finish_request(&mut self, request_id: u64, outcome: Result<String, ChatError>) {
        let reply = match outcome {
            Ok(text) => {
                log::info!("generation request {request_id} completed");
                text
            }
            Err(e) => {
                log::error!("generation request {request_id}: {e}");
                self.cfg.apology.clone()
            }
        };

        self.transcript.push(Message::model(reply.clone()));
        self.playback.speak(&reply);
        self.set_phase(SessionPhase::Idle);
        self.store.save(&self.transcript);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            log::info!("session phase: {} -> {}", self.phase.label(), phase.label());
        }
        self.phase = phase;
    }
}
