use tokio::sync::mpsc::WeakUnboundedSender;
use voicechat_core::types::RecognitionResult;

use crate::error::ChatError;

/// User-driven requests, queued in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    EditInput(String),
    ToggleRecording,
    Submit,
    Clear,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Full result list of the current recognition cycle.
    Results(Vec<RecognitionResult>),
    Error(String),
    Ended,
}

/// Everything that can change session state. Applied one at a time by the
/// session event loop.
#[derive(Debug)]
pub enum SessionEvent {
    Command(SessionCommand),
    Recognition {
        cycle: u64,
        event: RecognitionEvent,
    },
    GenerationFinished {
        request_id: u64,
        outcome: Result<String, ChatError>,
    },
}

/// Handed to a recognizer on `start`; tags every event with the capture
/// cycle it belongs to so late events from a stopped cycle can be dropped.
///
/// Holds only a weak reference to the session queue: a recognizer that keeps
/// its sink around does not keep the session alive.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    cycle: u64,
    events: WeakUnboundedSender<SessionEvent>,
}

impl RecognitionSink {
    pub fn new(cycle: u64, events: WeakUnboundedSender<SessionEvent>) -> Self {
        Self { cycle, events }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns false once the session is gone.
    pub fn results(&self, results: Vec<RecognitionResult>) -> bool {
        self.send(RecognitionEvent::Results(results))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Error(message.into()))
    }

    pub fn ended(&self) -> bool {
        self.send(RecognitionEvent::Ended)
    }

    fn send(&self, event: RecognitionEvent) -> bool {
        let Some(events) = self.events.upgrade() else {
            return false;
        };
        events
            .send(SessionEvent::Recognition {
                cycle: self.cycle,
                event,
            })
            .is_ok()
    }
}
