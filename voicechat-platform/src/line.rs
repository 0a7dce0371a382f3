use std::sync::Mutex;

use voicechat_core::types::RecognitionResult;
use voicechat_engine::events::RecognitionSink;
use voicechat_engine::traits::SpeechRecognizer;

#[derive(Debug, Default)]
struct LineState {
    sink: Option<RecognitionSink>,
    results: Vec<RecognitionResult>,
}

/// Recognizer fed with text from the outside, one segment at a time.
///
/// Behaves like a continuous engine: every push re-reports the full result
/// list of the current capture, with at most one trailing interim entry.
#[derive(Debug, Default)]
pub struct LineRecognizer {
    state: Mutex<LineState>,
}

impl LineRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_listening(&self) -> bool {
        self.lock().sink.is_some()
    }

    pub fn push_final(&self, text: &str) -> bool {
        self.push(RecognitionResult::finalized(text.trim()))
    }

    pub fn push_interim(&self, text: &str) -> bool {
        self.push(RecognitionResult::interim(text.trim()))
    }

    /// Ends the capture as if the engine hit its silence timeout.
    pub fn end(&self) -> bool {
        let mut state = self.lock();
        state.results.clear();
        match state.sink.take() {
            Some(sink) => sink.ended(),
            None => false,
        }
    }

    fn push(&self, mut result: RecognitionResult) -> bool {
        let mut state = self.lock();
        let Some(sink) = state.sink.clone() else {
            return false;
        };

        if state.results.last().is_some_and(|r| !r.is_final) {
            state.results.pop();
        }
        if !state.results.is_empty() {
            result.transcript.insert(0, ' ');
        }
        state.results.push(result);
        sink.results(state.results.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SpeechRecognizer for LineRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&self, sink: RecognitionSink) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.results.clear();
        state.sink = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.lock();
        state.results.clear();
        state.sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;
    use voicechat_engine::events::{RecognitionEvent, SessionEvent};

    fn results_of(event: SessionEvent) -> Vec<RecognitionResult> {
        match event {
            SessionEvent::Recognition {
                event: RecognitionEvent::Results(r),
                ..
            } => r,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn reports_cumulative_results_with_single_trailing_interim() {
        let (tx, mut rx) = unbounded_channel();
        let rec = LineRecognizer::new();
        assert!(!rec.push_final("ignored"));

        rec.start(RecognitionSink::new(1, tx.downgrade())).unwrap();
        assert!(rec.is_listening());

        rec.push_interim("head");
        assert_eq!(
            results_of(rx.try_recv().unwrap()),
            vec![RecognitionResult::interim("head")]
        );

        rec.push_final("headache relief");
        rec.push_interim("for");
        rec.push_final("for kids");
        assert_eq!(
            results_of(rx.try_recv().unwrap()),
            vec![RecognitionResult::finalized("headache relief")]
        );
        rx.try_recv().unwrap();
        assert_eq!(
            results_of(rx.try_recv().unwrap()),
            vec![
                RecognitionResult::finalized("headache relief"),
                RecognitionResult::finalized(" for kids"),
            ]
        );

        assert!(rec.end());
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::Recognition {
                event: RecognitionEvent::Ended,
                ..
            }
        ));
        assert!(!rec.is_listening());
    }
}
