use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use voicechat_core::types::{ConsentState, Message, SessionPhase};
use voicechat_engine::testing::{
    Journal, MemoryPersistence, RecordingSynthesizer, ScriptedGenerator, ScriptedRecognizer,
};
use voicechat_engine::{ChatError, ChatSession, SessionConfig, SessionHandle, SessionProviders};

const GREETING: &str = "Hello, I am a health assistant, not a doctor.";
const APOLOGY: &str = "Sorry, something went wrong.";

struct Harness {
    handle: SessionHandle,
    recognizer: Arc<ScriptedRecognizer>,
    synthesizer: Arc<RecordingSynthesizer>,
    persistence: Arc<MemoryPersistence>,
    generator: Arc<ScriptedGenerator>,
    journal: Journal,
}

fn config() -> SessionConfig {
    SessionConfig {
        greeting: GREETING.into(),
        apology: APOLOGY.into(),
        ..Default::default()
    }
}

fn start(
    cfg: SessionConfig,
    consent: ConsentState,
    journal: Journal,
    generator: ScriptedGenerator,
    persistence: MemoryPersistence,
) -> Harness {
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let synthesizer = Arc::new(RecordingSynthesizer::new(journal.clone()));
    let persistence = Arc::new(persistence);
    let generator = Arc::new(generator);

    let handle = ChatSession::spawn(
        cfg,
        SessionProviders {
            generator: generator.clone(),
            recognizer: recognizer.clone(),
            synthesizer: synthesizer.clone(),
            persistence: persistence.clone(),
        },
        consent,
    );

    Harness {
        handle,
        recognizer,
        synthesizer,
        persistence,
        generator,
        journal,
    }
}

async fn ask(handle: &SessionHandle, text: &str, expected_len: usize) -> Vec<Message> {
    handle.edit_input(text).unwrap();
    handle.submit().unwrap();
    handle
        .wait_for(|s| s.phase == SessionPhase::Idle && s.transcript.len() == expected_len)
        .await
        .unwrap()
        .transcript
}

#[tokio::test]
async fn fresh_session_answers_and_speaks_once() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Accepted,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()).reply("Rest, fluids and a dark room."),
        MemoryPersistence::new(journal),
    );

    assert_eq!(h.handle.snapshot().transcript, vec![Message::model(GREETING)]);

    let transcript = ask(&h.handle, "What helps a headache?", 3).await;
    assert_eq!(
        transcript,
        vec![
            Message::model(GREETING),
            Message::user("What helps a headache?"),
            Message::model("Rest, fluids and a dark room."),
        ]
    );
    assert_eq!(
        h.synthesizer.spoken_texts(),
        vec!["Rest, fluids and a dark room."]
    );

    let calls = h.generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].transcript.len(), 2);
    assert_eq!(calls[0].transcript[1], Message::user("What helps a headache?"));

    assert_eq!(h.persistence.saved(), Some(transcript));
    let spoken = h.journal.position("speak:Rest, fluids and a dark room.").unwrap();
    let saved = h.journal.position("save:3").unwrap();
    assert!(spoken < saved);
}

#[tokio::test]
async fn generation_failure_appends_one_apology() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Declined,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()).fail("connection reset by peer"),
        MemoryPersistence::new(journal),
    );

    let transcript = ask(&h.handle, "hello", 3).await;
    assert_eq!(transcript[2], Message::model(APOLOGY));
    assert_eq!(h.synthesizer.spoken_texts(), vec![APOLOGY]);
}

#[tokio::test]
async fn submissions_while_awaiting_are_dropped() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Pending,
        journal.clone(),
        ScriptedGenerator::held(journal.clone()).reply("only answer"),
        MemoryPersistence::new(journal),
    );

    h.handle.edit_input("first").unwrap();
    h.handle.submit().unwrap();
    h.handle
        .wait_for(|s| s.phase == SessionPhase::AwaitingResponse)
        .await
        .unwrap();

    h.handle.edit_input("second").unwrap();
    h.handle.submit().unwrap();
    h.handle.submit().unwrap();
    let snap = h.handle.wait_for(|s| s.pending_input == "second").await.unwrap();
    assert_eq!(snap.transcript.len(), 2);

    h.generator.release();
    let snap = h
        .handle
        .wait_for(|s| s.phase == SessionPhase::Idle)
        .await
        .unwrap();
    assert_eq!(snap.transcript.len(), 3);
    assert_eq!(snap.pending_input, "second");
    assert_eq!(h.generator.calls().len(), 1);
}

#[tokio::test]
async fn dictation_updates_pending_input() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Pending,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()),
        MemoryPersistence::new(journal),
    );

    h.handle.edit_input("typed text").unwrap();
    h.handle.toggle_recording().unwrap();
    let snap = h.handle.wait_for(|s| s.recording.is_active).await.unwrap();
    assert_eq!(snap.pending_input, "");

    h.recognizer.emit_interim("head");
    h.handle.wait_for(|s| s.pending_input == "head").await.unwrap();

    h.recognizer.emit_final("headache relief");
    h.handle
        .wait_for(|s| s.pending_input == "headache relief")
        .await
        .unwrap();

    h.handle.toggle_recording().unwrap();
    let snap = h.handle.wait_for(|s| !s.recording.is_active).await.unwrap();
    assert_eq!(snap.pending_input, "headache relief");
    assert_eq!(h.recognizer.start_calls(), 1);
    assert_eq!(h.recognizer.stop_calls(), 1);
}

#[tokio::test]
async fn engine_ending_capture_resyncs_recording_flag() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Pending,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()),
        MemoryPersistence::new(journal),
    );

    h.handle.toggle_recording().unwrap();
    h.handle.wait_for(|s| s.recording.is_active).await.unwrap();

    h.recognizer.emit_final("my back hurts");
    h.recognizer.end();
    let snap = h.handle.wait_for(|s| !s.recording.is_active).await.unwrap();
    assert_eq!(snap.pending_input, "my back hurts");
    assert_eq!(h.recognizer.stop_calls(), 0);

    // A toggle now starts a new capture instead of stopping a dead one.
    h.handle.toggle_recording().unwrap();
    h.handle.wait_for(|s| s.recording.is_active).await.unwrap();
    assert_eq!(h.recognizer.start_calls(), 2);
}

#[tokio::test]
async fn clear_resets_everything_it_owns() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Accepted,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()).reply("Try a cold compress."),
        MemoryPersistence::new(journal),
    );

    ask(&h.handle, "What helps a headache?", 3).await;
    assert!(h.persistence.saved().is_some());

    h.handle.toggle_recording().unwrap();
    h.handle.wait_for(|s| s.recording.is_active).await.unwrap();
    h.recognizer.emit_final("headache relief");
    h.handle
        .wait_for(|s| s.recording.live_text == "headache relief")
        .await
        .unwrap();

    h.handle.clear().unwrap();
    let snap = h
        .handle
        .wait_for(|s| s.transcript.len() == 1 && !s.recording.is_active)
        .await
        .unwrap();

    assert_eq!(snap.transcript, vec![Message::model(GREETING)]);
    assert_eq!(snap.recording.live_text, "");
    assert_eq!(snap.pending_input, "headache relief");
    assert_eq!(h.persistence.saved(), None);
    assert_eq!(h.persistence.clears(), 1);
    assert_eq!(h.synthesizer.cancel_calls(), 1);
    assert_eq!(h.recognizer.stop_calls(), 1);
}

#[tokio::test]
async fn reply_arriving_after_clear_lands_in_fresh_transcript() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Accepted,
        journal.clone(),
        ScriptedGenerator::held(journal.clone()).reply("late answer"),
        MemoryPersistence::new(journal),
    );

    h.handle.edit_input("question").unwrap();
    h.handle.submit().unwrap();
    h.handle.clear().unwrap();
    let snap = h.handle.wait_for(|s| s.transcript.len() == 1).await.unwrap();
    assert_eq!(snap.phase, SessionPhase::AwaitingResponse);

    h.generator.release();
    let snap = h
        .handle
        .wait_for(|s| s.phase == SessionPhase::Idle)
        .await
        .unwrap();
    assert_eq!(
        snap.transcript,
        vec![Message::model(GREETING), Message::model("late answer")]
    );
    assert_eq!(h.synthesizer.spoken_texts(), vec!["late answer"]);
}

#[tokio::test]
async fn declined_consent_never_touches_storage() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Declined,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()).reply("a").reply("b"),
        MemoryPersistence::with_saved(journal, vec![Message::user("someone else's chat")]),
    );

    ask(&h.handle, "one", 3).await;
    ask(&h.handle, "two", 5).await;
    h.handle.clear().unwrap();
    h.handle.wait_for(|s| s.transcript.len() == 1).await.unwrap();

    assert_eq!(h.persistence.total_calls(), 0);
    assert_eq!(
        h.persistence.saved(),
        Some(vec![Message::user("someone else's chat")])
    );
}

#[tokio::test]
async fn auxiliary_context_is_passed_through_unchanged() {
    let journal = Journal::new();
    let report = json!({"patient": {"age": 42}, "labs": [{"name": "HbA1c", "value": 6.1}]});
    let h = start(
        SessionConfig {
            auxiliary_context: Some(report.clone()),
            ..config()
        },
        ConsentState::Pending,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()).reply("ok"),
        MemoryPersistence::new(journal),
    );

    ask(&h.handle, "Is my HbA1c fine?", 3).await;
    assert_eq!(h.generator.calls()[0].context, Some(report));
}

#[tokio::test]
async fn shutdown_closes_the_handle() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Pending,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()),
        MemoryPersistence::new(journal),
    );

    h.handle.shutdown().unwrap();
    h.handle.closed().await;
    assert_eq!(h.handle.submit(), Err(ChatError::SessionClosed));
}

#[tokio::test]
async fn recognizer_error_keeps_recording_until_the_engine_ends() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Pending,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()),
        MemoryPersistence::new(journal),
    );

    h.handle.toggle_recording().unwrap();
    h.handle.wait_for(|s| s.recording.is_active).await.unwrap();
    h.recognizer.emit_interim("my knee");
    h.recognizer.emit_error("network");
    h.handle.edit_input("marker").unwrap();

    // The marker command is queued after the error, so the error has been applied.
    let snap = h.handle.wait_for(|s| s.pending_input == "marker").await.unwrap();
    assert!(snap.recording.is_active);
    assert_eq!(snap.recording.live_text, "my knee");

    h.recognizer.end();
    h.handle.wait_for(|s| !s.recording.is_active).await.unwrap();
    assert_eq!(h.recognizer.stop_calls(), 0);
}

#[tokio::test]
async fn dropping_every_handle_ends_the_session() {
    let journal = Journal::new();
    let h = start(
        config(),
        ConsentState::Pending,
        journal.clone(),
        ScriptedGenerator::new(journal.clone()),
        MemoryPersistence::new(journal),
    );

    h.handle.toggle_recording().unwrap();
    h.handle.wait_for(|s| s.recording.is_active).await.unwrap();

    let mut snapshots = h.handle.subscribe();
    let Harness {
        handle, recognizer, ..
    } = h;
    drop(handle.clone());
    drop(handle);

    let exited = tokio::time::timeout(Duration::from_secs(2), async {
        while snapshots.changed().await.is_ok() {}
    })
    .await;
    assert!(exited.is_ok());
    assert_eq!(recognizer.stop_calls(), 1);
}
