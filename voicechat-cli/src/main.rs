use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use voicechat_core::config::AppConfig;
use voicechat_core::types::{ConsentState, Message, Role};
use voicechat_engine::{SessionHandle, SessionSnapshot};
use voicechat_platform::{ConsoleSynthesizer, LineRecognizer};
use voicechat_runtime::config_store::ConfigStore;
use voicechat_runtime::secrets::{forget_api_key, resolve_api_key, store_api_key};
use voicechat_runtime::session_builder::{SpeechEngines, spawn_session_from_config};

const HELP: &str = "\
commands:
  <text>           type a message and send it (while recording: dictate it)
  /rec             start or stop dictation
  /interim <text>  dictate a provisional segment
  /silence         let the recognizer end capture on its own
  /send            send the pending input
  /clear           start over (erases saved history if you consented)
  /show            print the whole conversation
  /key <value>     save the API key to the keyring (/key alone removes it)
  /help            this text
  /quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Empty,
    Text(String),
    Interim(String),
    ToggleRecording,
    Silence,
    Send,
    Clear,
    Show,
    SetKey(String),
    ForgetKey,
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if !line.starts_with('/') {
        return Input::Text(line.to_string());
    }

    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    match cmd {
        "/rec" => Input::ToggleRecording,
        "/interim" => Input::Interim(rest.trim().to_string()),
        "/silence" => Input::Silence,
        "/send" => Input::Send,
        "/clear" => Input::Clear,
        "/show" => Input::Show,
        "/key" if rest.trim().is_empty() => Input::ForgetKey,
        "/key" => Input::SetKey(rest.trim().to_string()),
        "/help" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

fn format_message(m: &Message) -> String {
    match m.role {
        Role::User => format!("you> {}", m.content),
        Role::Model => format!("assistant> {}", m.content),
    }
}

/// Turns successive snapshots into terminal lines.
#[derive(Debug, Default)]
struct TranscriptView {
    shown: Vec<Message>,
    recording: bool,
    pending: String,
}

impl TranscriptView {
    fn update(&mut self, snap: &SessionSnapshot) -> Vec<String> {
        let mut lines = vec![];

        if snap.transcript.starts_with(&self.shown) {
            lines.extend(snap.transcript[self.shown.len()..].iter().map(format_message));
        } else {
            lines.push("-- conversation cleared --".to_string());
            lines.extend(snap.transcript.iter().map(format_message));
        }
        self.shown = snap.transcript.clone();

        if snap.recording.is_active != self.recording {
            self.recording = snap.recording.is_active;
            lines.push(if self.recording {
                "(recording, type to dictate; /rec to stop)".to_string()
            } else {
                "(recording stopped, /send to submit)".to_string()
            });
        }

        if self.recording && snap.pending_input != self.pending && !snap.pending_input.is_empty()
        {
            lines.push(format!("... {}", snap.pending_input));
        }
        self.pending = snap.pending_input.clone();

        lines
    }
}

async fn render(mut snapshots: watch::Receiver<SessionSnapshot>) {
    let mut view = TranscriptView::default();
    loop {
        let snap = snapshots.borrow_and_update().clone();
        for line in view.update(&snap) {
            println!("{line}");
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Ok(v) = std::env::var("VOICECHAT_BASE_URL") {
        cfg.generation.base_url = v;
    }
    if let Ok(v) = std::env::var("VOICECHAT_MODEL") {
        cfg.generation.model = v;
    }
    if let Ok(v) = std::env::var("VOICECHAT_CONSENT") {
        cfg.persistence_consent = ConsentState::parse(&v)
            .with_context(|| format!("VOICECHAT_CONSENT must be pending|accepted|declined, got {v:?}"))?;
    }
    Ok(())
}

fn load_context_document() -> anyhow::Result<Option<serde_json::Value>> {
    let Ok(path) = std::env::var("VOICECHAT_CONTEXT_FILE") else {
        return Ok(None);
    };
    let bytes = std::fs::read(&path).with_context(|| format!("read context document: {path}"))?;
    let doc = serde_json::from_slice(&bytes).context("decode context document JSON")?;
    log::info!("auxiliary context loaded from {path}");
    Ok(Some(doc))
}

fn dispatch(
    input: Input,
    handle: &SessionHandle,
    recognizer: &LineRecognizer,
) -> anyhow::Result<bool> {
    match input {
        Input::Empty => {}
        Input::Text(text) => {
            if recognizer.is_listening() {
                recognizer.push_final(&text);
            } else {
                handle.edit_input(text)?;
                handle.submit()?;
            }
        }
        Input::Interim(text) => {
            if !recognizer.push_interim(&text) {
                println!("(not recording)");
            }
        }
        Input::ToggleRecording => handle.toggle_recording()?,
        Input::Silence => {
            recognizer.end();
        }
        Input::Send => handle.submit()?,
        Input::Clear => handle.clear()?,
        Input::Show => {
            for m in &handle.snapshot().transcript {
                println!("{}", format_message(m));
            }
        }
        Input::SetKey(key) => match store_api_key(&key) {
            Ok(()) => println!("(API key saved; it is used from the next start)"),
            Err(e) => println!("(could not save the API key: {e:#})"),
        },
        Input::ForgetKey => match forget_api_key() {
            Ok(()) => println!("(API key removed from the keyring)"),
            Err(e) => println!("(could not remove the API key: {e:#})"),
        },
        Input::Help => println!("{HELP}"),
        Input::Quit => return Ok(false),
        Input::Unknown(cmd) => println!("unknown command {cmd}, try /help"),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config_path = std::env::var("VOICECHAT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".voicechat/config.json"));
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let store = ConfigStore::at_path(&config_path);
    let mut cfg = store.load_or_default()?;
    log::info!("config loaded from {}", store.path().display());
    apply_env_overrides(&mut cfg)?;

    let api_key = resolve_api_key(std::env::var("VOICECHAT_API_KEY").ok());
    let context = load_context_document()?;

    let recognizer = Arc::new(LineRecognizer::new());
    let handle = spawn_session_from_config(
        &cfg,
        &config_dir,
        api_key,
        SpeechEngines {
            recognizer: recognizer.clone(),
            synthesizer: Arc::new(ConsoleSynthesizer),
        },
        context,
    )?;

    let renderer = tokio::spawn(render(handle.subscribe()));
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        if !dispatch(parse_line(&line), &handle, &recognizer)? {
            break;
        }
    }

    handle.shutdown()?;
    handle.closed().await;
    renderer.abort();
    Ok(())
}
