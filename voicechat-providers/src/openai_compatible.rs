use crate::request::HttpRequest;
use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiCompatibleChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

pub fn build_chat_completions_request(
    cfg: &OpenAiCompatibleChatConfig,
    messages: &[ChatMessage],
) -> anyhow::Result<HttpRequest> {
    let url = join_url(&cfg.base_url, "/chat/completions")?;

    let payload = json!({
        "model": cfg.model,
        "messages": messages,
        "temperature": cfg.temperature,
    });

    Ok(HttpRequest::post_json(url, &payload).with_bearer(&cfg.api_key))
}

fn join_url(base: &str, path: &str) -> anyhow::Result<String> {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = format!("{}/{}", base, path);
    Url::parse(&joined).with_context(|| format!("invalid base url: {base}"))?;
    Ok(joined)
}
