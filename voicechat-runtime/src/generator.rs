use anyhow::anyhow;
use serde_json::Value;
use voicechat_core::config::GenerationSettings;
use voicechat_core::text::strip_reasoning_blocks;
use voicechat_core::types::{Message, Role};
use voicechat_engine::traits::ResponseGenerator;
use voicechat_providers::openai_compatible::{
    ChatMessage, OpenAiCompatibleChatConfig, build_chat_completions_request,
};
use voicechat_providers::parse::{parse_openai_chat_completion, parse_openai_error};
use voicechat_providers::runtime::HttpClient;

#[derive(Clone)]
pub struct OpenAiCompatibleGenerator {
    client: HttpClient,
    cfg: OpenAiCompatibleChatConfig,
    system_prompt: String,
}

impl std::fmt::Debug for OpenAiCompatibleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleGenerator")
            .field("base_url", &self.cfg.base_url)
            .field("model", &self.cfg.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAiCompatibleGenerator {
    pub fn new(settings: &GenerationSettings, api_key: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: HttpClient::new()?,
            cfg: OpenAiCompatibleChatConfig {
                base_url: settings.base_url.clone(),
                api_key: api_key.into(),
                model: settings.model.clone(),
                temperature: settings.temperature,
            },
            system_prompt: settings.system_prompt.clone(),
        })
    }

    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }
}

/// Maps the transcript onto chat roles behind a system message. The
/// auxiliary document, if any, is appended to the system message verbatim.
pub fn chat_messages(
    system_prompt: &str,
    transcript: &[Message],
    context: Option<&Value>,
) -> Vec<ChatMessage> {
    let mut system = system_prompt.to_string();
    if let Some(ctx) = context {
        let rendered = serde_json::to_string_pretty(ctx).unwrap_or_else(|_| ctx.to_string());
        system.push_str("\n\nReference document (JSON):\n");
        system.push_str(&rendered);
    }

    let mut out = Vec::with_capacity(transcript.len() + 1);
    out.push(ChatMessage::new("system", system));
    out.extend(transcript.iter().map(|m| {
        let role = match m.role {
            Role::User => "user",
            Role::Model => "assistant",
        };
        ChatMessage::new(role, m.content.clone())
    }));
    out
}

#[async_trait::async_trait]
impl ResponseGenerator for OpenAiCompatibleGenerator {
    async fn generate(
        &self,
        transcript: &[Message],
        context: Option<&Value>,
    ) -> anyhow::Result<String> {
        let messages = chat_messages(&self.system_prompt, transcript, context);
        let req = build_chat_completions_request(&self.cfg, &messages)?;
        let resp = self.client.execute(&req).await?;

        if !resp.is_success() {
            let detail = parse_openai_error(&resp.body)
                .unwrap_or_else(|| String::from_utf8_lossy(&resp.body).into_owned());
            return Err(anyhow!(
                "OpenAI-compatible request failed: status={} body={}",
                resp.status,
                detail
            ));
        }

        let text = strip_reasoning_blocks(&parse_openai_chat_completion(&resp.body)?);
        if text.is_empty() {
            return Err(anyhow!("model returned an empty answer"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: String) -> GenerationSettings {
        GenerationSettings {
            base_url,
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            system_prompt: "Be brief.".into(),
        }
    }

    #[test]
    fn maps_roles_and_embeds_context() {
        let transcript = vec![Message::model("hello"), Message::user("dizzy?")];
        let ctx = json!({"bp": "120/80"});

        let msgs = chat_messages("Be brief.", &transcript, Some(&ctx));
        let roles: Vec<&str> = msgs.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "assistant", "user"]);
        assert!(msgs[0].content.starts_with("Be brief."));
        assert!(msgs[0].content.contains("\"bp\": \"120/80\""));

        let plain = chat_messages("Be brief.", &transcript, None);
        assert_eq!(plain[0].content, "Be brief.");
    }

    #[tokio::test]
    async fn sends_transcript_and_cleans_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"choices":[{"message":{"content":"<think>hmm</think> Drink water."}}]}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let generator =
            OpenAiCompatibleGenerator::new(&settings(format!("{}/v1", server.uri())), "k").unwrap();
        let transcript = vec![Message::model("hi"), Message::user("What helps a headache?")];

        let text = generator.generate(&transcript, None).await.unwrap();
        assert_eq!(text, "Drink water.");

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][2]["content"], "What helps a headache?");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_raw(
                r#"{"error":{"message":"Rate limit reached"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let generator = OpenAiCompatibleGenerator::new(&settings(server.uri()), "k").unwrap();
        let err = generator
            .generate(&[Message::user("hi")], None)
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("429"));
        assert!(msg.contains("Rate limit reached"));
    }

    #[tokio::test]
    async fn empty_answer_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"choices":[{"message":{"content":"<think>only thoughts</think>"}}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let generator = OpenAiCompatibleGenerator::new(&settings(server.uri()), "").unwrap();
        assert!(generator.generate(&[Message::user("hi")], None).await.is_err());
    }
}
