//! Inference: one chat-completion call per prompt.
//!
//! [`ChatProvider`] is the seam between the pipeline and the model.
//! [`OllamaClient`] implements it against an Ollama-compatible
//! `POST {base_url}/api/chat` endpoint; tests plug in scripted providers.
//!
//! The three extractors at the bottom ([`extract_title`],
//! [`generate_summary`], [`suggest_category`]) are thin: fill a template,
//! wrap it with the system prompt, call the provider, trim the answer. All
//! prompt wording lives in [`crate::prompts`] / [`crate::config::Settings`].
//!
//! ## No retries
//!
//! Every call is one-shot. A failure surfaces as one of four distinct
//! errors (transport, non-JSON body, server-reported error, malformed
//! payload) and the driver records it against the document.

use crate::config::Settings;
use crate::error::PipelineError;
use crate::prompts::{fill_template, PromptVars};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Characters of document text given to the title prompt.
pub const TITLE_CONTEXT_CHARS: usize = 500;

/// Fixed sampling seed so reruns over the same vault are reproducible.
pub const SAMPLING_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A role-tagged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling configuration sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingOptions {
    /// Context window (`Settings::max_tokens`).
    pub num_ctx: usize,
    /// `-1`: generate until the model stops.
    pub num_predict: i64,
    pub seed: u64,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl SamplingOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            num_ctx: settings.max_tokens,
            num_predict: -1,
            seed: SAMPLING_SEED,
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
            repeat_penalty: settings.repeat_penalty,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
        }
    }
}

/// Anything that can answer a chat request with text.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send `messages` and return the generated text.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &SamplingOptions,
    ) -> Result<String, PipelineError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: &'a SamplingOptions,
}

/// Client for an Ollama-compatible `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    token: Option<String>,
}

impl OllamaClient {
    /// Build a client for `base_url` (without `/api/chat`).
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, PipelineError> {
        let endpoint = format!("{}/api/chat", base_url.trim_end_matches('/'));
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| PipelineError::Transport {
            url: endpoint.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            endpoint,
            model: model.into(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Build a client from the endpoint, model, token and timeout settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        Self::new(
            &settings.base_url,
            settings.model.clone(),
            settings.bearer_token().map(str::to_string),
            settings.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatProvider for OllamaClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &SamplingOptions,
    ) -> Result<String, PipelineError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let transport = |e: reqwest::Error| PipelineError::Transport {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        debug!(
            "POST {} → {} ({} bytes) in {:?}",
            self.endpoint,
            status,
            text.len(),
            start.elapsed()
        );

        parse_chat_response(&text)
    }
}

/// Interpret a `/api/chat` response body.
///
/// The HTTP status is not consulted. Ollama reports failures as JSON bodies
/// on 4xx/5xx, so the body alone decides the outcome.
pub fn parse_chat_response(body: &str) -> Result<String, PipelineError> {
    let value: Value = serde_json::from_str(body).map_err(|e| PipelineError::InvalidJson {
        detail: format!("{e}; body starts with {:?}", char_prefix(body, 120)),
    })?;

    match value.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) => {
            return Err(PipelineError::ServerError {
                message: message.clone(),
            })
        }
        Some(err) => {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Err(PipelineError::ServerError { message });
        }
    }

    value
        .pointer("/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PipelineError::MalformedResponse {
            detail: "response has no message.content string".into(),
        })
}

/// The first `n` characters of `text` (not bytes).
pub fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

async fn ask(
    provider: &dyn ChatProvider,
    settings: &Settings,
    template: &str,
    vars: PromptVars<'_>,
) -> Result<String, PipelineError> {
    let messages = [
        ChatMessage::system(settings.system_prompt.as_str()),
        ChatMessage::user(fill_template(template, &vars)),
    ];
    let options = SamplingOptions::from_settings(settings);
    let answer = provider.chat(&messages, &options).await?;
    Ok(answer.trim().to_string())
}

/// Ask for the document title from its first 500 characters.
pub async fn extract_title(
    provider: &dyn ChatProvider,
    settings: &Settings,
    text: &str,
) -> Result<String, PipelineError> {
    ask(
        provider,
        settings,
        &settings.title_prompt,
        PromptVars {
            doc: Some(char_prefix(text, TITLE_CONTEXT_CHARS)),
            ..Default::default()
        },
    )
    .await
}

/// Ask for a summary of the full (stripped) text.
pub async fn generate_summary(
    provider: &dyn ChatProvider,
    settings: &Settings,
    text: &str,
) -> Result<String, PipelineError> {
    ask(
        provider,
        settings,
        &settings.summary_prompt,
        PromptVars {
            doc: Some(text),
            ..Default::default()
        },
    )
    .await
}

/// Ask which category the summary belongs to, given the existing ones.
pub async fn suggest_category(
    provider: &dyn ChatProvider,
    settings: &Settings,
    summary: &str,
    existing: &[String],
) -> Result<String, PipelineError> {
    let existing_subjects = existing.join(", ");
    ask(
        provider,
        settings,
        &settings.category_prompt,
        PromptVars {
            summary: Some(summary),
            existing_subjects: Some(existing_subjects.as_str()),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the last request and answers with a fixed string.
    struct EchoProvider {
        answer: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl EchoProvider {
        fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last_user_message(&self) -> String {
            let seen = self.seen.lock().unwrap();
            seen.last().unwrap()[1].content.clone()
        }
    }

    #[async_trait]
    impl ChatProvider for EchoProvider {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _options: &SamplingOptions,
        ) -> Result<String, PipelineError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.answer.clone())
        }
    }

    #[test]
    fn parses_content() {
        let body = r#"{"model":"m","message":{"role":"assistant","content":"Hello"},"done":true}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "Hello");
    }

    #[test]
    fn error_object_becomes_server_error() {
        let err = parse_chat_response(r#"{"error":{"message":"overloaded"}}"#).unwrap_err();
        assert!(
            matches!(err, PipelineError::ServerError { ref message } if message == "overloaded"),
            "got: {err:?}"
        );
    }

    #[test]
    fn bare_error_string_becomes_server_error() {
        let err = parse_chat_response(r#"{"error":"model 'x' not found"}"#).unwrap_err();
        assert!(
            matches!(err, PipelineError::ServerError { ref message } if message.contains("not found"))
        );
    }

    #[test]
    fn non_json_body_is_invalid_json() {
        let err = parse_chat_response("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidJson { .. }), "got: {err:?}");
    }

    #[test]
    fn missing_content_is_malformed() {
        for body in [r#"{"message":{}}"#, r#"{"done":true}"#, r#"{"message":{"content":7}}"#] {
            let err = parse_chat_response(body).unwrap_err();
            assert!(
                matches!(err, PipelineError::MalformedResponse { .. }),
                "{body}: {err:?}"
            );
        }
    }

    #[test]
    fn sampling_options_follow_settings() {
        let settings = Settings::builder()
            .max_tokens(2048)
            .temperature(0.3)
            .top_k(20)
            .build()
            .unwrap();
        let opts = SamplingOptions::from_settings(&settings);
        assert_eq!(opts.num_ctx, 2048);
        assert_eq!(opts.num_predict, -1);
        assert_eq!(opts.seed, 42);
        assert_eq!(opts.temperature, 0.3);
        assert_eq!(opts.top_k, 20);
    }

    #[test]
    fn char_prefix_counts_chars() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("", 3), "");
    }

    #[tokio::test]
    async fn title_uses_first_500_chars_and_trims() {
        let provider = EchoProvider::new("  My Great Paper \n");
        let settings = Settings::builder()
            .title_prompt("TITLE:{doc}")
            .build()
            .unwrap();
        let text = "x".repeat(600);

        let title = extract_title(&provider, &settings, &text).await.unwrap();
        assert_eq!(title, "My Great Paper");
        assert_eq!(provider.last_user_message(), format!("TITLE:{}", "x".repeat(500)));
    }

    #[tokio::test]
    async fn category_prompt_lists_existing_subjects() {
        let provider = EchoProvider::new("Scaling");
        let settings = Settings::builder()
            .category_prompt("{existing_subjects} | {summary}")
            .system_prompt("SYS")
            .build()
            .unwrap();
        let existing = vec!["Alignment".to_string(), "Scaling".to_string()];

        let cat = suggest_category(&provider, &settings, "sum", &existing)
            .await
            .unwrap();
        assert_eq!(cat, "Scaling");
        assert_eq!(provider.last_user_message(), "Alignment, Scaling | sum");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0][0], ChatMessage::system("SYS"));
        assert_eq!(seen[0][1].role, Role::User);
    }

    #[tokio::test]
    async fn summary_gets_full_text() {
        let provider = EchoProvider::new("summary");
        let settings = Settings::builder()
            .summary_prompt("S:{doc}")
            .build()
            .unwrap();
        let text = "y".repeat(2000);
        generate_summary(&provider, &settings, &text).await.unwrap();
        assert_eq!(provider.last_user_message(), format!("S:{text}"));
    }

    #[test]
    fn request_body_shape() {
        let settings = Settings::default();
        let options = SamplingOptions::from_settings(&settings);
        let messages = [ChatMessage::system("s"), ChatMessage::user("u")];
        let body = ChatRequest {
            model: "m",
            messages: &messages,
            stream: false,
            options: &options,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["stream"], false);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["messages"][1]["content"], "u");
        assert_eq!(v["options"]["num_predict"], -1);
        assert_eq!(v["options"]["seed"], 42);
        assert_eq!(v["options"]["num_ctx"], settings.max_tokens as u64);
        for key in [
            "temperature",
            "top_k",
            "top_p",
            "repeat_penalty",
            "presence_penalty",
            "frequency_penalty",
        ] {
            assert!(v["options"].get(key).is_some(), "missing {key}");
        }
    }
}
