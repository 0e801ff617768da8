//! OpenAI-compatible `/chat/completions` client (LiteLLM proxy and friends).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CompletionSettings, Credentials};
use crate::error::TrialScoutError;

const COMPLETION_API: &str = "completion endpoint";

pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);
pub const SYSTEM_PERSONA: &str = "You are a concise, empathetic assistant.";

/// Anything that can turn a prompt into generated text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, TrialScoutError>;
}

pub struct ChatCompletionsClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    settings: CompletionSettings,
}

impl ChatCompletionsClient {
    pub fn new(
        credentials: &Credentials,
        settings: CompletionSettings,
    ) -> Result<Self, TrialScoutError> {
        Ok(Self {
            client: crate::sources::http_client()?,
            url: crate::sources::join_endpoint(&credentials.api_base, "chat/completions"),
            api_key: credentials.api_key.clone(),
            settings,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, TrialScoutError> {
        let body = ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PERSONA,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        debug!(model = %self.settings.model, prompt_chars = prompt.len(), "requesting completion");

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(COMPLETION_TIMEOUT)
            .send()
            .await
            .map_err(|err| TrialScoutError::from_send(COMPLETION_API, COMPLETION_TIMEOUT, err))?;

        let status = resp.status();
        let bytes =
            crate::sources::read_limited_body(resp, COMPLETION_API, COMPLETION_TIMEOUT).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(TrialScoutError::Api {
                api: COMPLETION_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|source| TrialScoutError::ApiJson {
                api: COMPLETION_API.to_string(),
                source,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| TrialScoutError::Api {
                api: COMPLETION_API.to_string(),
                message: format!(
                    "response has no choices[0].message.content: {}",
                    crate::sources::body_excerpt(&bytes)
                ),
            })
    }
}
