/// Groq tier
///
/// Groq speaks the OpenAI chat-completions protocol with bearer-token auth.
/// The prompt is sent as a single user message and the generated text is
/// `choices[0].message.content`. JSON mode uses `response_format: json_object`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{map_send_error, read_body};
use super::provider_trait::{GenerationRequest, ProviderClient, ProviderError, ProviderResult};
use crate::limits::{TierLimits, GROQ, MAX_RESPONSE_BYTES};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    response_format: ResponseFormat,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct GroqProvider {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    limits: TierLimits,
}

impl GroqProvider {
    pub fn new(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        GroqProvider {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            limits: GROQ,
        }
    }

    fn extract_text(body: &[u8]) -> ProviderResult<String> {
        let parsed: ChatResponse = serde_json::from_slice(body)
            .map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedEnvelope("no choice content".to_string()))
    }
}

#[async_trait]
impl ProviderClient for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn limits(&self) -> TierLimits {
        self.limits
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let max_tokens = self.limits.clamp_tokens(request.max_tokens);
        debug!(tier = "groq", max_tokens, wants_json = request.wants_json, "Calling Groq");

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            response_format: ResponseFormat {
                kind: if request.wants_json { "json_object" } else { "text" },
            },
            max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.limits.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.limits.timeout))?;

        let bytes = read_body(response, MAX_RESPONSE_BYTES, self.limits.timeout).await?;
        Self::extract_text(&bytes)
    }
}
