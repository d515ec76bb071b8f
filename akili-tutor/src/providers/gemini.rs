/// Google Gemini tiers
///
/// Two tiers share this client: the fast free model (tier 1) and the paid
/// model (tier 2). Authentication is the API key as a `key` query parameter.
///
/// Request:
///
/// ```json
/// {
///   "contents": [{"parts": [{"text": "<prompt>"}]}],
///   "generationConfig": {"maxOutputTokens": 2500, "responseMimeType": "application/json"}
/// }
/// ```
///
/// The generated text is `candidates[0].content.parts[0].text`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{map_send_error, read_body};
use super::provider_trait::{GenerationRequest, ProviderClient, ProviderError, ProviderResult};
use crate::limits::{TierLimits, GEMINI_FLASH, GEMINI_PAID, MAX_RESPONSE_BYTES};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const FLASH_MODEL: &str = "gemini-2.5-flash";
pub const PAID_MODEL: &str = "gemini-pro";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// One Gemini model tier
pub struct GeminiProvider {
    name: &'static str,
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    limits: TierLimits,
}

impl GeminiProvider {
    /// Tier 1: fast free model
    pub fn flash(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new("gemini_flash", http, api_key, base_url, FLASH_MODEL, GEMINI_FLASH)
    }

    /// Tier 2: paid model
    pub fn paid(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new("gemini_paid", http, api_key, base_url, PAID_MODEL, GEMINI_PAID)
    }

    pub fn new(
        name: &'static str,
        http: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        limits: TierLimits,
    ) -> Self {
        GeminiProvider {
            name,
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            limits,
        }
    }

    fn extract_text(body: &[u8]) -> ProviderResult<String> {
        let parsed: GeminiResponse = serde_json::from_slice(body)
            .map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedEnvelope("no candidate text".to_string()))
    }
}

#[async_trait]
impl ProviderClient for GeminiProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn limits(&self) -> TierLimits {
        self.limits
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let max_tokens = self.limits.clamp_tokens(request.max_tokens);
        debug!(tier = self.name, max_tokens, wants_json = request.wants_json, "Calling Gemini");

        let body = GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: &request.prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                response_mime_type: request.wants_json.then_some("application/json"),
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.limits.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.limits.timeout))?;

        let bytes = read_body(response, MAX_RESPONSE_BYTES, self.limits.timeout).await?;
        Self::extract_text(&bytes)
    }
}
