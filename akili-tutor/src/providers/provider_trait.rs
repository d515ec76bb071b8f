/// Provider contract
///
/// A provider wraps exactly one outbound generation call to one AI tier:
/// clamp the token budget, send the prompt, wait at most the tier timeout,
/// and pull the generated text out of the provider's response envelope.
///
/// Failures are values. A provider never retries; trying the next tier is
/// the orchestrator's job.
///
/// # Example
///
/// ```no_run
/// use akili_tutor::providers::{GenerationRequest, ProviderClient, ProviderResult};
/// use akili_tutor::limits::{TierLimits, GROQ};
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl ProviderClient for EchoProvider {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn limits(&self) -> TierLimits {
///         GROQ
///     }
///
///     async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String> {
///         Ok(request.prompt.clone())
///     }
/// }
/// ```

use async_trait::async_trait;
use std::time::Duration;

use crate::limits::TierLimits;

/// Provider call errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Connection or transport failure
    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),

    /// Non-200 status
    #[error("Provider returned status {0}")]
    Status(u16),

    /// 200 with a body we could not read generated text from
    #[error("Malformed provider response: {0}")]
    MalformedEnvelope(String),

    #[error("Provider response exceeded {limit} bytes")]
    ResponseTooLarge { limit: usize },
}

/// Provider result type alias
pub type ProviderResult<T> = Result<T, ProviderError>;

/// One generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Fully assembled prompt
    pub prompt: String,

    /// Requested output budget, clamped per tier; `None` uses the tier maximum
    pub max_tokens: Option<u32>,

    /// Ask the provider for structured JSON output
    pub wants_json: bool,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        GenerationRequest {
            prompt: prompt.into(),
            max_tokens: None,
            wants_json: false,
        }
    }
}

/// One AI tier
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Tier name reported as `tier_used` and in logs
    fn name(&self) -> &str;

    /// Token ceiling and timeout of this tier
    fn limits(&self) -> TierLimits;

    /// Issues one call and returns the generated text
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ProviderError::Status(503).to_string(), "Provider returned status 503");
        assert_eq!(
            ProviderError::ResponseTooLarge { limit: 10 }.to_string(),
            "Provider response exceeded 10 bytes"
        );
    }

    #[test]
    fn test_text_request_defaults() {
        let request = GenerationRequest::text("hello");
        assert_eq!(request.max_tokens, None);
        assert!(!request.wants_json);
    }
}
