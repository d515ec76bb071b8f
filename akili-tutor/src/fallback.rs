/// Tier cascade
///
/// The orchestrator walks a fixed priority list of provider tiers and
/// returns the first success. Nothing is remembered between calls: the
/// "circuit breaker" is only the terminal branch taken when every tier of
/// one invocation failed, and it answers with a user-facing capacity
/// message instead of an error.
///
/// # Architecture
///
/// ```text
/// FallbackOrchestrator
///   ├─> prompts::assemble (once, before the cascade)
///   ├─> Tier 1: Gemini Flash
///   ├─> Tier 2: Gemini Paid
///   ├─> Tier 3: Groq
///   └─> Circuit breaker: capacity message
/// ```
///
/// Worst-case latency is the sum of the configured tier timeouts.
///
/// # Example
///
/// ```no_run
/// use akili_tutor::fallback::{FallbackOrchestrator, FallbackRequest};
/// use akili_tutor::providers::ScriptedProvider;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let orchestrator = FallbackOrchestrator::new(vec![
///     Arc::new(ScriptedProvider::new("gemini_flash").respond("[]")),
/// ]);
///
/// let outcome = orchestrator
///     .call_with_fallback(&FallbackRequest::new("List modules").json().max_tokens(1500))
///     .await;
/// assert!(outcome.success);
/// # }
/// ```

use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::prompts;
use crate::providers::{gemini, groq, GeminiProvider, GenerationRequest, GroqProvider, ProviderClient};

/// Shown to the learner when every tier failed
pub const CAPACITY_MESSAGE: &str = "Our AI tutors are at full capacity. Please try again in 2–3 minutes.";

/// `tier_used` of the all-tiers-failed outcome
pub const CIRCUIT_BREAKER: &str = "circuit_breaker";

/// Input of one cascade
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub wants_json: bool,

    /// Subject name; STEM subjects get LaTeX instructions
    pub subject_hint: Option<String>,
}

impl FallbackRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        FallbackRequest {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn json(mut self) -> Self {
        self.wants_json = true;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject_hint = Some(subject.into());
        self
    }

    /// Prompt as sent to every tier
    pub fn assembled_prompt(&self) -> String {
        prompts::assemble(
            self.system_prompt.as_deref(),
            &self.prompt,
            self.wants_json,
            self.subject_hint.as_deref(),
        )
    }
}

/// Result of one cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackOutcome {
    pub success: bool,

    /// Generated text, or [`CAPACITY_MESSAGE`] on failure
    pub content: String,

    /// Name of the serving tier, or [`CIRCUIT_BREAKER`]
    pub tier_used: String,
}

impl FallbackOutcome {
    fn exhausted() -> Self {
        FallbackOutcome {
            success: false,
            content: CAPACITY_MESSAGE.to_string(),
            tier_used: CIRCUIT_BREAKER.to_string(),
        }
    }
}

/// Credentials and endpoints of the built-in tiers
///
/// A tier without a key is left out of the cascade.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub gemini_api_key: Option<String>,

    /// Falls back to `gemini_api_key` when unset
    pub gemini_paid_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub gemini_base_url: String,
    pub groq_base_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            gemini_api_key: None,
            gemini_paid_api_key: None,
            groq_api_key: None,
            gemini_base_url: gemini::DEFAULT_BASE_URL.to_string(),
            groq_base_url: groq::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Ordered list of provider tiers
#[derive(Clone, Default)]
pub struct FallbackOrchestrator {
    tiers: Vec<Arc<dyn ProviderClient>>,
}

impl std::fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("tiers", &self.tier_names())
            .finish()
    }
}

impl FallbackOrchestrator {
    /// Tiers are tried in the given order
    pub fn new(tiers: Vec<Arc<dyn ProviderClient>>) -> Self {
        FallbackOrchestrator { tiers }
    }

    /// Builds the standard cascade: Gemini Flash, Gemini Paid, Groq.
    ///
    /// All tiers share one connection pool; each request carries its own
    /// tier timeout.
    pub fn from_settings(http: Client, settings: &ProviderSettings) -> Self {
        let mut tiers: Vec<Arc<dyn ProviderClient>> = Vec::new();

        if let Some(key) = non_empty(&settings.gemini_api_key) {
            tiers.push(Arc::new(GeminiProvider::flash(
                http.clone(),
                key,
                settings.gemini_base_url.clone(),
            )));
        }

        let paid_key = non_empty(&settings.gemini_paid_api_key).or(non_empty(&settings.gemini_api_key));
        if let Some(key) = paid_key {
            tiers.push(Arc::new(GeminiProvider::paid(
                http.clone(),
                key,
                settings.gemini_base_url.clone(),
            )));
        }

        if let Some(key) = non_empty(&settings.groq_api_key) {
            tiers.push(Arc::new(GroqProvider::new(http, key, settings.groq_base_url.clone())));
        }

        let orchestrator = FallbackOrchestrator { tiers };
        info!(tiers = ?orchestrator.tier_names(), "AI provider cascade configured");
        if !orchestrator.is_configured() {
            warn!("No AI provider keys configured; every generation will report capacity");
        }
        orchestrator
    }

    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn is_configured(&self) -> bool {
        !self.tiers.is_empty()
    }

    /// Tries each tier in order and returns the first success.
    ///
    /// Never fails: exhaustion is reported as `success = false` with the
    /// capacity message.
    pub async fn call_with_fallback(&self, request: &FallbackRequest) -> FallbackOutcome {
        let generation = GenerationRequest {
            prompt: request.assembled_prompt(),
            max_tokens: request.max_tokens,
            wants_json: request.wants_json,
        };

        for tier in &self.tiers {
            let started = Instant::now();
            match tier.generate(&generation).await {
                Ok(content) => {
                    debug!(
                        tier = tier.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        bytes = content.len(),
                        "Tier answered"
                    );
                    return FallbackOutcome {
                        success: true,
                        content,
                        tier_used: tier.name().to_string(),
                    };
                }
                Err(e) => {
                    warn!(
                        tier = tier.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "Tier failed, trying next"
                    );
                }
            }
        }

        error!(tiers = self.tiers.len(), "All AI tiers failed");
        FallbackOutcome::exhausted()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
