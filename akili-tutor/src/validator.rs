/// Second-pass content review
///
/// A generated lesson is sent back through the tier cascade with a review
/// prompt. A bare "OK" (any case, surrounding whitespace ignored) approves
/// it; any other answer is taken as the corrected lesson.
///
/// What happens when the review call itself cannot be made is a policy
/// decision left to the caller: [`ValidationPolicy::FailOpen`] delivers the
/// unreviewed content, [`ValidationPolicy::FailClosed`] rejects it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fallback::{FallbackOrchestrator, FallbackRequest};
use crate::prompts;

/// Output budget of a review; a correction is a full lesson
pub const REVIEW_MAX_TOKENS: u32 = 2500;

/// Behaviour when the validator is unavailable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Keep the content, tagged unvalidated
    #[default]
    FailOpen,

    /// Treat the content as rejected
    FailClosed,
}

impl ValidationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationPolicy::FailOpen => "fail_open",
            ValidationPolicy::FailClosed => "fail_closed",
        }
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(ValidationPolicy::FailOpen),
            "fail_closed" | "closed" => Ok(ValidationPolicy::FailClosed),
            other => Err(format!("unknown validator policy: {other}")),
        }
    }
}

/// Review result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,

    /// The reviewer rewrote the content
    Corrected(String),

    /// The review call failed on every tier
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct ContentValidator {
    orchestrator: Arc<FallbackOrchestrator>,
    policy: ValidationPolicy,
}

impl ContentValidator {
    pub fn new(orchestrator: Arc<FallbackOrchestrator>, policy: ValidationPolicy) -> Self {
        ContentValidator { orchestrator, policy }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Sends `content` for review
    pub async fn validate(&self, content: &str, subject_hint: Option<&str>) -> Verdict {
        let mut request = FallbackRequest::new(prompts::review(content)).max_tokens(REVIEW_MAX_TOKENS);
        if let Some(subject) = subject_hint {
            request = request.subject(subject);
        }

        let outcome = self.orchestrator.call_with_fallback(&request).await;
        if !outcome.success {
            warn!(policy = self.policy.as_str(), "Content validator unavailable");
            return Verdict::Unavailable;
        }

        let verdict = interpret(&outcome.content);
        debug!(tier = %outcome.tier_used, approved = verdict == Verdict::Approved, "Content reviewed");
        verdict
    }
}

/// Maps a reviewer answer to a verdict
pub fn interpret(answer: &str) -> Verdict {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("ok") {
        Verdict::Approved
    } else if answer.is_empty() {
        Verdict::Unavailable
    } else {
        Verdict::Corrected(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderClient, ProviderError, ScriptedProvider};

    fn validator(provider: ScriptedProvider, policy: ValidationPolicy) -> ContentValidator {
        let tier: Arc<dyn ProviderClient> = Arc::new(provider);
        ContentValidator::new(Arc::new(FallbackOrchestrator::new(vec![tier])), policy)
    }

    #[test]
    fn test_interpret() {
        assert_eq!(interpret("OK"), Verdict::Approved);
        assert_eq!(interpret("  ok \n"), Verdict::Approved);
        assert_eq!(interpret("Ok"), Verdict::Approved);
        assert_eq!(interpret("OK, but"), Verdict::Corrected("OK, but".to_string()));
        assert_eq!(interpret("   "), Verdict::Unavailable);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("fail_open".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::FailOpen);
        assert_eq!("FAIL-CLOSED".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::FailClosed);
        assert!("sometimes".parse::<ValidationPolicy>().is_err());
        assert_eq!(ValidationPolicy::default(), ValidationPolicy::FailOpen);
    }

    #[tokio::test]
    async fn test_approval() {
        let v = validator(ScriptedProvider::new("groq").respond(" OK "), ValidationPolicy::FailOpen);
        assert_eq!(v.validate("# Lesson", None).await, Verdict::Approved);
    }

    #[tokio::test]
    async fn test_correction_replaces_content() {
        let v = validator(
            ScriptedProvider::new("groq").respond("# Lesson\n\nCorrected body"),
            ValidationPolicy::FailOpen,
        );
        assert_eq!(
            v.validate("# Lesson\n\nWrong body", None).await,
            Verdict::Corrected("# Lesson\n\nCorrected body".to_string())
        );
    }

    #[tokio::test]
    async fn test_unavailable_when_cascade_fails() {
        let v = validator(
            ScriptedProvider::new("groq").fail(ProviderError::Status(503)),
            ValidationPolicy::FailClosed,
        );
        assert_eq!(v.validate("# Lesson", None).await, Verdict::Unavailable);
        assert_eq!(v.policy(), ValidationPolicy::FailClosed);
    }

    #[tokio::test]
    async fn test_review_prompt_embeds_content() {
        let provider = Arc::new(ScriptedProvider::new("groq").respond("OK"));
        let tier: Arc<dyn ProviderClient> = provider.clone();
        let v = ContentValidator::new(
            Arc::new(FallbackOrchestrator::new(vec![tier])),
            ValidationPolicy::FailOpen,
        );

        v.validate("Photosynthesis uses light.", Some("Biology")).await;

        let sent = &provider.requests()[0];
        assert!(sent.prompt.contains("Photosynthesis uses light."));
        assert!(sent.prompt.contains("ONLY 'OK'"));
        assert!(!sent.wants_json);
    }
}
