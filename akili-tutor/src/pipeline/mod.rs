/// Generation pipelines
///
/// One pipeline per artifact kind, all with the same shape:
///
/// ```text
/// charge credits ─> create parent record ─> build prompt ─> tier cascade
///      ─> strip fences + parse ─> normalise shape ─> persist (transaction)
///
/// any failure after the charge: delete parent record, refund the charge
/// ```
///
/// | Artifact | Cost | Token budget | Parent removed on failure |
/// |---|---|---|---|
/// | Module list (course) | `course` | 1500 | course |
/// | Lesson | `lesson` (cache miss only) | 2500 | none |
/// | Quiz | free | 3000 | none |
/// | Exam | `exam` | 4000 | exam |
///
/// Every entry point returns a definite `Result`; provider failures never
/// escape as anything other than [`GenerationError::ProvidersExhausted`].

mod exam;
mod lesson;
mod modules;
mod quiz;

pub use exam::{normalize_exam_questions, ExamStart, EXAM_QUESTION_COUNT, EXAM_QUESTION_FLOOR};
pub use lesson::{LessonDelivery, LESSON_MAX_TOKENS};
pub use modules::{normalize_modules, CourseCreation, NewCourse, MODULE_COUNT, MODULE_FLOOR};
pub use quiz::{normalize_quiz_questions, QuizStart, QUIZ_QUESTION_COUNT};

use akili_shared::credits::{CreditError, CreditLedger};
use akili_shared::models::credit_transaction::TransactionKind;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::fallback::{FallbackOrchestrator, FallbackRequest};
use crate::parse::{self, ParseError};
use crate::validator::ContentValidator;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i32, available: i32 },

    /// No syllabus mapping for the requested context
    #[error("No curriculum available for {0}")]
    CurriculumMissing(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Quiz gating: the previous module has not been passed yet
    #[error("Pass module {required_position} before starting this quiz")]
    ModuleLocked { required_position: i32 },

    /// Every tier failed; carries the user-facing capacity message
    #[error("{0}")]
    ProvidersExhausted(String),

    #[error("Could not read the generated content: {0}")]
    Parse(#[from] ParseError),

    /// Parsed fine but too few usable items
    #[error("Generated {kind} had {got} usable items, need at least {min}")]
    TooFewItems { kind: &'static str, got: usize, min: usize },

    /// Validator unavailable under the fail-closed policy
    #[error("Generated content could not be reviewed")]
    ReviewUnavailable,

    #[error("Credit ledger error: {0}")]
    Credit(CreditError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CreditError> for GenerationError {
    fn from(e: CreditError) -> Self {
        match e {
            CreditError::InsufficientCredits { required, available } => {
                GenerationError::InsufficientCredits { required, available }
            }
            CreditError::Database(e) => GenerationError::Database(e),
            other => GenerationError::Credit(other),
        }
    }
}

impl GenerationError {
    /// Whether the failure came from the model output rather than from
    /// infrastructure; these are worth an immediate retry by the learner.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            GenerationError::ProvidersExhausted(_)
                | GenerationError::Parse(_)
                | GenerationError::TooFewItems { .. }
                | GenerationError::ReviewUnavailable
        )
    }
}

/// Credits charged per generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationCosts {
    pub course: i32,
    pub exam: i32,
    pub lesson: i32,
}

impl Default for GenerationCosts {
    fn default() -> Self {
        GenerationCosts {
            course: 5,
            exam: 5,
            lesson: 1,
        }
    }
}

/// Entry point for all artifact generation
#[derive(Debug, Clone)]
pub struct GenerationPipeline {
    db: PgPool,
    orchestrator: Arc<FallbackOrchestrator>,
    validator: ContentValidator,
    ledger: CreditLedger,
    costs: GenerationCosts,
}

impl GenerationPipeline {
    pub fn new(
        db: PgPool,
        orchestrator: Arc<FallbackOrchestrator>,
        validator: ContentValidator,
        ledger: CreditLedger,
        costs: GenerationCosts,
    ) -> Self {
        GenerationPipeline {
            db,
            orchestrator,
            validator,
            ledger,
            costs,
        }
    }

    pub fn costs(&self) -> GenerationCosts {
        self.costs
    }

    /// AI tiers in cascade order
    pub fn tier_names(&self) -> Vec<String> {
        self.orchestrator.tier_names()
    }

    /// Runs the cascade, returning `(content, tier_used)`
    async fn generate(&self, request: FallbackRequest) -> Result<(String, String), GenerationError> {
        let outcome = self.orchestrator.call_with_fallback(&request).await;
        if !outcome.success {
            return Err(GenerationError::ProvidersExhausted(outcome.content));
        }
        Ok((outcome.content, outcome.tier_used))
    }

    /// Runs the cascade in JSON mode and extracts the list under `key`
    async fn generate_list(
        &self,
        request: FallbackRequest,
        key: &str,
    ) -> Result<(Vec<Value>, String), GenerationError> {
        let (content, tier) = self.generate(request.json()).await?;
        match parse::extract_list(&content, key) {
            Ok(items) => Ok((items, tier)),
            Err(e) => {
                warn!(tier = %tier, key, error = %e, "Generated payload rejected");
                Err(e.into())
            }
        }
    }

    /// Returns a charge after a failed generation.
    ///
    /// A failed refund is logged rather than returned so the caller still
    /// reports the original failure.
    async fn refund(&self, user_id: Uuid, amount: i32, reason: &str) {
        if let Err(e) = self
            .ledger
            .add(user_id, amount, TransactionKind::Refund, reason)
            .await
        {
            error!(user_id = %user_id, amount, reason, error = %e, "Refund failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_error_mapping() {
        let err: GenerationError = CreditError::InsufficientCredits {
            required: 5,
            available: 2,
        }
        .into();
        assert!(matches!(
            err,
            GenerationError::InsufficientCredits {
                required: 5,
                available: 2
            }
        ));

        let err: GenerationError = CreditError::UserNotFound(Uuid::nil()).into();
        assert!(matches!(err, GenerationError::Credit(_)));
    }

    #[test]
    fn test_generation_failures_are_retryable() {
        assert!(GenerationError::ProvidersExhausted("busy".into()).is_generation_failure());
        assert!(GenerationError::Parse(ParseError::Empty).is_generation_failure());
        assert!(!GenerationError::NotFound("Module").is_generation_failure());
        assert!(!GenerationError::CurriculumMissing("Physics".into()).is_generation_failure());
    }

    #[test]
    fn test_default_costs() {
        let costs = GenerationCosts::default();
        assert_eq!((costs.course, costs.exam, costs.lesson), (5, 5, 1));
    }
}
