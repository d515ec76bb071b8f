//! # Akili Tutor Library
//!
//! AI generation for the Akili tutoring platform: provider tiers, the tier
//! cascade, content review, and the pipelines that turn model output into
//! course modules, lessons, quizzes and exams.
//!
//! ## Modules
//!
//! - `providers`: one client per AI tier (Gemini Flash, Gemini Paid, Groq)
//! - `limits`: per-tier token ceilings and timeouts
//! - `fallback`: the ordered tier cascade
//! - `validator`: second-pass review of generated lessons
//! - `prompts`: prompt builders and shared prompt instructions
//! - `parse`: fence stripping, JSON parsing, list extraction
//! - `render`: sanitized Markdown rendering
//! - `pipeline`: credit-metered generation for every artifact kind
//!
//! ## Example
//!
//! ```no_run
//! use akili_tutor::fallback::{FallbackOrchestrator, FallbackRequest, ProviderSettings};
//!
//! # async fn example() {
//! let settings = ProviderSettings {
//!     groq_api_key: Some("gsk_...".to_string()),
//!     ..Default::default()
//! };
//! let orchestrator = FallbackOrchestrator::from_settings(reqwest::Client::new(), &settings);
//!
//! let outcome = orchestrator
//!     .call_with_fallback(&FallbackRequest::new("Explain osmosis").subject("Biology"))
//!     .await;
//! println!("{} via {}", outcome.content, outcome.tier_used);
//! # }
//! ```

pub mod fallback;
pub mod limits;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod render;
pub mod validator;
