/// AI provider tiers
///
/// Each tier implements [`ProviderClient`]. Real tiers talk HTTP
/// (Gemini Flash, Gemini Paid, Groq); [`ScriptedProvider`] replays canned
/// outcomes for tests.

pub mod gemini;
pub mod groq;
mod http;
pub mod provider_trait;
pub mod scripted;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use provider_trait::{GenerationRequest, ProviderClient, ProviderError, ProviderResult};
pub use scripted::ScriptedProvider;
