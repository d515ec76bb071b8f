/// Scripted provider for tests and local runs
///
/// Replays a fixed sequence of outcomes, one per call, without touching the
/// network. Once the script runs out every further call fails with a
/// transport error, which is how an unplugged tier behaves.
///
/// # Example
///
/// ```
/// use akili_tutor::providers::{GenerationRequest, ProviderClient, ProviderError, ScriptedProvider};
///
/// # async fn example() {
/// let provider = ScriptedProvider::new("gemini_flash")
///     .fail(ProviderError::Status(503))
///     .respond("{\"modules\": []}");
///
/// assert!(provider.generate(&GenerationRequest::text("a")).await.is_err());
/// assert!(provider.generate(&GenerationRequest::text("b")).await.is_ok());
/// assert_eq!(provider.calls(), 2);
/// # }
/// ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::provider_trait::{GenerationRequest, ProviderClient, ProviderError, ProviderResult};
use crate::limits::{TierLimits, GROQ};

pub struct ScriptedProvider {
    name: String,
    limits: TierLimits,
    delay: Option<Duration>,
    script: Mutex<VecDeque<ProviderResult<String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        ScriptedProvider {
            name: name.into(),
            limits: GROQ,
            delay: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful response
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    /// Queues a failure
    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    /// Sleeps before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_limits(mut self, limits: TierLimits) -> Self {
        self.limits = limits;
        self
    }

    fn push(self, outcome: ProviderResult<String>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn limits(&self) -> TierLimits {
        self.limits
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".to_string())))
    }
}
