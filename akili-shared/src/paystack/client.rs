/// Paystack HTTP client
///
/// Thin wrapper over the two transaction endpoints the app uses. Every
/// response comes in a `{status, message, data}` envelope; a `false` status
/// is surfaced as [`PaystackError::Rejected`] with the gateway's message.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Gateway calls are cut off after this long
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum PaystackError {
    #[error("Payment gateway is not configured")]
    NotConfigured,

    #[error("Payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Payment gateway returned status {0}")]
    Status(u16),

    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Credit(#[from] crate::credits::CreditError),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

/// Checkout session created by `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Transaction state reported by `verify`
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedTransaction {
    /// "success", "failed", "abandoned", ...
    pub status: String,
    pub reference: String,

    /// Collected amount in kobo
    pub amount: i64,
}

impl VerifiedTransaction {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl std::fmt::Debug for PaystackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PaystackClient {
    pub fn new(secret_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, PaystackError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(PaystackClient {
            http,
            secret_key: secret_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Secret used for webhook signatures as well as API calls
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Starts a checkout for `amount_kobo`
    pub async fn initialize(
        &self,
        email: &str,
        amount_kobo: i64,
        callback_url: Option<&str>,
    ) -> Result<Checkout, PaystackError> {
        let url = format!("{}/transaction/initialize", self.base_url);
        debug!(amount_kobo, "Initializing Paystack transaction");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&InitializeRequest {
                email,
                amount: amount_kobo,
                callback_url,
            })
            .send()
            .await?;

        Self::unwrap_envelope(response).await
    }

    /// Looks up a transaction by reference
    pub async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, PaystackError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);
        debug!(reference, "Verifying Paystack transaction");

        let response = self.http.get(&url).bearer_auth(&self.secret_key).send().await?;
        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaystackError> {
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Paystack returned an error status");
            return Err(PaystackError::Status(status.as_u16()));
        }

        let envelope: Envelope<T> = response.json().await?;
        match envelope {
            Envelope { status: true, data: Some(data), .. } => Ok(data),
            Envelope { message, .. } => Err(PaystackError::Rejected(message)),
        }
    }
}
