/// Shared HTTP plumbing for providers
///
/// Every tier reads its body through [`read_body`] so the size bound is
/// enforced the same way everywhere. API keys can sit in request URLs, so
/// URLs are stripped from transport errors before they reach a log line.

use reqwest::Response;
use std::time::Duration;

use super::provider_trait::{ProviderError, ProviderResult};

/// Converts a reqwest failure, keeping timeouts distinct
pub(crate) fn map_send_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Transport(error.without_url().to_string())
    }
}

/// Reads a 200 body, giving up as soon as it grows past `limit` bytes.
pub(crate) async fn read_body(
    mut response: Response,
    limit: usize,
    timeout: Duration,
) -> ProviderResult<Vec<u8>> {
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(ProviderError::Status(status.as_u16()));
    }

    if response.content_length().is_some_and(|len| len as usize > limit) {
        return Err(ProviderError::ResponseTooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| map_send_error(e, timeout))?
    {
        if body.len() + chunk.len() > limit {
            return Err(ProviderError::ResponseTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
