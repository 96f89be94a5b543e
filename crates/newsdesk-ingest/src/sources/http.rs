//! Shared outbound HTTP plumbing for the network adapters.

use std::time::Duration;

use newsdesk_core::AppConfig;
use reqwest::{Client, RequestBuilder, Response};

use super::retry::RetryPolicy;
use crate::error::SourceError;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            user_agent: config.user_agent.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base_ms: config.retry_backoff_base_ms,
            },
        }
    }

    /// Timeout of a single attempt. The fetch timeout is shared by the first
    /// attempt and every retry, so a slow first response still leaves room
    /// for another try.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.timeout / self.retry.max_retries.saturating_add(1)
    }
}

/// Builds a `reqwest` client with the per-attempt timeout and `User-Agent`.
///
/// # Errors
///
/// Returns [`reqwest::Error`] if the client cannot be constructed.
pub fn build_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    let attempt = settings.attempt_timeout();
    Client::builder()
        .timeout(attempt)
        .connect_timeout(attempt.min(Duration::from_secs(5)))
        .user_agent(&settings.user_agent)
        .build()
}

/// Sends the request and turns any non-2xx status into
/// [`SourceError::UnexpectedStatus`].
pub(crate) async fn send_checked(request: RequestBuilder) -> Result<Response, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::UnexpectedStatus {
            status: status.as_u16(),
            url: redact_query(response.url()),
        });
    }
    Ok(response)
}

/// Drops the query string so credentials passed as parameters never reach logs.
fn redact_query(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
