//! Webhook client
//!
//! Posts a [`SubmissionRequest`] as JSON and returns the trimmed response
//! body.

use log::debug;
use std::time::Duration;
use thiserror::Error;

use crate::webhook::request::SubmissionRequest;

/// Client-side timeout for a single request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur while contacting the webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("No webhook URL configured")]
    NotConfigured,

    #[error("Request failed: {status} {reason}")]
    Http { status: u16, reason: String },

    #[error("Network error or timeout when contacting the webhook: {0}")]
    Network(String),

    #[error("Timed out waiting for webhook response ({0:?})")]
    TimedOut(Duration),

    #[error("Webhook returned an empty response")]
    EmptyResponse,

    #[error("Webhook worker stopped without a response")]
    WorkerLost,
}

/// Anything that can deliver a submission and hand back the response text
pub trait WebhookTransport: Send + Sync + 'static {
    fn send(&self, request: &SubmissionRequest) -> Result<String, WebhookError>;
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct WebhookClient {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self, WebhookError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(WebhookError::NotConfigured);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WebhookError::Network(e.to_string()))?;

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl WebhookTransport for WebhookClient {
    fn send(&self, request: &SubmissionRequest) -> Result<String, WebhookError> {
        debug!("POST {} ({})", self.url, request.kind.code());

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .map_err(|e| WebhookError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response
            .text()
            .map_err(|e| WebhookError::Network(e.to_string()))?;

        Ok(body.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_url_is_not_configured() {
        assert!(matches!(
            WebhookClient::new("  "),
            Err(WebhookError::NotConfigured)
        ));
    }

    #[test]
    fn test_client_keeps_url() {
        let client = WebhookClient::new("http://localhost:5678/webhook/tc").unwrap();
        assert_eq!(client.url(), "http://localhost:5678/webhook/tc");
    }

    #[test]
    fn test_error_messages() {
        let err = WebhookError::Http {
            status: 502,
            reason: "Bad Gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed: 502 Bad Gateway");
        assert_eq!(
            WebhookError::TimedOut(Duration::from_secs(60)).to_string(),
            "Timed out waiting for webhook response (60s)"
        );
        assert_eq!(
            WebhookError::TimedOut(Duration::from_millis(150)).to_string(),
            "Timed out waiting for webhook response (150ms)"
        );
    }
}
