//! HTTP client for the greeting, name, and tracking services.
//!
//! One `reqwest::Client` is built at startup with the upstream timeout policy
//! and shared by all requests. Every call is a plain-text GET; status
//! handling differs between the required services and the tracking call.

use std::time::Duration;

use http::{header::ACCEPT, StatusCode};

use crate::config::UpstreamConfig;
use crate::endpoint::TRACKING_SERVICE;
use crate::error::AppError;

const TEXT_PLAIN: &str = "text/plain";

/// Outcome of one upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResult {
    pub status: StatusCode,
    pub body: String,
}

/// Why an upstream call produced no usable body.
#[derive(Debug)]
enum CallFailure {
    /// No response at all: refused, timed out, DNS, invalid URL
    Transport(reqwest::Error),
    /// The status line arrived but the body could not be read
    Body(StatusCode, reqwest::Error),
}

impl CallFailure {
    /// Upstream status worth reporting. A 200 whose body broke off counts as
    /// a transport failure.
    fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            CallFailure::Body(status, _) if *status != StatusCode::OK => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallFailure::Transport(e) => write!(f, "{}", e),
            CallFailure::Body(status, e) => {
                write!(f, "failed reading body of {} response: {}", status.as_u16(), e)
            }
        }
    }
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    retry_after: u64,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            retry_after: config.retry_after_seconds,
        })
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<UpstreamResult, CallFailure> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, TEXT_PLAIN)
            .query(query)
            .send()
            .await
            .map_err(CallFailure::Transport)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallFailure::Body(status, e))?;
        Ok(UpstreamResult { status, body })
    }

    fn unavailable(&self, service: &'static str, upstream_status: Option<StatusCode>) -> AppError {
        AppError::UpstreamUnavailable {
            service,
            retry_after: self.retry_after,
            upstream_status,
        }
    }

    /// Fetch the text body of a required upstream.
    ///
    /// Anything but 200 is reported as `UpstreamUnavailable` for `service`.
    pub async fn fetch_text(&self, service: &'static str, url: &str) -> Result<String, AppError> {
        match self.get_text(url, &[]).await {
            Ok(result) if result.status == StatusCode::OK => {
                tracing::info!(service, body = %result.body, "Upstream responded");
                Ok(result.body)
            }
            Ok(result) => {
                tracing::error!(
                    service,
                    url,
                    status = result.status.as_u16(),
                    body = %result.body,
                    "Upstream returned error status"
                );
                Err(self.unavailable(service, Some(result.status)))
            }
            Err(e) => {
                tracing::error!(service, url, error = %e, "Failed connecting to upstream");
                Err(self.unavailable(service, e.upstream_status()))
            }
        }
    }

    /// Report a greeting to the tracking endpoint.
    ///
    /// A non-200 answer is logged and ignored. Only a transport failure
    /// fails the call.
    pub async fn track(&self, url: &str, username: &str, message: &str) -> Result<(), AppError> {
        let query = [("username", username), ("message", message)];
        match self.get_text(url, &query).await {
            Ok(result) => {
                if result.status == StatusCode::OK {
                    tracing::info!(body = %result.body, "Tracking call accepted");
                } else {
                    tracing::info!(
                        status = result.status.as_u16(),
                        reason = result.status.canonical_reason().unwrap_or(""),
                        "Tracking endpoint returned error status, ignoring"
                    );
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(url, error = %e, "Failed connecting to tracking endpoint");
                Err(self.unavailable(TRACKING_SERVICE, None))
            }
        }
    }
}
