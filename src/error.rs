use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{key} environment variable not found")]
    ConfigurationMissing { key: String },

    /// An upstream answered with a non-200 status or could not be reached.
    ///
    /// `upstream_status` is the status the upstream returned, `None` for
    /// transport failures.
    #[error("{service} service not available")]
    UpstreamUnavailable {
        service: &'static str,
        retry_after: u64,
        upstream_status: Option<StatusCode>,
    },
}

impl AppError {
    pub fn missing(key: impl Into<String>) -> Self {
        AppError::ConfigurationMissing { key: key.into() }
    }

    /// Name of the upstream service this error originated from, if any.
    pub fn service(&self) -> Option<&'static str> {
        match self {
            AppError::UpstreamUnavailable { service, .. } => Some(*service),
            _ => None,
        }
    }

    /// Status code the upstream returned before it was mapped to 503.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            AppError::UpstreamUnavailable {
                upstream_status, ..
            } => *upstream_status,
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ConfigurationMissing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::ConfigurationMissing { key } => {
                tracing::error!(key = %key, "Missing service configuration");
            }
            AppError::UpstreamUnavailable {
                service,
                upstream_status,
                ..
            } => {
                tracing::warn!(
                    service = %service,
                    upstream_status = upstream_status.map(|s| s.as_u16()),
                    "Responding with service unavailable"
                );
            }
        }

        let mut response = (status, self.to_string()).into_response();
        if let AppError::UpstreamUnavailable { retry_after, .. } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}
