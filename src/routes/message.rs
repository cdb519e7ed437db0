//! Greeting message handler.

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
};

use crate::aggregate::aggregate;
use crate::config::DEFAULT_REQUEST_SCHEME;
use crate::error::AppError;
use crate::state::AppState;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Serves `"<greeting> <name>"` as plain text.
#[tracing::instrument(name = "message::message", skip(state, headers))]
pub async fn message(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<String, AppError> {
    let scheme = request_scheme(&headers, &uri);
    aggregate(&state.services, &state.upstream, &scheme).await
}

/// Scheme the caller used to reach us.
///
/// Behind a load balancer the original scheme is only visible in
/// `X-Forwarded-Proto`; origin-form request URIs carry no scheme at all.
pub fn request_scheme(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .or_else(|| uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_REQUEST_SCHEME.to_string())
}
