//! Health check endpoint for container orchestration.
//!
//! A liveness probe that returns 200 OK whenever the process can answer HTTP.
//! It never touches the upstream services.

/// Health check handler.
#[tracing::instrument(name = "health::check_health")]
pub async fn check_health() -> &'static str {
    tracing::info!("Health check");
    "OK"
}
