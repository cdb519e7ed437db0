//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::{ServiceSettings, UpstreamConfig};
use crate::upstream::UpstreamClient;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Settings are read once at startup and never mutated afterwards, so
/// concurrent requests share them without locking.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceSettings>,
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Creates application state, building the shared upstream client from `upstream`.
    pub fn new(upstream: &UpstreamConfig, services: ServiceSettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            services: Arc::new(services),
            upstream: UpstreamClient::new(upstream)?,
        })
    }
}
