//! Upstream endpoint resolution.
//!
//! An `EndpointSpec` is built from the host, port, and path configured for a
//! service, plus a scheme taken from the inbound request unless the service
//! has an override. Resolution fails before any network traffic if a
//! required key is missing.

use std::fmt;

use rand::Rng;

use crate::config::{
    ServiceLocation, ServiceSettings, NAME_ID_MAX, SERVICE_HOST_SUFFIX, SERVICE_PATH_SUFFIX,
    SERVICE_PORT_SUFFIX,
};
use crate::error::AppError;

/// Display name used for the tracking call in logs and errors
pub const TRACKING_SERVICE: &str = "Tracking";

/// Upstream services addressed by host/port/path configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Greeting,
    Name,
}

impl ServiceKind {
    /// Environment key prefix, e.g. `GREETING` for `GREETING_SERVICE_HOST`.
    pub fn env_prefix(self) -> &'static str {
        match self {
            ServiceKind::Greeting => "GREETING",
            ServiceKind::Name => "NAME",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ServiceKind::Greeting => "Greeting",
            ServiceKind::Name => "Name",
        }
    }

    fn location(self, settings: &ServiceSettings) -> &ServiceLocation {
        match self {
            ServiceKind::Greeting => &settings.greeting,
            ServiceKind::Name => &settings.name,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub scheme: String,
    pub host: String,
    pub port: String,
    pub path: String,
}

impl EndpointSpec {
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

/// Resolve the endpoint for `kind`, appending `sub_path` to the configured path.
pub fn resolve(
    kind: ServiceKind,
    settings: &ServiceSettings,
    request_scheme: &str,
    sub_path: Option<&str>,
) -> Result<EndpointSpec, AppError> {
    let location = kind.location(settings);
    let prefix = kind.env_prefix();
    let required = |value: &Option<String>, suffix: &str| {
        value
            .clone()
            .ok_or_else(|| AppError::missing(format!("{}{}", prefix, suffix)))
    };

    let host = required(&location.host, SERVICE_HOST_SUFFIX)?;
    let port = required(&location.port, SERVICE_PORT_SUFFIX)?;
    let mut path = required(&location.path, SERVICE_PATH_SUFFIX)?;
    if let Some(sub_path) = sub_path {
        path.push_str(sub_path);
    }

    let scheme = match &location.scheme {
        Some(scheme_override) => scheme_override.clone(),
        None => request_scheme.to_string(),
    };
    tracing::debug!(
        service = %kind,
        scheme_override = ?location.scheme,
        path = %path,
        "Resolved endpoint"
    );

    Ok(EndpointSpec {
        scheme,
        host,
        port,
        path,
    })
}

/// Pick the name ID for this request, uniform over 1..=NAME_ID_MAX.
pub fn random_name_id() -> u8 {
    rand::thread_rng().gen_range(1..=NAME_ID_MAX)
}

pub fn name_sub_path(id: u8) -> String {
    format!("/{}", id)
}
