//! Configuration loading and constants.
//!
//! Server settings (listen address, upstream timeouts, log format) come from an
//! optional TOML file. Upstream service locations come from the process
//! environment, read once at startup into `ServiceSettings`.

use serde::Deserialize;
use std::path::Path;

// =============================================================================
// Upstream Call Constants
// =============================================================================

/// Connect and total timeout for each upstream call, in seconds
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 6;

/// Retry-After hint returned to callers when an upstream is unavailable
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Name IDs are picked uniformly from 1..=NAME_ID_MAX
pub const NAME_ID_MAX: u8 = 8;

// =============================================================================
// Environment Keys
// =============================================================================

/// Full URL of the tracking endpoint
pub const TRACKER_URL_KEY: &str = "LAMBDA_TRACKER";

/// Env var suffixes appended to a service prefix (e.g. `GREETING_SERVICE_HOST`)
pub const SERVICE_HOST_SUFFIX: &str = "_SERVICE_HOST";
pub const SERVICE_PORT_SUFFIX: &str = "_SERVICE_PORT";
pub const SERVICE_PATH_SUFFIX: &str = "_SERVICE_PATH";
pub const SERVICE_SCHEME_SUFFIX: &str = "_SERVICE_SCHEME";

// =============================================================================
// Defaults
// =============================================================================

/// Default listen host
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "greeter_webapp=debug,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Scheme used when neither the request nor an override provides one
pub const DEFAULT_REQUEST_SCHEME: &str = "http";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Timeouts and hints for upstream calls
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Applied as both connect timeout and total request timeout
    #[serde(default = "UpstreamConfig::default_timeout")]
    pub timeout_seconds: u64,
    /// Seconds advertised in the Retry-After header on 503 responses
    #[serde(default = "UpstreamConfig::default_retry_after")]
    pub retry_after_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: Self::default_timeout(),
            retry_after_seconds: Self::default_retry_after(),
        }
    }
}

impl UpstreamConfig {
    fn default_timeout() -> u64 {
        DEFAULT_UPSTREAM_TIMEOUT_SECS
    }

    fn default_retry_after() -> u64 {
        DEFAULT_RETRY_AFTER_SECS
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "upstream.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        match self.logging.format.to_ascii_lowercase().as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "logging.format must be \"text\" or \"json\", got \"{}\"",
                other
            ))),
        }
    }
}

/// Location of one upstream service as found in the environment.
///
/// Fields stay optional: a missing key is reported when a request needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceLocation {
    pub host: Option<String>,
    pub port: Option<String>,
    pub path: Option<String>,
    pub scheme: Option<String>,
}

impl ServiceLocation {
    fn from_lookup<F>(prefix: &str, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| lookup(&format!("{}{}", prefix, suffix));
        Self {
            host: get(SERVICE_HOST_SUFFIX),
            port: get(SERVICE_PORT_SUFFIX),
            path: get(SERVICE_PATH_SUFFIX),
            scheme: get(SERVICE_SCHEME_SUFFIX),
        }
    }
}

/// Upstream endpoints consumed by the aggregation handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSettings {
    pub greeting: ServiceLocation,
    pub name: ServiceLocation,
    pub tracker_url: Option<String>,
}

impl ServiceSettings {
    /// Snapshot the service variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            greeting: ServiceLocation::from_lookup("GREETING", &lookup),
            name: ServiceLocation::from_lookup("NAME", &lookup),
            tracker_url: lookup(TRACKER_URL_KEY),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
