//! Configuration management for Dialwave
//!
//! Everything is environment-derived. A missing voice platform key is not
//! fatal: the HTTP surface degrades to a fixed "not configured" response.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::phone::DEFAULT_COUNTRY_CODE;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3001;

/// Default voice platform API base URL
pub const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";

/// How long an ended session stays visible before reverting to idle
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(3);

/// Deployment mode, taken from `DIALWAVE_ENV` or `NODE_ENV`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    /// Any other label, reported verbatim by the health endpoint
    Other(String),
}

impl Environment {
    /// Parse an environment label
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "" | "development" => Self::Development,
            "production" => Self::Production,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether internal error messages may be shown to clients
    #[must_use]
    pub const fn exposes_errors(&self) -> bool {
        matches!(self, Self::Development)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dialwave configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment mode
    pub environment: Environment,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Voice platform configuration
    pub vapi: VapiConfig,

    /// Phone number normalization settings
    pub phone: PhoneConfig,

    /// Live session settings
    pub session: SessionConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Global request budget per minute (from `DIALWAVE_RATE_LIMIT_RPM`)
    pub rate_limit_rpm: Option<u32>,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

/// Voice platform configuration
#[derive(Debug, Clone)]
pub struct VapiConfig {
    /// Private API key used for call and campaign creation
    pub api_key: Option<SecretString>,

    /// API base URL
    pub base_url: String,

    /// Public key used by browser-side sessions
    pub public_key: Option<SecretString>,

    /// Default assistant for live sessions
    pub assistant_id: Option<String>,
}

/// Phone number normalization settings
#[derive(Debug, Clone)]
pub struct PhoneConfig {
    /// Country code prepended to bare ten digit numbers
    pub default_country_code: String,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }
}

/// Live session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay before an ended session reverts to idle
    pub reset_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("DIALWAVE_ENV")
            .or_else(|| get("NODE_ENV"))
            .map(|v| Environment::parse(&v))
            .unwrap_or_default();

        let api_server = ApiServerConfig {
            port: get("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            rate_limit_rpm: get("DIALWAVE_RATE_LIMIT_RPM").and_then(|s| s.parse().ok()),
            static_dir: get("DIALWAVE_STATIC_DIR").map(PathBuf::from),
        };

        let vapi = VapiConfig {
            api_key: get("VAPI_API_KEY").map(SecretString::from),
            base_url: get("VAPI_BASE_URL").map_or_else(
                || DEFAULT_VAPI_BASE_URL.to_string(),
                |url| url.trim_end_matches('/').to_string(),
            ),
            public_key: get("VAPI_PUBLIC_KEY").map(SecretString::from),
            assistant_id: get("VAPI_ASSISTANT_ID"),
        };

        let phone = PhoneConfig {
            default_country_code: get("DIALWAVE_DEFAULT_COUNTRY_CODE")
                .map(|cc| cc.trim().trim_start_matches('+').to_string())
                .filter(|cc| !cc.is_empty() && cc.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
        };

        let session = SessionConfig {
            reset_delay: get("DIALWAVE_RESET_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .map_or(DEFAULT_RESET_DELAY, Duration::from_millis),
        };

        if vapi.api_key.is_none() {
            tracing::warn!("VAPI_API_KEY is not set, outbound call endpoints will be unavailable");
        }

        Self {
            environment,
            api_server,
            vapi,
            phone,
            session,
        }
    }
}
