use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, CoreError};

pub const DEFAULT_YOUTUBE_ENDPOINT: &str = "www.googleapis.com/youtube/v3";
pub const DEFAULT_SESSION_FILE: &str = "session.txt";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the path of an optional TOML config file.
pub const CONFIG_FILE_VAR: &str = "EMBEDSYNC_CONFIG";

/// What to do with a post whose liveness probe could not complete at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeFailurePolicy {
    #[default]
    Drop,
    Keep,
}

impl FromStr for ProbeFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(ProbeFailurePolicy::Drop),
            "keep" => Ok(ProbeFailurePolicy::Keep),
            other => Err(ConfigError::InvalidValue {
                field: "probe_failure_policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub patreon_endpoint: String,
    pub patreon_email: String,
    pub patreon_password: String,
    pub youtube_endpoint: String,
    pub youtube_api_key: String,
    pub database_url: String,
    pub session_file: PathBuf,
    pub request_timeout_secs: u64,
    pub max_concurrent_probes: Option<usize>,
    pub probe_failure_policy: ProbeFailurePolicy,
    pub user_agent: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("patreon_endpoint", &self.patreon_endpoint)
            .field("patreon_email", &self.patreon_email)
            .field("patreon_password", &"<redacted>")
            .field("youtube_endpoint", &self.youtube_endpoint)
            .field("youtube_api_key", &"<redacted>")
            .field("database_url", &"<redacted>")
            .field("session_file", &self.session_file)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrent_probes", &self.max_concurrent_probes)
            .field("probe_failure_policy", &self.probe_failure_policy)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Values accepted from the optional TOML file. Every field may be omitted;
/// environment variables fill or override them.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    patreon_endpoint: Option<String>,
    patreon_email: Option<String>,
    patreon_password: Option<String>,
    youtube_endpoint: Option<String>,
    youtube_api_key: Option<String>,
    database_url: Option<String>,
    session_file: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    max_concurrent_probes: Option<usize>,
    probe_failure_policy: Option<ProbeFailurePolicy>,
    user_agent: Option<String>,
}

impl AppConfig {
    /// Reads the optional TOML file named by `EMBEDSYNC_CONFIG`, then applies
    /// the process environment on top.
    pub fn load() -> Result<Self, CoreError> {
        let file = match std::env::var(CONFIG_FILE_VAR) {
            Ok(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(&path))?),
            _ => None,
        };
        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Builds a config from TOML text (if any) and an environment lookup.
    pub fn from_sources<F>(toml_text: Option<&str>, env: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = match toml_text {
            Some(text) => toml::from_str(text).map_err(ConfigError::from)?,
            None => ConfigFile::default(),
        };
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let required = |var: &str, from_file: Option<String>| -> Result<String, ConfigError> {
            lookup(var)
                .or(from_file)
                .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                    var_name: var.to_string(),
                })
        };

        let request_timeout_secs = match lookup("EMBEDSYNC_REQUEST_TIMEOUT_SECS") {
            Some(value) => parse_number("request_timeout_secs", &value)?,
            None => file
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let max_concurrent_probes = match lookup("EMBEDSYNC_MAX_CONCURRENT_PROBES") {
            Some(value) => Some(parse_number("max_concurrent_probes", &value)?),
            None => file.max_concurrent_probes,
        };

        let probe_failure_policy = match lookup("EMBEDSYNC_PROBE_FAILURE_POLICY") {
            Some(value) => value.parse()?,
            None => file.probe_failure_policy.unwrap_or_default(),
        };

        let config = Self {
            patreon_endpoint: required("PATREON_API_ENDPOINT", file.patreon_endpoint)?,
            patreon_email: required("PATREON_EMAIL", file.patreon_email)?,
            patreon_password: required("PATREON_PASSWORD", file.patreon_password)?,
            youtube_endpoint: lookup("YOUTUBE_API_ENDPOINT")
                .or(file.youtube_endpoint)
                .unwrap_or_else(|| DEFAULT_YOUTUBE_ENDPOINT.to_string()),
            youtube_api_key: required("YOUTUBE_API_KEY", file.youtube_api_key)?,
            database_url: required("DATABASE_URL", file.database_url)?,
            session_file: lookup("EMBEDSYNC_SESSION_FILE")
                .map(PathBuf::from)
                .or(file.session_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
            request_timeout_secs,
            max_concurrent_probes,
            probe_failure_policy,
            user_agent: lookup("EMBEDSYNC_USER_AGENT")
                .or(file.user_agent)
                .unwrap_or_else(|| format!("embedsync/{}", env!("CARGO_PKG_VERSION"))),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("patreon_endpoint", &self.patreon_endpoint),
            ("patreon_email", &self.patreon_email),
            ("patreon_password", &self.patreon_password),
            ("youtube_endpoint", &self.youtube_endpoint),
            ("youtube_api_key", &self.youtube_api_key),
            ("database_url", &self.database_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "request_timeout_secs must be greater than zero".to_string(),
            });
        }

        if self.max_concurrent_probes == Some(0) {
            return Err(ConfigError::ValidationFailed {
                reason: "max_concurrent_probes must be greater than zero when set".to_string(),
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Prefixes `https://` to endpoints configured as bare `host/path`.
pub fn endpoint_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.display().to_string(),
    })
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}
