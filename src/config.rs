//! Client settings
//!
//! Settings come from an optional YAML file, then environment variables
//! override individual fields. Every field has a default so an empty file
//! (or no file at all) is valid.

use crate::error::{Error, Result};
use crate::http::{Credentials, HttpClientConfig, RateLimiterConfig};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tracking server used when nothing else is configured
pub const DEFAULT_TRACKING_URI: &str = "http://localhost:5000";

/// Default prompt cache capacity
pub const DEFAULT_PROMPT_CACHE_SIZE: usize = 128;

/// Default time to wait for a new model version to become READY
pub const DEFAULT_AWAIT_REGISTRATION_SECS: u64 = 300;

// ============================================================================
// Environment variables
// ============================================================================

pub const ENV_TRACKING_URI: &str = "MLFLOW_TRACKING_URI";
pub const ENV_REGISTRY_URI: &str = "MLFLOW_REGISTRY_URI";
pub const ENV_TRACKING_TOKEN: &str = "MLFLOW_TRACKING_TOKEN";
pub const ENV_TRACKING_USERNAME: &str = "MLFLOW_TRACKING_USERNAME";
pub const ENV_TRACKING_PASSWORD: &str = "MLFLOW_TRACKING_PASSWORD";
pub const ENV_PROMPT_CACHE_MAX_SIZE: &str = "MLFLOW_PROMPT_CACHE_MAX_SIZE";
pub const ENV_HTTP_REQUEST_TIMEOUT: &str = "MLFLOW_HTTP_REQUEST_TIMEOUT";
pub const ENV_HTTP_REQUEST_MAX_RETRIES: &str = "MLFLOW_HTTP_REQUEST_MAX_RETRIES";

// ============================================================================
// Settings
// ============================================================================

/// Top-level client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tracking server URI
    pub tracking_uri: Option<String>,

    /// Registry URI; falls back to the tracking URI
    pub registry_uri: Option<String>,

    /// Credentials for the tracking server
    pub auth: AuthSettings,

    /// HTTP transport settings
    pub http: HttpSettings,

    /// Capacity of the prompt lookup cache (0 disables it)
    pub prompt_cache_size: usize,

    /// Seconds `register_model` waits for a version to become READY
    pub await_registration_secs: u64,

    /// Milliseconds between readiness polls
    pub await_poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracking_uri: None,
            registry_uri: None,
            auth: AuthSettings::default(),
            http: HttpSettings::default(),
            prompt_cache_size: DEFAULT_PROMPT_CACHE_SIZE,
            await_registration_secs: DEFAULT_AWAIT_REGISTRATION_SECS,
            await_poll_interval_ms: 1000,
        }
    }
}

/// Credentials, token taking precedence over username/password
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff: BackoffType,
    pub initial_backoff_ms: u64,
    pub max_backoff_secs: u64,
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_retries: 5,
            backoff: BackoffType::Exponential,
            initial_backoff_ms: 2000,
            max_backoff_secs: 60,
            rate_limit: None,
        }
    }
}

impl Settings {
    /// Parse settings from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read settings file '{}': {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Load from an optional file, then apply the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.overlay_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Override fields from environment variables resolved by `var`
    pub fn overlay_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(uri) = var(ENV_TRACKING_URI) {
            self.tracking_uri = Some(uri);
        }
        if let Some(uri) = var(ENV_REGISTRY_URI) {
            self.registry_uri = Some(uri);
        }
        if let Some(token) = var(ENV_TRACKING_TOKEN) {
            self.auth.token = Some(token);
        }
        if let Some(username) = var(ENV_TRACKING_USERNAME) {
            self.auth.username = Some(username);
        }
        if let Some(password) = var(ENV_TRACKING_PASSWORD) {
            self.auth.password = Some(password);
        }
        if let Some(size) = var(ENV_PROMPT_CACHE_MAX_SIZE) {
            self.prompt_cache_size = parse_env(ENV_PROMPT_CACHE_MAX_SIZE, &size)?;
        }
        if let Some(timeout) = var(ENV_HTTP_REQUEST_TIMEOUT) {
            self.http.timeout_secs = parse_env(ENV_HTTP_REQUEST_TIMEOUT, &timeout)?;
        }
        if let Some(retries) = var(ENV_HTTP_REQUEST_MAX_RETRIES) {
            self.http.max_retries = parse_env(ENV_HTTP_REQUEST_MAX_RETRIES, &retries)?;
        }
        Ok(())
    }

    /// Effective tracking URI
    pub fn tracking_uri(&self) -> &str {
        self.tracking_uri.as_deref().unwrap_or(DEFAULT_TRACKING_URI)
    }

    /// Effective registry URI
    pub fn registry_uri(&self) -> &str {
        self.registry_uri
            .as_deref()
            .unwrap_or_else(|| self.tracking_uri())
    }

    /// Credentials for the HTTP client
    pub fn credentials(&self) -> Credentials {
        match (&self.auth.token, &self.auth.username, &self.auth.password) {
            (Some(token), _, _) => Credentials::Bearer {
                token: token.clone(),
            },
            (None, Some(username), Some(password)) => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Credentials::None,
        }
    }

    /// Readiness wait for new model versions
    pub fn await_registration(&self) -> Duration {
        Duration::from_secs(self.await_registration_secs)
    }

    /// Interval between readiness polls
    pub fn await_poll_interval(&self) -> Duration {
        Duration::from_millis(self.await_poll_interval_ms)
    }

    /// HTTP client configuration rooted at `base_url`
    pub fn http_client_config(&self, base_url: impl Into<String>) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.backoff,
                Duration::from_millis(self.http.initial_backoff_ms),
                Duration::from_secs(self.http.max_backoff_secs),
            )
            .credentials(self.credentials());

        builder = match &self.http.rate_limit {
            Some(limit) => builder.rate_limit(limit.clone()),
            None => builder.no_rate_limit(),
        };
        builder.build()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| Error::invalid_config(name, format!("'{value}': {e}")))
}
