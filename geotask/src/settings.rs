//! Task settings and behavioral tunables.
//!
//! [`ExecutionSettings`] is decoded from the flat string map the workflow
//! engine stores per task (service URL, credentials, parameter name,
//! execution mode). [`PluginConfig`] carries the numeric knobs that apply to
//! every task of this kind (timeouts, retry cap, download size cap, poll
//! budget) with the platform defaults.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::client::{Auth, ExecutionMode};
use crate::guard;

/// Settings-map key for the service URL.
pub const KEY_SERVICE_URL: &str = "serviceURL";
/// Settings-map key for the token credential.
pub const KEY_API_TOKEN: &str = "apiToken";
/// Settings-map key for the basic-auth user.
pub const KEY_USERNAME: &str = "login";
/// Settings-map key for the basic-auth password.
pub const KEY_PASSWORD: &str = "password";
/// Settings-map key for the published parameter receiving the payload.
pub const KEY_GEOJSON_PARAMETER: &str = "geoJsonParameter";
/// Settings-map key for the execution mode.
pub const KEY_EXECUTION_MODE: &str = "executionMode";

/// Default published-parameter name on the remote workspace.
pub const DEFAULT_GEOJSON_PARAMETER: &str = "GEOJSON_INPUT";

/// Problems with the per-task settings map. All are fatal before any
/// network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The settings map was absent or empty.
    #[error("no task settings provided")]
    Empty,

    /// `serviceURL` is missing or blank.
    #[error("no service URL configured")]
    MissingServiceUrl,

    /// `serviceURL` failed the outbound-URL guard.
    #[error("service URL is malformed or addresses a restricted host")]
    InvalidServiceUrl,

    /// Neither a token nor a username/password pair is configured.
    #[error("no authentication scheme configured")]
    MissingAuth,

    /// `executionMode` holds an unknown value.
    #[error("invalid execution mode: {0}")]
    InvalidMode(String),
}

impl SettingsError {
    /// Stable machine-readable code for the result record.
    pub fn code(&self) -> &'static str {
        match self {
            SettingsError::Empty => "PARAMS_NONE",
            SettingsError::MissingServiceUrl => "SERVICEURL_UNDEFINED",
            SettingsError::InvalidServiceUrl => "SERVICEURL_INVALID",
            SettingsError::MissingAuth => "AUTH_UNDEFINED",
            SettingsError::InvalidMode(_) => "EXECUTIONMODE_INVALID",
        }
    }
}

/// Validated per-task configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Submission endpoint of the geoprocessing service.
    pub service_url: String,

    /// Credentials for the service; exactly one scheme.
    pub auth: Auth,

    /// Name of the form field / published parameter carrying the payload.
    pub geojson_parameter: String,

    /// Whether the service returns the result directly or via a job id.
    pub mode: ExecutionMode,
}

impl ExecutionSettings {
    /// Decodes and validates the settings map.
    ///
    /// Values are whitespace-trimmed; blank strings count as absent. When
    /// both credential schemes are present the token wins.
    pub fn from_map(inputs: &HashMap<String, String>) -> Result<Self, SettingsError> {
        if inputs.is_empty() {
            return Err(SettingsError::Empty);
        }

        let service_url =
            trimmed(inputs, KEY_SERVICE_URL).ok_or(SettingsError::MissingServiceUrl)?;
        if !guard::is_allowed(&service_url) {
            return Err(SettingsError::InvalidServiceUrl);
        }

        let auth = match trimmed(inputs, KEY_API_TOKEN) {
            Some(token) => Auth::Token(token),
            None => {
                let username = trimmed(inputs, KEY_USERNAME);
                let password = inputs.get(KEY_PASSWORD).cloned();
                match (username, password) {
                    (Some(username), Some(password)) => Auth::Basic { username, password },
                    _ => return Err(SettingsError::MissingAuth),
                }
            }
        };

        let mode = match trimmed(inputs, KEY_EXECUTION_MODE) {
            Some(raw) => raw
                .parse::<ExecutionMode>()
                .map_err(|_| SettingsError::InvalidMode(raw))?,
            None => ExecutionMode::default(),
        };

        let geojson_parameter = trimmed(inputs, KEY_GEOJSON_PARAMETER)
            .unwrap_or_else(|| DEFAULT_GEOJSON_PARAMETER.to_string());

        Ok(Self {
            service_url,
            auth,
            geojson_parameter,
            mode,
        })
    }
}

/// Trim-to-none lookup, matching the platform's handling of blank settings.
fn trimmed(inputs: &HashMap<String, String>, key: &str) -> Option<String> {
    inputs
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Plugin-wide behavioral tunables.
///
/// Defaults mirror the platform configuration: 30 s connect / 300 s request
/// timeouts, 3 submission attempts with `2^attempt` seconds of backoff,
/// a 500 MB download cap, and a 60-poll budget at 5 s intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    /// TCP connect timeout.
    pub connect_timeout: Duration,

    /// Overall per-request timeout.
    pub request_timeout: Duration,

    /// Total submission attempts (including the first).
    pub max_retry_attempts: u32,

    /// Unit of exponential backoff; attempt `n` waits `base * 2^n`.
    pub backoff_base: Duration,

    /// Hard cap on downloaded artifact size, in bytes.
    pub max_download_size: u64,

    /// Delay between job status polls.
    pub poll_interval: Duration,

    /// Maximum number of status polls before giving up.
    pub max_polls: u32,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
            max_retry_attempts: 3,
            backoff_base: Duration::from_secs(1),
            max_download_size: 500 * 1024 * 1024,
            poll_interval: Duration::from_secs(5),
            max_polls: 60,
        }
    }
}
