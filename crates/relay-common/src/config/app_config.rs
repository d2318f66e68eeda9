//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub relay: RelaySettings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Relay tuning knobs
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Path of the WebSocket endpoint
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Directory served for every non-WebSocket request
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Largest accepted message, in bytes
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Length of generated session ids
    #[serde(default = "default_id_length")]
    pub id_length: usize,
    /// Per-session outbound queue capacity
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Upper bound on concurrently running broadcast sends (unbounded when `None`)
    #[serde(default)]
    pub max_in_flight_sends: Option<usize>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            ws_path: default_ws_path(),
            static_dir: default_static_dir(),
            max_payload_bytes: default_max_payload_bytes(),
            id_length: default_id_length(),
            outbound_buffer: default_outbound_buffer(),
            max_in_flight_sends: None,
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "relay".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9009
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_static_dir() -> String {
    "./public".to_string()
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_id_length() -> usize {
    15
}

fn default_outbound_buffer() -> usize {
    100
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be used
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Every variable is optional; unset keys fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(raw) => {
                Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?
            }
            None => Environment::default(),
        };

        let ws_path = lookup("RELAY_WS_PATH").unwrap_or_else(default_ws_path);
        if !ws_path.starts_with('/') {
            return Err(ConfigError::InvalidValue("RELAY_WS_PATH", ws_path));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            server: ServerConfig {
                host: lookup("RELAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "RELAY_PORT")?.unwrap_or_else(default_port),
            },
            relay: RelaySettings {
                ws_path,
                static_dir: lookup("RELAY_STATIC_DIR").unwrap_or_else(default_static_dir),
                max_payload_bytes: parse_positive(&lookup, "RELAY_MAX_PAYLOAD_BYTES")?
                    .unwrap_or_else(default_max_payload_bytes),
                id_length: parse_positive(&lookup, "RELAY_ID_LENGTH")?
                    .unwrap_or_else(default_id_length),
                outbound_buffer: parse_positive(&lookup, "RELAY_OUTBOUND_BUFFER")?
                    .unwrap_or_else(default_outbound_buffer),
                max_in_flight_sends: parse_positive(&lookup, "RELAY_MAX_IN_FLIGHT_SENDS")?,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<F, usize>(lookup, key)? {
        Some(0) => Err(ConfigError::InvalidValue(key, "0".to_string())),
        value => Ok(value),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
