//! # Client configuration — `circles.toml`
//!
//! Settings are layered the usual way: built-in defaults, then an optional
//! `circles.toml` next to the binary, then `CIRCLES_*` environment variables
//! (sections separated by `__`, e.g. `CIRCLES_REALTIME__MAX_RECONNECT_ATTEMPTS=3`).
//! In the browser neither the file nor the environment exist, so the defaults
//! apply unless the web binary passes its own TOML through [`ClientConfig::from_toml`].
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:5000/api"
//!
//! [realtime]
//! url = ""                      # empty = derived from api.base_url
//! max_reconnect_attempts = 5
//! reconnect_delay_ms = 1000
//! auth_timeout_ms = 5000
//!
//! [call]
//! ring_timeout_secs = 30
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ApiError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSettings {
    /// WebSocket endpoint. Empty means "derive from the API base URL".
    #[serde(default)]
    pub url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub auth_timeout_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallSettings {
    pub ring_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiSettings,
    pub realtime: RealtimeSettings,
    pub call: CallSettings,
}

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings {
                base_url: DEFAULT_API_BASE_URL.to_string(),
            },
            realtime: RealtimeSettings {
                url: String::new(),
                max_reconnect_attempts: 5,
                reconnect_delay_ms: 1000,
                auth_timeout_ms: 5000,
            },
            call: CallSettings {
                ring_timeout_secs: 30,
            },
        }
    }
}

impl ClientConfig {
    /// Load defaults, `circles.toml` (optional) and `CIRCLES_*` variables.
    pub fn load() -> Result<Self, ApiError> {
        let builder = Self::defaults()?
            .add_source(
                File::with_name("circles")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Self::environment());
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Parse a TOML document on top of the defaults.
    pub fn from_toml(s: &str) -> Result<Self, ApiError> {
        let builder = Self::defaults()?.add_source(File::from_str(s, FileFormat::Toml));
        Ok(builder.build()?.try_deserialize()?)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = ClientConfig::default();
        Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("realtime.url", defaults.realtime.url)?
            .set_default(
                "realtime.max_reconnect_attempts",
                defaults.realtime.max_reconnect_attempts as i64,
            )?
            .set_default(
                "realtime.reconnect_delay_ms",
                defaults.realtime.reconnect_delay_ms as i64,
            )?
            .set_default(
                "realtime.auth_timeout_ms",
                defaults.realtime.auth_timeout_ms as i64,
            )?
            .set_default(
                "call.ring_timeout_secs",
                defaults.call.ring_timeout_secs as i64,
            )
    }

    fn environment() -> Environment {
        Environment::with_prefix("CIRCLES")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// The WebSocket endpoint, derived from the API base URL when not set.
    ///
    /// `http://host:5000/api` becomes `ws://host:5000/ws`.
    pub fn websocket_url(&self) -> Result<String, ApiError> {
        if !self.realtime.url.trim().is_empty() {
            return Ok(self.realtime.url.trim().to_string());
        }
        let mut url = Url::parse(&self.api.base_url)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| ApiError::validation("cannot derive websocket scheme"))?;
        url.set_path("/ws");
        url.set_query(None);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_builder() {
        let built: ClientConfig = ClientConfig::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(built, ClientConfig::default());
    }

    #[test]
    fn test_toml_overrides_partial_section() {
        let config = ClientConfig::from_toml(
            r#"
            [api]
            base_url = "https://circles.example.com/api"

            [realtime]
            max_reconnect_attempts = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://circles.example.com/api");
        assert_eq!(config.realtime.max_reconnect_attempts, 2);
        assert_eq!(config.realtime.reconnect_delay_ms, 1000);
        assert_eq!(config.call.ring_timeout_secs, 30);
    }

    #[test]
    fn test_environment_overrides() {
        let mut vars = config::Map::new();
        vars.insert(
            "CIRCLES_REALTIME__AUTH_TIMEOUT_MS".to_string(),
            "250".to_string(),
        );
        vars.insert(
            "CIRCLES_API__BASE_URL".to_string(),
            "http://10.0.0.2:8080/api".to_string(),
        );
        let config: ClientConfig = ClientConfig::defaults()
            .unwrap()
            .add_source(ClientConfig::environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.realtime.auth_timeout_ms, 250);
        assert_eq!(config.api.base_url, "http://10.0.0.2:8080/api");
    }

    #[test]
    fn test_websocket_url_derivation() {
        let mut config = ClientConfig::default();
        assert_eq!(config.websocket_url().unwrap(), "ws://localhost:5000/ws");

        config.api.base_url = "https://circles.example.com/api?v=2".to_string();
        assert_eq!(
            config.websocket_url().unwrap(),
            "wss://circles.example.com/ws"
        );

        config.realtime.url = "wss://rt.example.com/socket".to_string();
        assert_eq!(
            config.websocket_url().unwrap(),
            "wss://rt.example.com/socket"
        );
    }
}
