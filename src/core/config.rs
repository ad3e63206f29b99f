use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Default v1.1 REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://bittrex.com/api/v1.1";
/// Default v2.0 REST base URL (candles live here).
pub const DEFAULT_BASE_URL_V2: &str = "https://bittrex.com/Api/v2.0";
/// Root page fetched during the anti-bot bootstrap.
pub const DEFAULT_ROOT_URL: &str = "https://bittrex.com/";
/// Default SignalR endpoint.
pub const DEFAULT_WS_URL: &str = "wss://socket.bittrex.com/signalr";
/// Default hub list; the first entry receives subscribe invocations.
pub const DEFAULT_WS_HUBS: &[&str] = &["CoreHub"];

/// Immutable configuration snapshot.
///
/// Constructed once and handed to each component at build time. There is no
/// shared mutable options object: [`BittrexConfig::patch`] merges a partial
/// update and returns a new snapshot.
#[derive(Debug, Clone)]
pub struct BittrexConfig {
    pub api_key: Secret<String>,
    pub api_secret: Secret<String>,
    pub base_url: String,
    pub base_url_v2: String,
    pub root_url: String,
    pub ws_url: String,
    pub ws_hubs: Vec<String>,
    pub verbose: bool,
}

impl Default for BittrexConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            api_secret: Secret::new(String::new()),
            base_url: DEFAULT_BASE_URL.to_string(),
            base_url_v2: DEFAULT_BASE_URL_V2.to_string(),
            root_url: DEFAULT_ROOT_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            ws_hubs: DEFAULT_WS_HUBS.iter().map(|s| (*s).to_string()).collect(),
            verbose: false,
        }
    }
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for BittrexConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("BittrexConfig", 8)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("api_secret", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("base_url_v2", &self.base_url_v2)?;
        state.serialize_field("root_url", &self.root_url)?;
        state.serialize_field("ws_url", &self.ws_url)?;
        state.serialize_field("ws_hubs", &self.ws_hubs)?;
        state.serialize_field("verbose", &self.verbose)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for BittrexConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let patch = BittrexConfigPatch::deserialize(deserializer)?;
        Ok(Self::default().patch(patch))
    }
}

impl BittrexConfig {
    /// Create a configuration with API credentials and default endpoints.
    #[must_use]
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            api_secret: Secret::new(api_secret),
            ..Self::default()
        }
    }

    /// Create a credential-less configuration for public endpoints only.
    #[must_use]
    pub fn read_only() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables.
    ///
    /// Expected environment variables:
    /// - `BITTREX_API_KEY`
    /// - `BITTREX_API_SECRET`
    /// - `BITTREX_BASE_URL` (optional)
    /// - `BITTREX_WS_URL` (optional)
    /// - `BITTREX_VERBOSE` (optional, defaults to false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("BITTREX_API_KEY")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("BITTREX_API_KEY".to_string()))?;
        let api_secret = env::var("BITTREX_API_SECRET").map_err(|_| {
            ConfigError::MissingEnvironmentVariable("BITTREX_API_SECRET".to_string())
        })?;

        let mut config = Self::new(api_key, api_secret);
        if let Ok(base_url) = env::var("BITTREX_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(ws_url) = env::var("BITTREX_WS_URL") {
            config.ws_url = ws_url;
        }
        config.verbose = env::var("BITTREX_VERBOSE")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        Ok(config)
    }

    /// Create configuration from a .env file and environment variables.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // Missing file is fine, fall through to system env vars.
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }
        Self::from_env()
    }

    /// Merge a partial update into this snapshot, producing a new snapshot.
    /// Unspecified fields keep their current values.
    #[must_use]
    pub fn patch(&self, patch: BittrexConfigPatch) -> Self {
        Self {
            api_key: patch
                .api_key
                .map_or_else(|| self.api_key.clone(), Secret::new),
            api_secret: patch
                .api_secret
                .map_or_else(|| self.api_secret.clone(), Secret::new),
            base_url: patch.base_url.unwrap_or_else(|| self.base_url.clone()),
            base_url_v2: patch
                .base_url_v2
                .unwrap_or_else(|| self.base_url_v2.clone()),
            root_url: patch.root_url.unwrap_or_else(|| self.root_url.clone()),
            ws_url: patch.ws_url.unwrap_or_else(|| self.ws_url.clone()),
            ws_hubs: patch.ws_hubs.unwrap_or_else(|| self.ws_hubs.clone()),
            verbose: patch.verbose.unwrap_or(self.verbose),
        }
    }

    /// Check if this configuration can issue authenticated calls.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.api_secret.expose_secret().is_empty()
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get API secret (use carefully - exposes secret)
    pub fn api_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }

    /// Set verbose request logging.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set a custom v1.1 base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

/// Partial configuration update consumed by [`BittrexConfig::patch`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BittrexConfigPatch {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: Option<String>,
    pub base_url_v2: Option<String>,
    pub root_url: Option<String>,
    pub ws_url: Option<String>,
    pub ws_hubs: Option<Vec<String>>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
