//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use itx_core::Intents;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub bot: BotConfig,
    pub http: HttpConfig,
    pub rest: RestConfig,
    pub gateway: GatewayConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
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

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Bot credentials
#[derive(Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
    /// Hex ed25519 key; only needed for the HTTPS transport
    #[serde(default)]
    pub public_key: Option<String>,
}

// Keep the token out of logs
impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// HTTPS interaction endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_response_deadline_ms")]
    pub response_deadline_ms: u64,
}

impl HttpConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn response_deadline(&self) -> Duration {
        Duration::from_millis(self.response_deadline_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            max_body_bytes: default_max_body_bytes(),
            response_deadline_ms: default_response_deadline_ms(),
        }
    }
}

/// REST collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    #[serde(default = "default_rest_timeout_ms")]
    pub timeout_ms: u64,
}

impl RestConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            max_retries: default_max_retries(),
            timeout_ms: default_rest_timeout_ms(),
        }
    }
}

/// Shard fleet configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub intents: Intents,
    /// 0 means "use the platform's recommendation"
    #[serde(default)]
    pub shard_count: u16,
    #[serde(default = "default_identify_spacing_ms")]
    pub identify_spacing_ms: u64,
}

impl GatewayConfig {
    #[must_use]
    pub fn identify_spacing(&self) -> Duration {
        Duration::from_millis(self.identify_spacing_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            intents: Intents::empty(),
            shard_count: 0,
            identify_spacing_ms: default_identify_spacing_ms(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_response_deadline_ms() -> u64 {
    2900
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_max_retries() -> u8 {
    3
}

fn default_rest_timeout_ms() -> u64 {
    3000
}

fn default_identify_spacing_ms() -> u64 {
    5000
}

impl ClientConfig {
    /// Configuration with defaults for everything but the credentials
    pub fn new(token: impl Into<String>, public_key: Option<String>) -> Self {
        Self {
            app: AppSettings {
                env: Environment::default(),
            },
            bot: BotConfig {
                token: token.into(),
                public_key,
            },
            http: HttpConfig::default(),
            rest: RestConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `BOT_TOKEN` is missing or a value cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &'static str,
            default: impl FnOnce() -> T,
        ) -> Result<T, ConfigError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key, raw)),
                None => Ok(default()),
            }
        }

        let env = match lookup("APP_ENV") {
            Some(raw) => {
                Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?
            }
            None => Environment::default(),
        };

        Ok(Self {
            app: AppSettings { env },
            bot: BotConfig {
                token: lookup("BOT_TOKEN")
                    .filter(|token| !token.trim().is_empty())
                    .ok_or(ConfigError::MissingVar("BOT_TOKEN"))?,
                public_key: lookup("PUBLIC_KEY"),
            },
            http: HttpConfig {
                host: lookup("HTTP_HOST").unwrap_or_else(default_host),
                port: parsed(&lookup, "HTTP_PORT", default_port)?,
                path: lookup("HTTP_PATH").unwrap_or_else(default_path),
                max_body_bytes: parsed(&lookup, "MAX_BODY_BYTES", default_max_body_bytes)?,
                response_deadline_ms: parsed(
                    &lookup,
                    "RESPONSE_DEADLINE_MS",
                    default_response_deadline_ms,
                )?,
            },
            rest: RestConfig {
                api_base_url: lookup("API_BASE_URL").unwrap_or_else(default_api_base_url),
                max_retries: parsed(&lookup, "REST_MAX_RETRIES", default_max_retries)?,
                timeout_ms: parsed(&lookup, "REST_TIMEOUT_MS", default_rest_timeout_ms)?,
            },
            gateway: GatewayConfig {
                intents: Intents::from_bits_retain(parsed(&lookup, "GATEWAY_INTENTS", || 0)?),
                shard_count: parsed(&lookup, "SHARD_COUNT", || 0)?,
                identify_spacing_ms: parsed(
                    &lookup,
                    "IDENTIFY_SPACING_MS",
                    default_identify_spacing_ms,
                )?,
            },
        })
    }

    /// Public key required by the HTTPS transport
    pub fn require_public_key(&self) -> Result<&str, ConfigError> {
        self.bot
            .public_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingVar("PUBLIC_KEY"))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
