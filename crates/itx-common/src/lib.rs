//! # itx-common
//!
//! Shared utilities including configuration, error handling, request signature
//! verification, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    application_id_from_token, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
pub use config::{
    AppSettings, BotConfig, ClientConfig, ConfigError, Environment, GatewayConfig, HttpConfig,
    RestConfig,
};
pub use error::{ClientError, ClientResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
