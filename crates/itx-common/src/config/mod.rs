//! Configuration structs

mod client_config;

pub use client_config::{
    AppSettings, BotConfig, ClientConfig, ConfigError, Environment, GatewayConfig, HttpConfig,
    RestConfig,
};
