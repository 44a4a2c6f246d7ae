//! Response bodies of REST endpoints that are not part of the interaction model

use serde::{Deserialize, Serialize};

/// `GET /gateway/bot`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBot {
    /// Websocket URL without query parameters
    pub url: String,
    /// Recommended number of shards
    pub shards: u16,
    pub session_start_limit: SessionStartLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub remaining: u32,
    /// Milliseconds until the limit resets
    #[serde(default)]
    pub reset_after: u64,
    /// Number of identify requests allowed per 5 seconds
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u16,
}

fn default_max_concurrency() -> u16 {
    1
}
