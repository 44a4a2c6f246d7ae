//! Payloads carried in the `d` field of gateway packets

use itx_core::Intents;
use serde::{Deserialize, Serialize};

/// Payload of op 10 (Hello)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload of op 2 (Identify)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub intents: Intents,
    /// `[shard_id, shard_count]`
    pub shard: [u16; 2],
    pub properties: IdentifyProperties,
}

/// Connection properties sent with Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "itx".to_string(),
            device: "itx".to_string(),
        }
    }
}

/// Payload of op 6 (Resume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

/// The parts of the READY dispatch a shard keeps
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_shape() {
        let payload = IdentifyPayload {
            token: "tok".to_string(),
            intents: Intents::GUILDS,
            shard: [1, 4],
            properties: IdentifyProperties {
                os: "linux".to_string(),
                browser: "itx".to_string(),
                device: "itx".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "token": "tok",
                "intents": 1,
                "shard": [1, 4],
                "properties": {"os": "linux", "browser": "itx", "device": "itx"}
            })
        );
    }

    #[test]
    fn test_ready_ignores_extra_fields() {
        let ready: ReadyPayload = serde_json::from_str(
            r#"{"v":10,"session_id":"abc","resume_gateway_url":"wss://resume.example","user":{"id":"1"}}"#,
        )
        .unwrap();

        assert_eq!(ready.session_id, "abc");
        assert_eq!(
            ready.resume_gateway_url.as_deref(),
            Some("wss://resume.example")
        );
    }
}
