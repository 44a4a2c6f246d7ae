//! Gateway packet format
//!
//! Every frame on the gateway is one JSON object `{op, s, t, d}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{IdentifyPayload, OpCode, ResumePayload};

pub const API_VERSION: u8 = 10;

pub const READY_EVENT: &str = "READY";
pub const RESUMED_EVENT: &str = "RESUMED";
pub const INTERACTION_CREATE_EVENT: &str = "INTERACTION_CREATE";

/// Gateway URL with version and encoding selectors appended
#[must_use]
pub fn connection_url(base: &str) -> String {
    format!(
        "{}/?v={API_VERSION}&encoding=json",
        base.trim_end_matches('/')
    )
}

/// One gateway packet
///
/// The op code is kept raw so packets with op codes this crate does not know
/// still decode and can be logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPacket {
    pub op: u8,

    /// Sequence number, dispatches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name, dispatches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    #[serde(default)]
    pub d: Value,
}

impl EventPacket {
    fn new(op: OpCode, d: Value) -> Self {
        Self {
            op: op.as_u8(),
            s: None,
            t: None,
            d,
        }
    }

    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    #[must_use]
    pub fn is_event(&self, name: &str) -> bool {
        self.opcode() == Some(OpCode::Dispatch) && self.t.as_deref() == Some(name)
    }

    // === Client packets ===

    /// Heartbeat carrying the last sequence, `null` before the first dispatch
    #[must_use]
    pub fn heartbeat(last_sequence: u64) -> Self {
        let d = if last_sequence == 0 {
            Value::Null
        } else {
            Value::from(last_sequence)
        };
        Self::new(OpCode::Heartbeat, d)
    }

    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(OpCode::Identify, serde_json::to_value(payload)?))
    }

    pub fn resume(payload: &ResumePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(OpCode::Resume, serde_json::to_value(payload)?))
    }

    // === Server packets ===

    #[must_use]
    pub fn dispatch(event: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch.as_u8(),
            s: Some(sequence),
            t: Some(event.into()),
            d: data,
        }
    }

    #[must_use]
    pub fn hello(heartbeat_interval_ms: u64) -> Self {
        Self::new(
            OpCode::Hello,
            serde_json::json!({ "heartbeat_interval": heartbeat_interval_ms }),
        )
    }

    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck, Value::Null)
    }

    #[must_use]
    pub fn reconnect() -> Self {
        Self::new(OpCode::Reconnect, Value::Null)
    }

    /// `resumable` tells the client whether it may resume afterwards
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::new(OpCode::InvalidSession, Value::Bool(resumable))
    }
}

impl std::fmt::Display for EventPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Some(op) => write!(f, "EventPacket(op={op}")?,
            None => write!(f, "EventPacket(op={}", self.op)?,
        }
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        write!(f, ")")
    }
}
