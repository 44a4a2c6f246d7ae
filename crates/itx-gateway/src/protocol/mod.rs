//! Gateway protocol definitions
//!
//! Op codes, close codes, the packet envelope and the payloads a shard
//! sends or inspects.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::{
    connection_url, EventPacket, API_VERSION, INTERACTION_CREATE_EVENT, READY_EVENT,
    RESUMED_EVENT,
};
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, ReadyPayload, ResumePayload};
