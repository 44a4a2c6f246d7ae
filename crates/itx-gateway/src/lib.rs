//! # itx-gateway
//!
//! Websocket consumer for the platform gateway: one [`Shard`] per session,
//! driven by a [`ShardManager`] that respects the identify rate limit.

pub mod error;
pub mod manager;
pub mod protocol;
pub mod shard;
pub mod socket;

#[cfg(test)]
mod test_support;

pub use error::{GatewayError, SocketError};
pub use manager::ShardManager;
pub use protocol::{CloseCode, EventPacket, OpCode};
pub use shard::{EventHandler, Shard, ShardConfig, ShardStatus};
pub use socket::{Connector, Frame, FrameSink, FrameStream, Socket, TungsteniteConnector};
