//! Value objects - small copyable types with a fixed wire form

mod flags;
mod permissions;
mod snowflake;

pub use flags::{Intents, MessageFlags};
pub use permissions::Permissions;
pub use snowflake::{Snowflake, SnowflakeParseError};
