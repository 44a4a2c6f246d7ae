//! # itx-core
//!
//! Data model shared by every transport: the interaction envelope, command records,
//! response objects, and the value objects they are built from.
//! This crate has no dependencies on networking or runtime crates.

pub mod models;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use models::{
    ActionRow, Attachment, AutocompleteData, Choice, Command, CommandData, CommandOption, CommandOptionValue,
    CommandType, ComponentData, Interaction, InteractionContextType, InteractionResponse,
    InteractionType, Member, Message, MessageData, ModalData, ModalForm, ModalInput, OptionType,
    PartialChannel, Resolved, ResponseData, ResponseType, Role, User,
};
pub use value_objects::{Intents, MessageFlags, Permissions, Snowflake, SnowflakeParseError};
