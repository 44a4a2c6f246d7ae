//! Wire models exchanged with the platform

/// Implements `Serialize`/`Deserialize` through the type's `as_u8`/`from_u8` pair.
macro_rules! u8_wire_format {
    ($ty:ident, $expecting:literal) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_u8(self.as_u8())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = <u8 as serde::Deserialize>::deserialize(deserializer)?;
                $ty::from_u8(value).ok_or_else(|| {
                    serde::de::Error::custom(format!(concat!("unknown ", $expecting, ": {}"), value))
                })
            }
        }
    };
}

mod command;
mod guild;
mod interaction;
mod response;
mod user;

pub use command::{Choice, Command, CommandOption, CommandType, InteractionContextType, OptionType};
pub use interaction::{
    ActionRow, CommandData, CommandOptionValue, ComponentData, Interaction, InteractionType,
    ModalData, ModalInput, Resolved,
};
pub use response::{
    AutocompleteData, InteractionResponse, MessageData, ModalForm, ResponseData, ResponseType,
};
pub use guild::{Attachment, PartialChannel, Role};
pub use user::{Member, Message, User};
