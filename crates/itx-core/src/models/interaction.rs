//! Interaction envelope and its type-specific payloads

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::command::{CommandType, OptionType};
use super::guild::{Attachment, PartialChannel, Role};
use super::user::{Member, Message, User};
use crate::value_objects::{Permissions, Snowflake};

/// Interaction type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InteractionType {
    /// Endpoint liveness check sent by the platform
    Ping = 1,
    ApplicationCommand = 2,
    MessageComponent = 3,
    ApplicationCommandAutocomplete = 4,
    ModalSubmit = 5,
}

impl InteractionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ping),
            2 => Some(Self::ApplicationCommand),
            3 => Some(Self::MessageComponent),
            4 => Some(Self::ApplicationCommandAutocomplete),
            5 => Some(Self::ModalSubmit),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::ApplicationCommand => "APPLICATION_COMMAND",
            Self::MessageComponent => "MESSAGE_COMPONENT",
            Self::ApplicationCommandAutocomplete => "APPLICATION_COMMAND_AUTOCOMPLETE",
            Self::ModalSubmit => "MODAL_SUBMIT",
        }
    }
}

u8_wire_format!(InteractionType, "interaction type");

/// One user-triggered event
///
/// The type-specific payload stays as raw JSON in `data` until a handler slot
/// is chosen; use [`Interaction::decode_data`] to get the typed view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Continuation token, valid for about 15 minutes
    pub token: String,
    #[serde(default)]
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_permissions: Option<Permissions>,
    /// Shard that delivered the interaction; `None` for HTTPS deliveries
    #[serde(skip)]
    pub shard_id: Option<u16>,
}

impl Interaction {
    /// Copy the envelope's guild id onto the member record
    pub fn normalize(&mut self) {
        if let Some(member) = self.member.as_mut() {
            member.guild_id = self.guild_id;
        }
    }

    /// User who triggered the interaction, whether invoked in a guild or a DM
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
    }

    /// Decode the type-specific payload
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Option value as sent with a command or autocomplete interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOptionValue {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionValue>,
    /// Set on the option the user is typing into during autocomplete
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
}

/// Entities referenced by option values, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub users: HashMap<Snowflake, User>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub members: HashMap<Snowflake, Member>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub roles: HashMap<Snowflake, Role>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub channels: HashMap<Snowflake, PartialChannel>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub messages: HashMap<Snowflake, Message>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attachments: HashMap<Snowflake, Attachment>,
}

/// Payload of command and autocomplete interactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    #[serde(default)]
    pub id: Snowflake,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CommandType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionValue>,
    #[serde(default)]
    pub resolved: Resolved,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Snowflake>,
}

impl CommandData {
    /// Leading subcommand option, if the user invoked a subcommand
    pub fn subcommand(&self) -> Option<&CommandOptionValue> {
        self.options
            .first()
            .filter(|option| option.kind == OptionType::SubCommand)
    }
}

/// Payload of message component interactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentData {
    pub custom_id: String,
    #[serde(default)]
    pub component_type: u8,
    /// Selected values for select menus
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Submitted text input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalInput {
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub custom_id: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub components: Vec<ModalInput>,
}

/// Payload of modal submit interactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalData {
    pub custom_id: String,
    #[serde(default)]
    pub components: Vec<ActionRow>,
}

impl ModalData {
    /// Value typed into the text input with the given custom id
    pub fn input_value(&self, custom_id: &str) -> Option<&str> {
        self.components
            .iter()
            .flat_map(|row| row.components.iter())
            .find(|input| input.custom_id == custom_id)
            .map(|input| input.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command_payload() -> Value {
        json!({
            "id": "1001",
            "application_id": "2002",
            "type": 2,
            "token": "tok",
            "version": 1,
            "guild_id": "3003",
            "member": {
                "user": {"id": "4004", "username": "ann"},
                "roles": [],
                "permissions": "8"
            },
            "data": {
                "id": "5005",
                "name": "runtime",
                "type": 1,
                "options": [{
                    "name": "stats",
                    "type": 1,
                    "options": [{"name": "verbose", "type": 5, "value": true}]
                }]
            }
        })
    }

    #[test]
    fn test_decode_envelope() {
        let itx: Interaction = serde_json::from_value(command_payload()).unwrap();
        assert_eq!(itx.kind, InteractionType::ApplicationCommand);
        assert_eq!(itx.id, Snowflake::new(1001));
        assert_eq!(itx.token, "tok");
        assert_eq!(itx.invoker().unwrap().username, "ann");
        assert!(itx.shard_id.is_none());
    }

    #[test]
    fn test_normalize_populates_member_guild() {
        let mut itx: Interaction = serde_json::from_value(command_payload()).unwrap();
        assert!(itx.member.as_ref().unwrap().guild_id.is_none());

        itx.normalize();
        assert_eq!(
            itx.member.as_ref().unwrap().guild_id,
            Some(Snowflake::new(3003))
        );
    }

    #[test]
    fn test_decode_command_data() {
        let itx: Interaction = serde_json::from_value(command_payload()).unwrap();
        let data: CommandData = itx.decode_data().unwrap();

        assert_eq!(data.name, "runtime");
        let sub = data.subcommand().unwrap();
        assert_eq!(sub.name, "stats");
        assert_eq!(sub.options[0].value, Some(json!(true)));
    }

    #[test]
    fn test_unknown_interaction_type() {
        let mut payload = command_payload();
        payload["type"] = json!(99);
        assert!(serde_json::from_value::<Interaction>(payload).is_err());
    }

    #[test]
    fn test_modal_input_value() {
        let data: ModalData = serde_json::from_value(json!({
            "custom_id": "feedback",
            "components": [{
                "type": 1,
                "components": [{"type": 4, "custom_id": "body", "value": "great"}]
            }]
        }))
        .unwrap();

        assert_eq!(data.input_value("body"), Some("great"));
        assert_eq!(data.input_value("missing"), None);
    }
}
