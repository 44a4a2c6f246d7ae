//! Interaction responses
//!
//! Only the serializing side is modelled; responses are produced here and consumed
//! by the platform.

use serde::Serialize;
use serde_json::Value;

use super::command::Choice;
use crate::value_objects::MessageFlags;

/// Callback type of an interaction response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseType {
    /// ACK a ping
    Pong = 1,
    /// Respond to an interaction with a message
    ChannelMessageWithSource = 4,
    /// ACK now, edit the original response later; the user sees a loading state
    DeferredChannelMessageWithSource = 5,
    /// For components: ACK now, edit the message later; no loading state
    DeferredUpdateMessage = 6,
    /// For components: edit the message the component was attached to
    UpdateMessage = 7,
    /// Respond to an autocomplete interaction with suggested choices
    ApplicationCommandAutocompleteResult = 8,
    /// Respond with a popup modal
    Modal = 9,
}

impl ResponseType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Pong),
            4 => Some(Self::ChannelMessageWithSource),
            5 => Some(Self::DeferredChannelMessageWithSource),
            6 => Some(Self::DeferredUpdateMessage),
            7 => Some(Self::UpdateMessage),
            8 => Some(Self::ApplicationCommandAutocompleteResult),
            9 => Some(Self::Modal),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

u8_wire_format!(ResponseType, "response type");

/// Message body used for replies, edits and follow-ups
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
pub struct MessageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<MessageFlags>,
}

impl MessageData {
    /// Plain text message
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Mark the message visible to the invoking user only
    ///
    /// Flags already set by the caller are left untouched.
    pub fn ephemeral(mut self) -> Self {
        if self.flags.is_none() {
            self.flags = Some(MessageFlags::EPHEMERAL);
        }
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags
            .is_some_and(|flags| flags.contains(MessageFlags::EPHEMERAL))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutocompleteData {
    pub choices: Vec<Choice>,
}

/// Popup modal definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalForm {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Message(MessageData),
    Autocomplete(AutocompleteData),
    Modal(ModalForm),
}

/// Body of an interaction callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

const UNKNOWN_COMMAND_CONTENT: &str = "Oh uh.. It looks like you tried to trigger (/) unknown command. Please report this bug to bot owner.";

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: ResponseType::Pong,
            data: None,
        }
    }

    /// Acknowledge a component or modal without changing anything visible
    pub fn deferred_update() -> Self {
        Self {
            kind: ResponseType::DeferredUpdateMessage,
            data: None,
        }
    }

    pub fn message(data: MessageData) -> Self {
        Self {
            kind: ResponseType::ChannelMessageWithSource,
            data: Some(ResponseData::Message(data)),
        }
    }

    pub fn deferred_message(ephemeral: bool) -> Self {
        let data = if ephemeral {
            Some(ResponseData::Message(MessageData {
                flags: Some(MessageFlags::EPHEMERAL),
                ..MessageData::default()
            }))
        } else {
            None
        };

        Self {
            kind: ResponseType::DeferredChannelMessageWithSource,
            data,
        }
    }

    pub fn update_message(data: MessageData) -> Self {
        Self {
            kind: ResponseType::UpdateMessage,
            data: Some(ResponseData::Message(data)),
        }
    }

    pub fn autocomplete(choices: Vec<Choice>) -> Self {
        Self {
            kind: ResponseType::ApplicationCommandAutocompleteResult,
            data: Some(ResponseData::Autocomplete(AutocompleteData { choices })),
        }
    }

    pub fn modal(form: ModalForm) -> Self {
        Self {
            kind: ResponseType::Modal,
            data: Some(ResponseData::Modal(form)),
        }
    }

    /// Ephemeral reply sent when a command has no registered handler
    pub fn unknown_command() -> Self {
        Self::message(MessageData::text(UNKNOWN_COMMAND_CONTENT).ephemeral())
    }
}
