//! Handler contexts
//!
//! Each handler receives the decoded interaction together with its responder
//! and the REST collaborator for edits and follow-ups. Contexts are cheap to
//! clone.

use itx_common::ClientResult;
use itx_core::{
    Attachment, CommandData, CommandOptionValue, ComponentData, Interaction, InteractionResponse,
    Member, Message, MessageData, ModalData, ModalForm, PartialChannel, Role, Snowflake, User,
};
use itx_rest::{RestHandler, RestHandlerExt};
use serde_json::Value;
use std::sync::Arc;

use crate::responder::Responder;

/// Reply operations shared by every context
macro_rules! reply_operations {
    ($ty:ident) => {
        impl $ty {
            pub fn interaction(&self) -> &Interaction {
                &self.interaction
            }

            pub fn id(&self) -> Snowflake {
                self.interaction.id
            }

            pub fn guild_id(&self) -> Option<Snowflake> {
                self.interaction.guild_id
            }

            pub fn channel_id(&self) -> Option<Snowflake> {
                self.interaction.channel_id
            }

            /// Shard that delivered the interaction; `None` over HTTPS
            pub fn shard_id(&self) -> Option<u16> {
                self.interaction.shard_id
            }

            pub fn invoker(&self) -> Option<&User> {
                self.interaction.invoker()
            }

            pub fn responder(&self) -> &Arc<dyn Responder> {
                &self.responder
            }

            /// Send an arbitrary initial response
            pub async fn respond(&self, response: InteractionResponse) -> ClientResult<()> {
                self.responder.send(response).await
            }

            pub async fn send_reply(&self, content: impl Into<String>, ephemeral: bool) -> ClientResult<()> {
                let data = MessageData::text(content);
                let data = if ephemeral { data.ephemeral() } else { data };
                self.send_message(data).await
            }

            pub async fn send_message(&self, data: MessageData) -> ClientResult<()> {
                self.respond(InteractionResponse::message(data)).await
            }

            pub async fn send_modal(&self, form: ModalForm) -> ClientResult<()> {
                self.respond(InteractionResponse::modal(form)).await
            }

            /// Edit the initial response (or the deferred placeholder)
            pub async fn edit_reply(&self, data: MessageData) -> ClientResult<()> {
                self.rest
                    .edit_original_response(self.interaction.application_id, &self.interaction.token, &data)
                    .await?;
                Ok(())
            }

            pub async fn delete_reply(&self) -> ClientResult<()> {
                self.rest
                    .delete_original_response(self.interaction.application_id, &self.interaction.token)
                    .await?;
                Ok(())
            }

            pub async fn send_follow_up(&self, data: MessageData) -> ClientResult<Message> {
                let message = self
                    .rest
                    .create_follow_up(self.interaction.application_id, &self.interaction.token, &data)
                    .await?;
                Ok(message)
            }

            pub async fn edit_follow_up(&self, message_id: Snowflake, data: MessageData) -> ClientResult<()> {
                self.rest
                    .edit_follow_up(
                        self.interaction.application_id,
                        &self.interaction.token,
                        message_id,
                        &data,
                    )
                    .await?;
                Ok(())
            }

            pub async fn delete_follow_up(&self, message_id: Snowflake) -> ClientResult<()> {
                self.rest
                    .delete_follow_up(self.interaction.application_id, &self.interaction.token, message_id)
                    .await?;
                Ok(())
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("interaction_id", &self.interaction.id)
                    .field("data", &self.data)
                    .finish_non_exhaustive()
            }
        }
    };
}

/// Context of a slash, user or message command (and of its autocomplete)
#[derive(Clone)]
pub struct CommandContext {
    interaction: Arc<Interaction>,
    data: Arc<CommandData>,
    responder: Arc<dyn Responder>,
    rest: Arc<dyn RestHandler>,
}

reply_operations!(CommandContext);

impl CommandContext {
    pub fn new(
        interaction: Arc<Interaction>,
        data: CommandData,
        responder: Arc<dyn Responder>,
        rest: Arc<dyn RestHandler>,
    ) -> Self {
        Self {
            interaction,
            data: Arc::new(data),
            responder,
            rest,
        }
    }

    /// Command data; for subcommands the name is `parent@child` and the
    /// options are the subcommand's own
    pub fn data(&self) -> &CommandData {
        &self.data
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Acknowledge now and reply later through [`Self::edit_reply`]
    pub async fn defer(&self, ephemeral: bool) -> ClientResult<()> {
        self.respond(InteractionResponse::deferred_message(ephemeral))
            .await
    }

    pub fn option_value(&self, name: &str) -> Option<&Value> {
        self.data
            .options
            .iter()
            .find(|option| option.name == name)
            .and_then(|option| option.value.as_ref())
    }

    /// Option the user is typing into; only set during autocomplete
    pub fn focused_option(&self) -> Option<&CommandOptionValue> {
        self.data.options.iter().find(|option| option.focused)
    }

    pub fn resolve_user(&self, id: Snowflake) -> Option<&User> {
        self.data.resolved.users.get(&id)
    }

    /// Resolved member with its user record attached
    pub fn resolve_member(&self, id: Snowflake) -> Option<Member> {
        let mut member = self.data.resolved.members.get(&id)?.clone();
        if member.user.is_none() {
            member.user = self.resolve_user(id).cloned();
        }
        Some(member)
    }

    pub fn resolve_role(&self, id: Snowflake) -> Option<&Role> {
        self.data.resolved.roles.get(&id)
    }

    pub fn resolve_channel(&self, id: Snowflake) -> Option<&PartialChannel> {
        self.data.resolved.channels.get(&id)
    }

    /// Target of a message context-menu command
    pub fn resolve_message(&self, id: Snowflake) -> Option<&Message> {
        self.data.resolved.messages.get(&id)
    }

    pub fn resolve_attachment(&self, id: Snowflake) -> Option<&Attachment> {
        self.data.resolved.attachments.get(&id)
    }
}

/// Context of a button or select menu interaction
#[derive(Clone)]
pub struct ComponentContext {
    interaction: Arc<Interaction>,
    data: Arc<ComponentData>,
    responder: Arc<dyn Responder>,
    rest: Arc<dyn RestHandler>,
}

reply_operations!(ComponentContext);

impl ComponentContext {
    pub fn new(
        interaction: Arc<Interaction>,
        data: ComponentData,
        responder: Arc<dyn Responder>,
        rest: Arc<dyn RestHandler>,
    ) -> Self {
        Self {
            interaction,
            data: Arc::new(data),
            responder,
            rest,
        }
    }

    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    pub fn custom_id(&self) -> &str {
        &self.data.custom_id
    }

    /// Selected values of a select menu
    pub fn values(&self) -> &[String] {
        &self.data.values
    }

    /// Acknowledge without changing the message
    pub async fn acknowledge(&self) -> ClientResult<()> {
        self.respond(InteractionResponse::deferred_update()).await
    }

    /// Replace the message the component is attached to
    pub async fn update_message(&self, data: MessageData) -> ClientResult<()> {
        self.respond(InteractionResponse::update_message(data)).await
    }
}

/// Context of a modal submission
#[derive(Clone)]
pub struct ModalContext {
    interaction: Arc<Interaction>,
    data: Arc<ModalData>,
    responder: Arc<dyn Responder>,
    rest: Arc<dyn RestHandler>,
}

reply_operations!(ModalContext);

impl ModalContext {
    pub fn new(
        interaction: Arc<Interaction>,
        data: ModalData,
        responder: Arc<dyn Responder>,
        rest: Arc<dyn RestHandler>,
    ) -> Self {
        Self {
            interaction,
            data: Arc::new(data),
            responder,
            rest,
        }
    }

    pub fn data(&self) -> &ModalData {
        &self.data
    }

    pub fn custom_id(&self) -> &str {
        &self.data.custom_id
    }

    pub fn input_value(&self, custom_id: &str) -> Option<&str> {
        self.data.input_value(custom_id)
    }

    pub async fn acknowledge(&self) -> ClientResult<()> {
        self.respond(InteractionResponse::deferred_update()).await
    }
}
