//! Bot client entry points
//!
//! Both clients wire the same pieces from a [`ClientConfig`]: the REST
//! collaborator, the handler registry and the dispatcher. They differ only in
//! the front door they run.

/// Registry access, hooks and command sync shared by both clients
macro_rules! client_operations {
    ($ty:ident) => {
        impl $ty {
            pub fn config(&self) -> &itx_common::ClientConfig {
                &self.parts.config
            }

            /// Registry for commands, handlers and waiters; clone the `Arc`
            /// into handlers that need to await components or modals
            pub fn registry(&self) -> &std::sync::Arc<itx_dispatch::HandlerRegistry> {
                &self.parts.registry
            }

            pub fn rest(&self) -> &std::sync::Arc<dyn itx_rest::RestHandler> {
                &self.parts.rest
            }

            /// Contexts given to commands registered without any
            pub fn with_default_contexts(self, contexts: Vec<itx_core::InteractionContextType>) -> Self {
                self.parts.registry.set_default_contexts(contexts);
                self
            }

            pub fn with_pre_command_hook(mut self, hook: itx_dispatch::PreCommandHook) -> Self {
                self.parts.dispatcher = self.parts.dispatcher.with_pre_command_hook(hook);
                self
            }

            pub fn with_post_command_hook(mut self, hook: itx_dispatch::PostCommandHook) -> Self {
                self.parts.dispatcher = self.parts.dispatcher.with_post_command_hook(hook);
                self
            }

            /// Handler for component interactions nothing else claimed
            pub fn with_component_handler(mut self, handler: itx_dispatch::ComponentHandler) -> Self {
                self.parts.dispatcher = self.parts.dispatcher.with_component_handler(handler);
                self
            }

            /// Handler for modal submissions nothing else claimed
            pub fn with_modal_handler(mut self, handler: itx_dispatch::ModalHandler) -> Self {
                self.parts.dispatcher = self.parts.dispatcher.with_modal_handler(handler);
                self
            }

            /// Bulk-overwrite the registered commands; globally when `guild_ids` is empty
            pub async fn sync_commands(
                &self,
                guild_ids: &[itx_core::Snowflake],
                filter: &itx_dispatch::CommandFilter,
            ) -> itx_common::ClientResult<()> {
                self.parts.sync_commands(guild_ids, filter).await
            }

            pub async fn send_message(
                &self,
                channel_id: itx_core::Snowflake,
                message: &itx_core::MessageData,
            ) -> itx_common::ClientResult<itx_core::Message> {
                use itx_rest::RestHandlerExt;
                Ok(self.parts.rest.create_message(channel_id, message).await?)
            }

            /// Send a plain-text message
            pub async fn send_linear_message(
                &self,
                channel_id: itx_core::Snowflake,
                content: impl Into<String>,
            ) -> itx_common::ClientResult<itx_core::Message> {
                self.send_message(channel_id, &itx_core::MessageData::text(content)).await
            }

            /// Open the user's DM channel and send into it
            ///
            /// Opening DM channels is heavily rate limited; prefer reusing the
            /// returned message's `channel_id`.
            pub async fn send_private_message(
                &self,
                user_id: itx_core::Snowflake,
                message: &itx_core::MessageData,
            ) -> itx_common::ClientResult<itx_core::Message> {
                use itx_rest::RestHandlerExt;
                let channel = self.parts.rest.create_dm_channel(user_id).await?;
                let mut sent = self.send_message(channel.id, message).await?;
                sent.channel_id = channel.id;
                Ok(sent)
            }

            pub async fn edit_message(
                &self,
                channel_id: itx_core::Snowflake,
                message_id: itx_core::Snowflake,
                message: &itx_core::MessageData,
            ) -> itx_common::ClientResult<()> {
                use itx_rest::RestHandlerExt;
                Ok(self.parts.rest.edit_message(channel_id, message_id, message).await?)
            }

            pub async fn delete_message(
                &self,
                channel_id: itx_core::Snowflake,
                message_id: itx_core::Snowflake,
            ) -> itx_common::ClientResult<()> {
                use itx_rest::RestHandlerExt;
                Ok(self.parts.rest.delete_message(channel_id, message_id).await?)
            }

            pub async fn crosspost_message(
                &self,
                channel_id: itx_core::Snowflake,
                message_id: itx_core::Snowflake,
            ) -> itx_common::ClientResult<()> {
                use itx_rest::RestHandlerExt;
                Ok(self.parts.rest.crosspost_message(channel_id, message_id).await?)
            }

            pub async fn fetch_user(
                &self,
                user_id: itx_core::Snowflake,
            ) -> itx_common::ClientResult<itx_core::User> {
                use itx_rest::RestHandlerExt;
                Ok(self.parts.rest.fetch_user(user_id).await?)
            }

            pub async fn fetch_member(
                &self,
                guild_id: itx_core::Snowflake,
                user_id: itx_core::Snowflake,
            ) -> itx_common::ClientResult<itx_core::Member> {
                use itx_rest::RestHandlerExt;
                Ok(self.parts.rest.fetch_member(guild_id, user_id).await?)
            }

            /// Round-trip time of a lightweight API request
            pub async fn ping(&self) -> itx_common::ClientResult<std::time::Duration> {
                use itx_rest::RestHandlerExt;
                let started = tokio::time::Instant::now();
                self.parts.rest.gateway().await?;
                Ok(started.elapsed())
            }
        }
    };
}

mod gateway;
mod http;

pub use gateway::GatewayClient;
pub use http::HttpClient;

use itx_common::{application_id_from_token, ClientConfig, ClientResult};
use itx_core::Snowflake;
use itx_dispatch::{CommandFilter, Dispatcher, HandlerRegistry};
use itx_rest::{RestHandler, RestHandlerExt};
use std::sync::Arc;

/// Pieces shared by both clients
struct ClientParts {
    config: ClientConfig,
    rest: Arc<dyn RestHandler>,
    registry: Arc<HandlerRegistry>,
    dispatcher: Dispatcher,
}

impl ClientParts {
    fn new(config: ClientConfig, rest: Arc<dyn RestHandler>) -> ClientResult<Self> {
        let application_id = application_id_from_token(&config.bot.token)?;
        let registry = Arc::new(HandlerRegistry::new(application_id));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&rest));

        tracing::debug!(application_id = %application_id, "Client configured");

        Ok(Self {
            config,
            rest,
            registry,
            dispatcher,
        })
    }

    /// Bulk-overwrite the registered commands globally, or per guild
    async fn sync_commands(&self, guild_ids: &[Snowflake], filter: &CommandFilter) -> ClientResult<()> {
        let commands = self.registry.export_commands(filter);
        let application_id = self.registry.application_id();

        if guild_ids.is_empty() {
            self.rest
                .bulk_overwrite_commands(application_id, None, &commands)
                .await?;
            tracing::info!(commands = commands.len(), "Synced global commands");
            return Ok(());
        }

        for &guild_id in guild_ids {
            self.rest
                .bulk_overwrite_commands(application_id, Some(guild_id), &commands)
                .await?;
            tracing::info!(guild_id = %guild_id, commands = commands.len(), "Synced guild commands");
        }
        Ok(())
    }
}
