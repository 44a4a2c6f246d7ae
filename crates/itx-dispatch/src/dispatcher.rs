//! Transport-independent interaction routing
//!
//! Commands, components and modals run in their own tasks; autocomplete runs
//! inline so its choices can be returned as the immediate reply. A panicking
//! handler is logged and never takes the dispatcher down.

use itx_common::ClientResult;
use itx_core::{
    Command, CommandData, ComponentData, Interaction, InteractionResponse, InteractionType,
    ModalData, Snowflake,
};
use itx_rest::RestHandler;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::context::{CommandContext, ComponentContext, ModalContext};
use crate::registry::{ComponentHandler, HandlerRegistry, ModalHandler, Route};
use crate::responder::Responder;

/// Runs before every command; returning `false` skips the handler
pub type PreCommandHook = Arc<dyn Fn(&Command, &CommandContext) -> bool + Send + Sync>;
/// Runs after every command handler that completed
pub type PostCommandHook = Arc<dyn Fn(&Command, &CommandContext) + Send + Sync>;

/// Outcome of routing one interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// A handler, waiter or canned reply took the interaction
    Handled,
    /// Nothing will respond to the interaction
    Unhandled,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    rest: Arc<dyn RestHandler>,
    pre_command: Option<PreCommandHook>,
    post_command: Option<PostCommandHook>,
    component_fallback: Option<ComponentHandler>,
    modal_fallback: Option<ModalHandler>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, rest: Arc<dyn RestHandler>) -> Self {
        Self {
            registry,
            rest,
            pre_command: None,
            post_command: None,
            component_fallback: None,
            modal_fallback: None,
        }
    }

    pub fn with_pre_command_hook(mut self, hook: PreCommandHook) -> Self {
        self.pre_command = Some(hook);
        self
    }

    pub fn with_post_command_hook(mut self, hook: PostCommandHook) -> Self {
        self.post_command = Some(hook);
        self
    }

    /// Handler for component interactions no static handler or waiter claimed
    pub fn with_component_handler(mut self, handler: ComponentHandler) -> Self {
        self.component_fallback = Some(handler);
        self
    }

    /// Handler for modal submissions no static handler or waiter claimed
    pub fn with_modal_handler(mut self, handler: ModalHandler) -> Self {
        self.modal_fallback = Some(handler);
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn rest(&self) -> &Arc<dyn RestHandler> {
        &self.rest
    }

    /// Route one interaction
    ///
    /// Returns once the interaction has been handed off; command, component
    /// and modal handlers keep running in the background.
    pub async fn dispatch(&self, mut interaction: Interaction, responder: Arc<dyn Responder>) -> Routing {
        interaction.normalize();
        tracing::trace!(
            interaction_id = %interaction.id,
            kind = interaction.kind.name(),
            "Dispatching interaction"
        );

        match interaction.kind {
            InteractionType::Ping => {
                log_send_error(interaction.id, responder.send(InteractionResponse::pong()).await);
                Routing::Handled
            }
            InteractionType::ApplicationCommand => self.dispatch_command(interaction, responder).await,
            InteractionType::ApplicationCommandAutocomplete => {
                self.dispatch_autocomplete(interaction, responder).await
            }
            InteractionType::MessageComponent => self.dispatch_component(interaction, responder).await,
            InteractionType::ModalSubmit => self.dispatch_modal(interaction, responder).await,
        }
    }

    async fn dispatch_command(&self, mut interaction: Interaction, responder: Arc<dyn Responder>) -> Routing {
        let Some(mut data) = decode::<CommandData>(&interaction) else {
            return Routing::Unhandled;
        };

        let Some(entry) = self.registry.resolve_command(&mut data) else {
            tracing::debug!(interaction_id = %interaction.id, command = %data.name, "Unknown command");
            log_send_error(
                interaction.id,
                responder.send(InteractionResponse::unknown_command()).await,
            );
            return Routing::Handled;
        };

        // Handlers see the subcommand view in the raw payload too
        match serde_json::to_value(&data) {
            Ok(value) => interaction.data = value,
            Err(err) => tracing::warn!(error = %err, "Failed to re-encode command data"),
        }

        let interaction_id = interaction.id;
        let ctx = CommandContext::new(Arc::new(interaction), data, responder, Arc::clone(&self.rest));
        let pre = self.pre_command.clone();
        let post = self.post_command.clone();

        spawn_supervised("command", interaction_id, async move {
            if let Some(pre) = pre {
                if !pre(&entry.command, &ctx) {
                    tracing::debug!(command = %ctx.name(), "Command rejected by pre-command hook");
                    return;
                }
            }

            (entry.handler)(ctx.clone()).await;

            if let Some(post) = post {
                post(&entry.command, &ctx);
            }
        });

        Routing::Handled
    }

    async fn dispatch_autocomplete(&self, interaction: Interaction, responder: Arc<dyn Responder>) -> Routing {
        let Some(mut data) = decode::<CommandData>(&interaction) else {
            return Routing::Unhandled;
        };

        let Some(autocomplete) = self
            .registry
            .resolve_command(&mut data)
            .and_then(|entry| entry.autocomplete)
        else {
            tracing::trace!(command = %data.name, "No autocomplete handler");
            return Routing::Unhandled;
        };

        let interaction_id = interaction.id;
        let ctx = CommandContext::new(
            Arc::new(interaction),
            data,
            Arc::clone(&responder),
            Arc::clone(&self.rest),
        );

        let choices = match std::panic::catch_unwind(AssertUnwindSafe(|| autocomplete(&ctx))) {
            Ok(choices) => choices,
            Err(_) => {
                tracing::error!(interaction_id = %interaction_id, "Autocomplete handler panicked");
                return Routing::Unhandled;
            }
        };

        log_send_error(
            interaction_id,
            responder.send(InteractionResponse::autocomplete(choices)).await,
        );
        Routing::Handled
    }

    async fn dispatch_component(&self, interaction: Interaction, responder: Arc<dyn Responder>) -> Routing {
        let Some(data) = decode::<ComponentData>(&interaction) else {
            return Routing::Unhandled;
        };

        let interaction_id = interaction.id;
        let route = self.registry.component_route(&data.custom_id);
        let ctx = ComponentContext::new(Arc::new(interaction), data, responder, Arc::clone(&self.rest));

        match route {
            Route::Static(handler) => {
                spawn_supervised("component", interaction_id, async move { handler(ctx).await });
                Routing::Handled
            }
            Route::Waiting(sender) => {
                log_send_error(interaction_id, ctx.acknowledge().await);
                let custom_id = ctx.custom_id().to_string();
                deliver(&sender, ctx, &custom_id);
                Routing::Handled
            }
            Route::Missing => match self.component_fallback.clone() {
                Some(handler) => {
                    spawn_supervised("component", interaction_id, async move { handler(ctx).await });
                    Routing::Handled
                }
                None => {
                    tracing::trace!(custom_id = %ctx.custom_id(), "No handler for component, dropping");
                    Routing::Unhandled
                }
            },
        }
    }

    async fn dispatch_modal(&self, interaction: Interaction, responder: Arc<dyn Responder>) -> Routing {
        let Some(data) = decode::<ModalData>(&interaction) else {
            return Routing::Unhandled;
        };

        let interaction_id = interaction.id;
        let route = self.registry.modal_route(&data.custom_id);
        let ctx = ModalContext::new(Arc::new(interaction), data, responder, Arc::clone(&self.rest));

        match route {
            Route::Static(handler) => {
                spawn_supervised("modal", interaction_id, async move { handler(ctx).await });
                Routing::Handled
            }
            Route::Waiting(sender) => {
                log_send_error(interaction_id, ctx.acknowledge().await);
                let custom_id = ctx.custom_id().to_string();
                deliver(&sender, ctx, &custom_id);
                Routing::Handled
            }
            Route::Missing => match self.modal_fallback.clone() {
                Some(handler) => {
                    spawn_supervised("modal", interaction_id, async move { handler(ctx).await });
                    Routing::Handled
                }
                None => {
                    tracing::trace!(custom_id = %ctx.custom_id(), "No handler for modal, dropping");
                    Routing::Unhandled
                }
            },
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("pre_command", &self.pre_command.is_some())
            .field("post_command", &self.post_command.is_some())
            .finish_non_exhaustive()
    }
}

fn decode<T: serde::de::DeserializeOwned>(interaction: &Interaction) -> Option<T> {
    match interaction.decode_data() {
        Ok(data) => Some(data),
        Err(err) => {
            tracing::warn!(
                interaction_id = %interaction.id,
                kind = interaction.kind.name(),
                error = %err,
                "Failed to decode interaction data"
            );
            None
        }
    }
}

/// Non-blocking hand-off to a waiter; dropped when the waiter is busy or gone
fn deliver<T>(sender: &mpsc::Sender<T>, ctx: T, custom_id: &str) {
    match sender.try_send(ctx) {
        Ok(()) => tracing::trace!(custom_id = %custom_id, "Delivered to waiter"),
        Err(TrySendError::Full(_)) => {
            tracing::debug!(custom_id = %custom_id, "Waiter is not receiving, dropping interaction");
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(custom_id = %custom_id, "Waiter is gone, dropping interaction");
        }
    }
}

fn log_send_error(interaction_id: Snowflake, result: ClientResult<()>) {
    if let Err(err) = result {
        tracing::warn!(interaction_id = %interaction_id, error = %err, "Failed to send interaction response");
    }
}

/// Spawn a handler and log if it panics
fn spawn_supervised<F>(kind: &'static str, interaction_id: Snowflake, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(task);
    tokio::spawn(async move {
        if let Err(err) = handle.await {
            if err.is_panic() {
                tracing::error!(interaction_id = %interaction_id, kind, "Handler panicked");
            }
        }
    });
}
