//! Example bot entry point
//!
//! Run with:
//! ```bash
//! cargo run -p itx-client --bin itx-bot
//! ```
//!
//! Serves the HTTPS endpoint when `PUBLIC_KEY` is set, otherwise connects to
//! the gateway. Configuration is loaded from environment variables.

use itx_client::model::{Command, MessageData};
use itx_client::{
    command_handler, component_handler, ClientConfig, ClientResult, CommandEntry, CommandFilter,
    ComponentContext, GatewayClient, HandlerRegistry, HttpClient,
};
use itx_common::{try_init_tracing_with_config, TracingConfig};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = ClientConfig::from_env();

    // Pick the tracing preset from the environment when the config loaded
    let tracing_config = config
        .as_ref()
        .map_or_else(|_| TracingConfig::default(), |config| TracingConfig::for_environment(config.app.env));
    if let Err(e) = try_init_tracing_with_config(tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!(error = %e, "Bot failed");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(env = ?config.app.env, "Configuration loaded");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            signal.cancel();
        }
    });

    if config.bot.public_key.is_some() {
        let client = HttpClient::new(config)?;
        register_commands(client.registry())?;
        client.sync_commands(&[], &CommandFilter::All).await?;
        client.serve(shutdown).await?;
    } else {
        let client = GatewayClient::new(config)?;
        register_commands(client.registry())?;
        client.sync_commands(&[], &CommandFilter::All).await?;
        client.start(&shutdown).await?;
    }

    Ok(())
}

fn register_commands(registry: &std::sync::Arc<HandlerRegistry>) -> ClientResult<()> {
    registry.register_command(CommandEntry::new(
        Command::new("ping", "Check that the bot is alive"),
        command_handler(|ctx| async move {
            if let Err(e) = ctx.send_reply("pong", true).await {
                error!(error = %e, "Failed to reply");
            }
        }),
    ))?;

    let waiters = std::sync::Arc::clone(registry);
    registry.register_command(CommandEntry::new(
        Command::new("confirm", "Ask for a confirmation"),
        command_handler(move |ctx| {
            let waiters = std::sync::Arc::clone(&waiters);
            async move {
                let custom_id = format!("confirm-{}", ctx.id());
                let mut waiter = match waiters.await_component([custom_id.clone()]) {
                    Ok(waiter) => waiter,
                    Err(e) => {
                        error!(error = %e, "Failed to await confirmation");
                        return;
                    }
                };

                let mut prompt = MessageData::text("Are you sure?").ephemeral();
                prompt.components = vec![json!({
                    "type": 1,
                    "components": [{"type": 2, "style": 1, "label": "Yes", "custom_id": custom_id}]
                })];
                if let Err(e) = ctx.send_message(prompt).await {
                    error!(error = %e, "Failed to send prompt");
                    return;
                }

                let content = match waiter.recv_timeout(Duration::from_secs(30)).await {
                    Some(click) => format!("Confirmed by {}", invoker_name(&click)),
                    None => "Timed out".to_string(),
                };
                if let Err(e) = ctx.send_follow_up(MessageData::text(content)).await {
                    error!(error = %e, "Failed to send follow-up");
                }
            }
        }),
    ))?;

    registry.register_component(
        ["about"],
        component_handler(|ctx| async move {
            if let Err(e) = ctx.send_reply("Interaction demo bot", true).await {
                error!(error = %e, "Failed to reply");
            }
        }),
    )?;

    Ok(())
}

fn invoker_name(ctx: &ComponentContext) -> String {
    ctx.invoker()
        .map_or_else(|| "someone".to_string(), |user| user.username.clone())
}
