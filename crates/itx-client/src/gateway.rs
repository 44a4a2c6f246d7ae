//! Gateway front door
//!
//! Turns the shard fleet's event callback into dispatches. Interactions are
//! acknowledged at the websocket layer already, so replies always go through
//! the REST callback.

use itx_core::Interaction;
use itx_dispatch::{Dispatcher, RestResponder, Routing};
use itx_gateway::{EventHandler, EventPacket};
use serde_json::Value;
use std::sync::Arc;

pub const INTERACTION_CREATE: &str = "INTERACTION_CREATE";

/// Event callback for a shard manager
///
/// Interaction creates are decoded and dispatched on their own task; every
/// other dispatch goes to `custom` when given.
pub fn event_handler(dispatcher: Arc<Dispatcher>, custom: Option<EventHandler>) -> EventHandler {
    Arc::new(move |shard_id: u16, packet: EventPacket| {
        if !packet.is_event(INTERACTION_CREATE) {
            if let Some(custom) = &custom {
                custom(shard_id, packet);
            }
            return;
        }

        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            handle_interaction(&dispatcher, shard_id, packet.d).await;
        });
    })
}

async fn handle_interaction(dispatcher: &Dispatcher, shard_id: u16, data: Value) {
    let mut interaction: Interaction = match serde_json::from_value(data) {
        Ok(interaction) => interaction,
        Err(err) => {
            tracing::warn!(shard_id, error = %err, "Failed to decode interaction");
            return;
        }
    };
    interaction.shard_id = Some(shard_id);

    let interaction_id = interaction.id;
    let responder = Arc::new(RestResponder::new(&interaction, Arc::clone(dispatcher.rest())));
    if dispatcher.dispatch(interaction, responder).await == Routing::Unhandled {
        tracing::trace!(shard_id, interaction_id = %interaction_id, "Interaction not handled");
    }
}
