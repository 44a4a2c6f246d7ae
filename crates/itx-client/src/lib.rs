//! # itx-client
//!
//! Front doors and entry points: [`HttpClient`] serves the signed HTTPS
//! interaction endpoint, [`GatewayClient`] consumes interactions from the
//! gateway shard fleet. Both route through the same registry and dispatcher.

pub mod client;
pub mod gateway;
pub mod http;

#[cfg(test)]
mod test_support;

pub use client::{GatewayClient, HttpClient};
pub use gateway::INTERACTION_CREATE;
pub use http::{create_app, ApiError, HttpState};

pub use itx_common::{ClientConfig, ClientError, ClientResult};
pub use itx_core as model;
pub use itx_dispatch::{
    autocomplete_handler, command_handler, component_handler, modal_handler, CommandContext,
    CommandEntry, CommandFilter, ComponentContext, HandlerRegistry, ModalContext, Waiter,
};
