//! # itx-rest
//!
//! Thin REST client for the handful of platform endpoints the interaction
//! pipeline needs: interaction callbacks, follow-up message CRUD, bulk command
//! overwrite, and the gateway configuration fetch.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;

pub use client::{RestClient, RestHandler, USER_AGENT};
pub use endpoints::RestHandlerExt;
pub use error::RestError;
pub use models::{GatewayBot, SessionStartLimit};
pub use reqwest::Method;
