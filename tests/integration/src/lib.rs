//! Integration test utilities for the interaction client
//!
//! Serves a real [`itx_client::HttpClient`] on a local port and points its
//! REST collaborator at an httpmock server standing in for the platform API.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
