//! Request authentication and bot token helpers

mod signature;
mod token;

pub use signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use token::application_id_from_token;
