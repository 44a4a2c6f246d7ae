//! Bot token parsing
//!
//! The first `.`-separated segment of a bot token is the base64 encoded
//! application id.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use itx_core::Snowflake;

use crate::error::ClientError;

const TOKEN_ID_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Extract the application id embedded in a bot token
pub fn application_id_from_token(token: &str) -> Result<Snowflake, ClientError> {
    let token = token.trim();
    let token = token.strip_prefix("Bot ").unwrap_or(token);

    let segment = token
        .split('.')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ClientError::InvalidToken("token is empty".to_string()))?;

    let decoded = TOKEN_ID_ENGINE
        .decode(segment)
        .map_err(|e| ClientError::InvalidToken(e.to_string()))?;
    let id = String::from_utf8(decoded)
        .map_err(|_| ClientError::InvalidToken("id segment is not UTF-8".to_string()))?;

    Snowflake::parse(&id).map_err(|e| ClientError::InvalidToken(e.to_string()))
}
