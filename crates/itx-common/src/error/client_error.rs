//! Client error types
//!
//! Errors surfaced to library callers: construction-time configuration
//! problems, registration conflicts, and responder failures.

use crate::config::ConfigError;

/// Library-wide error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Configuration errors
    #[error("Invalid bot token: {0}")]
    InvalidToken(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Registration conflicts
    #[error("Command \"{0}\" is already registered (name already in use)")]
    DuplicateCommand(String),

    #[error("Missing \"{0}\" command in registry (register the root command before its subcommands)")]
    UnknownParent(String),

    #[error("Subcommand \"{0}\" is already registered")]
    DuplicateSubCommand(String),

    #[error("Custom id \"{0}\" is already in use")]
    CustomIdInUse(String),

    // Responder errors
    #[error("Initial interaction response already sent")]
    ResponseAlreadySent,

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("REST request failed: {0}")]
    Rest(String),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl ClientError {
    /// Stable machine-readable code
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::InvalidPublicKey(_) => "INVALID_PUBLIC_KEY",
            Self::Config(_) => "CONFIG_ERROR",
            Self::DuplicateCommand(_) => "DUPLICATE_COMMAND",
            Self::UnknownParent(_) => "UNKNOWN_PARENT",
            Self::DuplicateSubCommand(_) => "DUPLICATE_SUBCOMMAND",
            Self::CustomIdInUse(_) => "CUSTOM_ID_IN_USE",
            Self::ResponseAlreadySent => "RESPONSE_ALREADY_SENT",
            Self::Encode(_) => "ENCODE_ERROR",
            Self::Rest(_) => "REST_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error came from a conflicting registration
    #[must_use]
    pub fn is_registration_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCommand(_)
                | Self::UnknownParent(_)
                | Self::DuplicateSubCommand(_)
                | Self::CustomIdInUse(_)
        )
    }

    /// Whether the error is fatal at construction time
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken(_) | Self::InvalidPublicKey(_) | Self::Config(_)
        )
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
