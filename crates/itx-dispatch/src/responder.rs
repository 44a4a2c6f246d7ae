//! Per-interaction reply capability
//!
//! Handlers never see the transport. Over HTTPS the first response becomes the
//! body of the pending request; over the gateway every response is a REST
//! callback.

use async_trait::async_trait;
use itx_common::{ClientError, ClientResult};
use itx_core::{Interaction, InteractionResponse, Snowflake};
use itx_rest::{RestHandler, RestHandlerExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Sends the initial response of one interaction
#[async_trait]
pub trait Responder: Send + Sync {
    /// Deliver the initial response; fails with `ResponseAlreadySent` on any later call
    async fn send(&self, response: InteractionResponse) -> ClientResult<()>;

    /// Whether the initial response has been sent
    fn is_sent(&self) -> bool;
}

/// Responder of an HTTPS delivery
///
/// The first response is handed to the waiting request as encoded bytes. Once
/// the request has given up on it (the receiver is closed), the response is
/// posted to the callback endpoint instead.
pub struct HttpResponder {
    interaction_id: Snowflake,
    token: String,
    rest: Arc<dyn RestHandler>,
    body: mpsc::Sender<Vec<u8>>,
    sent: AtomicBool,
}

impl HttpResponder {
    pub fn new(interaction: &Interaction, rest: Arc<dyn RestHandler>) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (body, receiver) = mpsc::channel(1);
        let responder = Self {
            interaction_id: interaction.id,
            token: interaction.token.clone(),
            rest,
            body,
            sent: AtomicBool::new(false),
        };
        (responder, receiver)
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn send(&self, response: InteractionResponse) -> ClientResult<()> {
        if self.sent.swap(true, Ordering::SeqCst) {
            return Err(ClientError::ResponseAlreadySent);
        }

        let bytes = serde_json::to_vec(&response)?;
        match self.body.try_send(bytes) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_) | TrySendError::Full(_)) => {
                tracing::debug!(
                    interaction_id = %self.interaction_id,
                    "Response deadline passed, using callback endpoint"
                );
                self.rest
                    .interaction_callback(self.interaction_id, &self.token, &response)
                    .await?;
                Ok(())
            }
        }
    }

    fn is_sent(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for HttpResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponder")
            .field("interaction_id", &self.interaction_id)
            .field("sent", &self.is_sent())
            .finish_non_exhaustive()
    }
}

/// Responder that always posts to the interaction callback endpoint
pub struct RestResponder {
    interaction_id: Snowflake,
    token: String,
    rest: Arc<dyn RestHandler>,
    sent: AtomicBool,
}

impl RestResponder {
    pub fn new(interaction: &Interaction, rest: Arc<dyn RestHandler>) -> Self {
        Self {
            interaction_id: interaction.id,
            token: interaction.token.clone(),
            rest,
            sent: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Responder for RestResponder {
    async fn send(&self, response: InteractionResponse) -> ClientResult<()> {
        if self.sent.swap(true, Ordering::SeqCst) {
            return Err(ClientError::ResponseAlreadySent);
        }

        self.rest
            .interaction_callback(self.interaction_id, &self.token, &response)
            .await?;
        Ok(())
    }

    fn is_sent(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RestResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestResponder")
            .field("interaction_id", &self.interaction_id)
            .field("sent", &self.is_sent())
            .finish_non_exhaustive()
    }
}
