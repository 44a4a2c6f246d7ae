//! Client connected through the gateway shard fleet

use itx_common::{ClientConfig, ClientResult};
use itx_gateway::{Connector, EventHandler, GatewayError, ShardManager, ShardStatus, TungsteniteConnector};
use itx_rest::{RestClient, RestHandler};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::ClientParts;
use crate::gateway::event_handler;

/// Bot receiving interactions over gateway websockets
pub struct GatewayClient {
    parts: ClientParts,
    connector: Arc<dyn Connector>,
    custom_events: Option<EventHandler>,
    manager: Mutex<Option<Arc<ShardManager>>>,
}

client_operations!(GatewayClient);

impl GatewayClient {
    /// Client with the reqwest REST collaborator and tungstenite websockets
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let rest = RestClient::new(&config.bot.token, &config.rest)?;
        Self::with_transport(config, Arc::new(rest), Arc::new(TungsteniteConnector))
    }

    pub fn with_transport(
        config: ClientConfig,
        rest: Arc<dyn RestHandler>,
        connector: Arc<dyn Connector>,
    ) -> ClientResult<Self> {
        Ok(Self {
            parts: ClientParts::new(config, rest)?,
            connector,
            custom_events: None,
            manager: Mutex::new(None),
        })
    }

    /// Receive every dispatch that is not an interaction
    pub fn with_event_handler(mut self, handler: EventHandler) -> Self {
        self.custom_events = Some(handler);
        self
    }

    /// Connect the shard fleet and block until it stops
    ///
    /// Returns the terminal close that ended the fleet, if any. A client can
    /// only be started once.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<(), GatewayError> {
        let manager = {
            let mut slot = self.manager.lock();
            if slot.is_some() {
                return Err(GatewayError::AlreadyStarted);
            }
            let manager = Arc::new(self.build_manager());
            *slot = Some(Arc::clone(&manager));
            manager
        };

        let gateway = &self.parts.config.gateway;
        manager
            .start(cancel, gateway.intents, gateway.shard_count)
            .await
    }

    fn build_manager(&self) -> ShardManager {
        let on_event = event_handler(
            Arc::new(self.parts.dispatcher.clone()),
            self.custom_events.clone(),
        );

        ShardManager::new(
            self.parts.config.bot.token.clone(),
            Arc::clone(&self.parts.rest),
            Arc::clone(&self.connector),
            on_event,
        )
        .with_identify_spacing(self.parts.config.gateway.identify_spacing())
    }

    /// Stop every shard; a no-op before [`Self::start`]
    pub async fn stop(&self) {
        let manager = self.manager.lock().clone();
        if let Some(manager) = manager {
            manager.stop().await;
        }
    }

    pub fn status(&self) -> HashMap<u16, ShardStatus> {
        self.manager
            .lock()
            .as_ref()
            .map(|manager| manager.status())
            .unwrap_or_default()
    }

    /// Send a raw gateway payload through one shard
    pub fn send(&self, shard_id: u16, payload: Value) {
        if let Some(manager) = self.manager.lock().as_ref() {
            manager.send(shard_id, payload);
        }
    }

    pub fn broadcast(&self, payload: &Value) {
        if let Some(manager) = self.manager.lock().as_ref() {
            manager.broadcast(payload);
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("registry", &self.parts.registry)
            .field("gateway", &self.parts.config.gateway)
            .field("started", &self.manager.lock().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingRest, TOKEN};
    use async_trait::async_trait;
    use itx_gateway::{FrameSink, FrameStream, SocketError};

    /// Connector that never gets used because the fleet never starts
    struct UnreachableConnector;

    #[async_trait]
    impl Connector for UnreachableConnector {
        async fn connect(
            &self,
            _url: &str,
        ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), SocketError> {
            Err(SocketError::Transport("no network in tests".to_string()))
        }
    }

    fn client(rest: &Arc<RecordingRest>) -> GatewayClient {
        GatewayClient::with_transport(
            ClientConfig::new(TOKEN, None),
            rest.clone(),
            Arc::new(UnreachableConnector),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_fails_without_gateway_config() {
        let rest = Arc::new(RecordingRest::default());
        let client = client(&rest);

        let err = client.start(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Fetch(_)));
        assert_eq!(rest.calls()[0].route, "/gateway/bot");
        assert!(client.status().is_empty());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let rest = Arc::new(RecordingRest::default());
        let client = client(&rest);

        let _ = client.start(&CancellationToken::new()).await;
        let err = client.start(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::AlreadyStarted));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let rest = Arc::new(RecordingRest::default());
        let client = client(&rest);

        client.stop().await;
        client.send(0, serde_json::json!({"op": 1}));
        assert!(rest.calls().is_empty());
    }

    #[test]
    fn test_public_key_not_required() {
        let rest = Arc::new(RecordingRest::default());
        assert_eq!(client(&rest).config().bot.public_key, None);
    }
}
