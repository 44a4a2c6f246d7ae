//! Client served over the HTTPS interaction endpoint

use axum::Router;
use itx_common::{ClientConfig, ClientError, ClientResult, SignatureVerifier};
use itx_rest::{RestClient, RestHandler};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::ClientParts;
use crate::http::{create_app, HttpState};

/// Bot receiving interactions as signed HTTPS deliveries
pub struct HttpClient {
    parts: ClientParts,
    verifier: SignatureVerifier,
}

client_operations!(HttpClient);

impl HttpClient {
    /// Client with the reqwest REST collaborator
    ///
    /// Fails when the token or the public key is missing or malformed.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let rest = RestClient::new(&config.bot.token, &config.rest)?;
        Self::with_rest(config, Arc::new(rest))
    }

    pub fn with_rest(config: ClientConfig, rest: Arc<dyn RestHandler>) -> ClientResult<Self> {
        let verifier = SignatureVerifier::from_hex(config.require_public_key()?)?;
        let parts = ClientParts::new(config, rest)?;
        Ok(Self { parts, verifier })
    }

    /// Router serving the interaction endpoint and the health route
    pub fn router(&self) -> Router {
        let state = HttpState::new(
            Arc::new(self.parts.dispatcher.clone()),
            self.verifier.clone(),
            self.parts.config.http.response_deadline(),
        );
        create_app(state, &self.parts.config.http)
    }

    /// Bind the configured address and serve until `shutdown` is cancelled
    pub async fn serve(&self, shutdown: CancellationToken) -> ClientResult<()> {
        let address = self.parts.config.http.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            ClientError::internal(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {address}: {e}"),
            ))
        })?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve_on(&self, listener: TcpListener, shutdown: CancellationToken) -> ClientResult<()> {
        let address = listener.local_addr().map_err(ClientError::internal)?;
        tracing::info!(
            address = %address,
            path = %self.parts.config.http.path,
            "Serving interaction endpoint"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(ClientError::internal)?;

        tracing::info!("Interaction endpoint stopped");
        Ok(())
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("registry", &self.parts.registry)
            .field("http", &self.parts.config.http)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{signing_key, RecordingRest, TOKEN};
    use itx_core::{Command, InteractionContextType, MessageData, Snowflake};
    use itx_dispatch::{command_handler, CommandEntry, CommandFilter};
    use itx_rest::Method;
    use serde_json::json;

    fn config() -> ClientConfig {
        let public_key = hex::encode(signing_key().verifying_key().to_bytes());
        ClientConfig::new(TOKEN, Some(public_key))
    }

    fn client(rest: &Arc<RecordingRest>) -> HttpClient {
        HttpClient::with_rest(config(), rest.clone()).unwrap()
    }

    #[test]
    fn test_requires_public_key() {
        let err = HttpClient::with_rest(
            ClientConfig::new(TOKEN, None),
            Arc::new(RecordingRest::default()),
        )
        .unwrap_err();
        assert!(err.is_configuration());

        let err = HttpClient::with_rest(
            ClientConfig::new(TOKEN, Some("zz".to_string())),
            Arc::new(RecordingRest::default()),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidPublicKey(_)));
    }

    #[test]
    fn test_rejects_malformed_token() {
        let public_key = hex::encode(signing_key().verifying_key().to_bytes());
        let err = HttpClient::with_rest(
            ClientConfig::new("!!!.x.y", Some(public_key)),
            Arc::new(RecordingRest::default()),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidToken(_)));
    }

    #[test]
    fn test_application_id_from_token() {
        let rest = Arc::new(RecordingRest::default());
        assert_eq!(client(&rest).registry().application_id(), Snowflake::new(2002));
    }

    #[tokio::test]
    async fn test_sync_commands_globally_and_per_guild() {
        let rest = Arc::new(RecordingRest::default());
        for route in [
            "/applications/2002/commands",
            "/applications/2002/guilds/10/commands",
            "/applications/2002/guilds/11/commands",
        ] {
            rest.respond(route, json!([]));
        }
        let client = client(&rest).with_default_contexts(vec![InteractionContextType::BotDm]);
        for name in ["ping", "roll"] {
            client
                .registry()
                .register_command(CommandEntry::new(
                    Command::new(name, "test"),
                    command_handler(|_ctx| async {}),
                ))
                .unwrap();
        }

        client.sync_commands(&[], &CommandFilter::All).await.unwrap();
        client
            .sync_commands(
                &[Snowflake::new(10), Snowflake::new(11)],
                &CommandFilter::Only(vec!["roll".to_string()]),
            )
            .await
            .unwrap();

        let calls = rest.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].method, Method::PUT);
        assert_eq!(calls[0].route, "/applications/2002/commands");
        let names: Vec<_> = calls[0]
            .body
            .as_ref()
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|command| command["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("ping"), json!("roll")]);
        assert_eq!(calls[0].body.as_ref().unwrap()[0]["contexts"], json!([1]));

        assert_eq!(calls[1].route, "/applications/2002/guilds/10/commands");
        assert_eq!(calls[2].route, "/applications/2002/guilds/11/commands");
        assert_eq!(calls[2].body.as_ref().unwrap().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_private_message_opens_dm_first() {
        let rest = Arc::new(RecordingRest::default());
        rest.respond("/users/@me/channels", json!({"id": "88", "type": 1}));
        rest.respond(
            "/channels/88/messages",
            json!({"id": "501", "channel_id": "88", "content": "psst"}),
        );
        let client = client(&rest);

        let sent = client
            .send_private_message(Snowflake::new(9), &MessageData::text("psst"))
            .await
            .unwrap();
        assert_eq!(sent.id, Snowflake::new(501));
        assert_eq!(sent.channel_id, Snowflake::new(88));

        let calls = rest.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].body, Some(json!({"recipient_id": "9"})));
        assert_eq!(calls[1].route, "/channels/88/messages");
        assert_eq!(calls[1].body, Some(json!({"content": "psst"})));
    }

    #[tokio::test]
    async fn test_message_and_lookup_operations() {
        let rest = Arc::new(RecordingRest::default());
        rest.respond("/users/9", json!({"id": "9", "username": "ferris"}));
        rest.respond(
            "/guilds/10/members/9",
            json!({"user": {"id": "9", "username": "ferris"}, "roles": []}),
        );
        let client = client(&rest);
        let (channel, message) = (Snowflake::new(5), Snowflake::new(42));

        client
            .edit_message(channel, message, &MessageData::text("edited"))
            .await
            .unwrap();
        client.crosspost_message(channel, message).await.unwrap();
        client.delete_message(channel, message).await.unwrap();
        assert_eq!(client.fetch_user(Snowflake::new(9)).await.unwrap().username, "ferris");
        let member = client
            .fetch_member(Snowflake::new(10), Snowflake::new(9))
            .await
            .unwrap();
        assert_eq!(member.guild_id, Some(Snowflake::new(10)));
        client.ping().await.unwrap();

        let routes: Vec<_> = rest
            .calls()
            .into_iter()
            .map(|call| (call.method, call.route))
            .collect();
        assert_eq!(
            routes,
            vec![
                (Method::PATCH, "/channels/5/messages/42".to_string()),
                (Method::POST, "/channels/5/messages/42/crosspost".to_string()),
                (Method::DELETE, "/channels/5/messages/42".to_string()),
                (Method::GET, "/users/9".to_string()),
                (Method::GET, "/guilds/10/members/9".to_string()),
                (Method::GET, "/gateway".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let rest = Arc::new(RecordingRest::default());
        let client = client(&rest);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();

        shutdown.cancel();
        client.serve_on(listener, shutdown).await.unwrap();
    }
}
