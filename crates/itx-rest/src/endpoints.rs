//! Typed platform endpoints on top of [`RestHandler`]

use async_trait::async_trait;
use itx_core::{
    Command, InteractionResponse, Member, Message, MessageData, PartialChannel, Snowflake, User,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::client::RestHandler;
use crate::error::RestError;
use crate::models::GatewayBot;

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, RestError> {
    Ok(serde_json::to_value(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RestError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Endpoint helpers available on every [`RestHandler`]
#[async_trait]
pub trait RestHandlerExt: RestHandler {
    /// Send the initial response to an interaction
    async fn interaction_callback(
        &self,
        interaction_id: Snowflake,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<(), RestError> {
        let route = format!("/interactions/{interaction_id}/{token}/callback");
        self.request(Method::POST, &route, Some(encode(response)?))
            .await?;
        Ok(())
    }

    async fn edit_original_response(
        &self,
        application_id: Snowflake,
        token: &str,
        message: &MessageData,
    ) -> Result<(), RestError> {
        let route = format!("/webhooks/{application_id}/{token}/messages/@original");
        self.request(Method::PATCH, &route, Some(encode(message)?))
            .await?;
        Ok(())
    }

    async fn delete_original_response(
        &self,
        application_id: Snowflake,
        token: &str,
    ) -> Result<(), RestError> {
        let route = format!("/webhooks/{application_id}/{token}/messages/@original");
        self.request(Method::DELETE, &route, None).await?;
        Ok(())
    }

    /// Post a follow-up message and return it as created
    async fn create_follow_up(
        &self,
        application_id: Snowflake,
        token: &str,
        message: &MessageData,
    ) -> Result<Message, RestError> {
        let route = format!("/webhooks/{application_id}/{token}");
        let bytes = self
            .request(Method::POST, &route, Some(encode(message)?))
            .await?;
        decode(&bytes)
    }

    async fn edit_follow_up(
        &self,
        application_id: Snowflake,
        token: &str,
        message_id: Snowflake,
        message: &MessageData,
    ) -> Result<(), RestError> {
        let route = format!("/webhooks/{application_id}/{token}/messages/{message_id}");
        self.request(Method::PATCH, &route, Some(encode(message)?))
            .await?;
        Ok(())
    }

    async fn delete_follow_up(
        &self,
        application_id: Snowflake,
        token: &str,
        message_id: Snowflake,
    ) -> Result<(), RestError> {
        let route = format!("/webhooks/{application_id}/{token}/messages/{message_id}");
        self.request(Method::DELETE, &route, None).await?;
        Ok(())
    }

    /// Replace the application's command set, globally or for one guild
    async fn bulk_overwrite_commands(
        &self,
        application_id: Snowflake,
        guild_id: Option<Snowflake>,
        commands: &[Command],
    ) -> Result<Vec<Command>, RestError> {
        let route = match guild_id {
            Some(guild_id) => format!("/applications/{application_id}/guilds/{guild_id}/commands"),
            None => format!("/applications/{application_id}/commands"),
        };
        let bytes = self
            .request(Method::PUT, &route, Some(encode(commands)?))
            .await?;
        decode(&bytes)
    }

    /// Post a message to a channel the bot can write to
    async fn create_message(
        &self,
        channel_id: Snowflake,
        message: &MessageData,
    ) -> Result<Message, RestError> {
        let route = format!("/channels/{channel_id}/messages");
        let bytes = self
            .request(Method::POST, &route, Some(encode(message)?))
            .await?;
        decode(&bytes)
    }

    async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        message: &MessageData,
    ) -> Result<(), RestError> {
        let route = format!("/channels/{channel_id}/messages/{message_id}");
        self.request(Method::PATCH, &route, Some(encode(message)?))
            .await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<(), RestError> {
        let route = format!("/channels/{channel_id}/messages/{message_id}");
        self.request(Method::DELETE, &route, None).await?;
        Ok(())
    }

    /// Publish a message from an announcement channel to its followers
    async fn crosspost_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<(), RestError> {
        let route = format!("/channels/{channel_id}/messages/{message_id}/crosspost");
        self.request(Method::POST, &route, None).await?;
        Ok(())
    }

    /// Open (or fetch the existing) DM channel with a user
    ///
    /// This endpoint is heavily rate limited; reuse the returned channel id.
    async fn create_dm_channel(&self, user_id: Snowflake) -> Result<PartialChannel, RestError> {
        let body = json!({"recipient_id": user_id});
        let bytes = self
            .request(Method::POST, "/users/@me/channels", Some(body))
            .await?;
        decode(&bytes)
    }

    async fn fetch_user(&self, user_id: Snowflake) -> Result<User, RestError> {
        let bytes = self
            .request(Method::GET, &format!("/users/{user_id}"), None)
            .await?;
        decode(&bytes)
    }

    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> Result<Member, RestError> {
        let route = format!("/guilds/{guild_id}/members/{user_id}");
        let bytes = self.request(Method::GET, &route, None).await?;
        let mut member: Member = decode(&bytes)?;
        member.guild_id = Some(guild_id);
        Ok(member)
    }

    /// Unauthenticated-cost round trip used to measure API latency
    async fn gateway(&self) -> Result<(), RestError> {
        self.request(Method::GET, "/gateway", None).await?;
        Ok(())
    }

    /// Recommended shard count, gateway URL and identify concurrency
    async fn gateway_bot(&self) -> Result<GatewayBot, RestError> {
        let bytes = self.request(Method::GET, "/gateway/bot", None).await?;
        decode(&bytes)
    }
}

impl<T: RestHandler + ?Sized> RestHandlerExt for T {}
