//! Test helpers for integration tests
//!
//! Provides a served interaction client, signed request helpers, and a mock
//! platform API for the REST callbacks.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use httpmock::MockServer;
use itx_client::{ClientConfig, HttpClient};
use itx_common::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fixtures::{public_key_hex, sign, TIMESTAMP, TOKEN};

pub const INTERACTION_PATH: &str = "/interactions";

/// Client configuration talking to `platform` with a short response deadline
pub fn test_config(platform: &MockServer, response_deadline: Duration) -> ClientConfig {
    let mut config = ClientConfig::new(TOKEN, Some(public_key_hex()));
    config.http.path = INTERACTION_PATH.to_string();
    config.http.response_deadline_ms = u64::try_from(response_deadline.as_millis()).unwrap_or(u64::MAX);
    config.rest.api_base_url = platform.base_url();
    config.rest.max_retries = 0;
    config
}

/// Interaction client served on an ephemeral local port
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve `bot` until the server is dropped or shut down
    pub async fn start(bot: HttpClient) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            bot.serve_on(listener, token).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            shutdown,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// POST an interaction signed with the test key
    pub async fn post_signed(&self, body: &Value) -> Result<Response> {
        let body = body.to_string();
        let signature = sign(TIMESTAMP, &body);
        self.post_with_signature(&body, &signature).await
    }

    pub async fn post_with_signature(&self, body: &str, signature: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), INTERACTION_PATH);
        Ok(self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, TIMESTAMP)
            .body(body.to_string())
            .send()
            .await?)
    }

    /// Stop serving and wait for the server task
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown.cancel();
        (&mut self.handle).await?;
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Poll until `count` returns at least `expected`, giving up after `timeout`
pub async fn wait_for_count(expected: usize, timeout: Duration, count: impl Fn() -> usize) -> usize {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let seen = count();
        if seen >= expected || tokio::time::Instant::now() >= deadline {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
