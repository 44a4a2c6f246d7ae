//! REST client with retries and rate-limit handling
//!
//! Requests are retried on transport errors and 429 responses, with a linear
//! backoff between attempts. A global 429 locks the whole client until the
//! platform's retry-after has elapsed.

use async_trait::async_trait;
use itx_common::RestConfig;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::RestError;

pub const USER_AGENT: &str = concat!("DiscordBot (itx, ", env!("CARGO_PKG_VERSION"), ")");

const BASE_BACKOFF: Duration = Duration::from_millis(250);
const MIN_RETRY_AFTER: Duration = Duration::from_millis(250);

/// Raw access to the platform REST API
///
/// Returns the response body; empty for `204 No Content`.
#[async_trait]
pub trait RestHandler: Send + Sync {
    async fn request(
        &self,
        method: Method,
        route: &str,
        body: Option<Value>,
    ) -> Result<Vec<u8>, RestError>;
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    #[serde(default)]
    retry_after: f64,
    #[serde(default)]
    global: bool,
}

/// reqwest-backed [`RestHandler`]
#[derive(Debug)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
    max_retries: u8,
    locked_until: RwLock<Option<Instant>>,
}

impl RestClient {
    pub fn new(token: &str, config: &RestConfig) -> Result<Self, RestError> {
        let token = token.trim();
        let authorization = if token.starts_with("Bot ") {
            token.to_string()
        } else {
            format!("Bot {token}")
        };

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(256)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            authorization,
            max_retries: config.max_retries.max(1),
            locked_until: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn wait_for_global_lock(&self) {
        let locked_until = *self.locked_until.read();
        if let Some(until) = locked_until {
            if until > Instant::now() {
                tracing::debug!(
                    wait_ms = (until - Instant::now()).as_millis() as u64,
                    "Waiting out global rate limit"
                );
                tokio::time::sleep_until(until).await;
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        route: &str,
        body: Option<&Value>,
    ) -> Result<Vec<u8>, RestError> {
        let url = format!("{}{}", self.base_url, route);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, &self.authorization);

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let parsed: Option<RateLimitBody> = serde_json::from_slice(&bytes).ok();
            let global = parsed.as_ref().is_some_and(|body| body.global);
            let retry_after = retry_after(&headers, parsed.as_ref());

            if global {
                *self.locked_until.write() = Some(Instant::now() + retry_after);
            }

            tracing::warn!(
                %method,
                route,
                retry_after_ms = retry_after.as_millis() as u64,
                global,
                "Rate limited"
            );
            tokio::time::sleep(retry_after).await;

            return Err(RestError::RateLimited {
                retry_after_ms: retry_after.as_millis() as u64,
                global,
            });
        }

        if !status.is_success() {
            return Err(RestError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes.to_vec())
    }
}

/// Retry-After header first, then the JSON body, never below the floor
fn retry_after(headers: &HeaderMap, body: Option<&RateLimitBody>) -> Duration {
    let from_header = headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0);

    let from_body = body
        .map(|body| body.retry_after)
        .filter(|secs| secs.is_finite() && *secs > 0.0);

    from_header
        .or(from_body)
        .map_or(MIN_RETRY_AFTER, Duration::from_secs_f64)
        .max(MIN_RETRY_AFTER)
}

#[async_trait]
impl RestHandler for RestClient {
    async fn request(
        &self,
        method: Method,
        route: &str,
        body: Option<Value>,
    ) -> Result<Vec<u8>, RestError> {
        self.wait_for_global_lock().await;

        for attempt in 0..self.max_retries {
            match self.attempt(&method, route, body.as_ref()).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) if err.is_retryable() => {
                    tracing::debug!(%method, route, attempt, error = %err, "Retrying request");
                }
                Err(err) => return Err(err),
            }

            tokio::time::sleep(BASE_BACKOFF * (u32::from(attempt) + 1)).await;
        }

        Err(RestError::RetriesExhausted {
            method: method.to_string(),
            route: route.to_string(),
            attempts: self.max_retries,
        })
    }
}
