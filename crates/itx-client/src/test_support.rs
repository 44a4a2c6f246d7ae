//! Fakes shared by the client tests

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use ed25519_dalek::{Signer, SigningKey};
use itx_common::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use itx_rest::{Method, RestError, RestHandler};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub(crate) method: Method,
    pub(crate) route: String,
    pub(crate) body: Option<Value>,
}

/// Records every request and answers with canned bodies per route
#[derive(Default)]
pub(crate) struct RecordingRest {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<HashMap<String, Value>>,
}

impl RecordingRest {
    pub(crate) fn respond(&self, route: &str, body: Value) {
        self.responses.lock().insert(route.to_string(), body);
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Poll until at least `count` calls were recorded
    pub(crate) async fn wait_for_calls(&self, count: usize) -> Vec<RecordedCall> {
        for _ in 0..200 {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} REST calls, got {:?}", self.calls());
    }
}

#[async_trait]
impl RestHandler for RecordingRest {
    async fn request(
        &self,
        method: Method,
        route: &str,
        body: Option<Value>,
    ) -> Result<Vec<u8>, RestError> {
        self.calls.lock().push(RecordedCall {
            method,
            route: route.to_string(),
            body,
        });

        match self.responses.lock().get(route) {
            Some(body) => Ok(serde_json::to_vec(body)?),
            None => Ok(Vec::new()),
        }
    }
}

pub(crate) fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7; 32])
}

/// Bot token whose id segment decodes to application 2002
pub(crate) const TOKEN: &str = "MjAwMg.GxYzAb.signature-part";

/// POST `body` to `path`, signed the way the platform signs deliveries
pub(crate) fn signed_request(path: &str, body: &str) -> Request<Body> {
    let timestamp = "1700000000";
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    let signature = hex::encode(signing_key().sign(&message).to_bytes());

    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header(TIMESTAMP_HEADER, timestamp)
        .body(Body::from(body.to_string()))
        .unwrap()
}
