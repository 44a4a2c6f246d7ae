//! Interaction endpoint and health check

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use itx_common::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use itx_core::{Interaction, InteractionResponse, InteractionType};
use itx_dispatch::{HttpResponder, Routing};
use serde::Serialize;
use std::sync::Arc;

use super::response::{ApiError, ApiResult, NoContent, RawJson};
use super::state::HttpState;

const SIGNATURE_HEX_LEN: usize = 128;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness check
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Signed interaction delivery
///
/// POST {path}
///
/// Answers with the handler's initial response when it arrives before the
/// deadline, otherwise with 204 and the responder switches to the REST callback.
pub async fn interaction_endpoint(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let signature = header_value(&headers, SIGNATURE_HEADER);
    let timestamp = header_value(&headers, TIMESTAMP_HEADER);
    if !is_signature_shaped(signature, timestamp) {
        return Err(ApiError::InvalidSignature);
    }

    let body = body?;
    if !state.verifier().verify(signature, timestamp, &body) {
        return Err(ApiError::InvalidSignature);
    }

    let interaction: Interaction = serde_json::from_slice(&body)?;
    if interaction.kind == InteractionType::Ping {
        tracing::debug!("Answering ping");
        return Ok(Json(InteractionResponse::pong()).into_response());
    }

    let interaction_id = interaction.id;
    let dispatcher = state.dispatcher();
    let (responder, mut replies) = HttpResponder::new(&interaction, Arc::clone(dispatcher.rest()));

    if dispatcher.dispatch(interaction, Arc::new(responder)).await == Routing::Unhandled {
        return Ok(NoContent.into_response());
    }

    match tokio::time::timeout(state.response_deadline(), replies.recv()).await {
        Ok(Some(reply)) => Ok(RawJson(reply).into_response()),
        // Every responder handle is gone without a reply
        Ok(None) => Ok(NoContent.into_response()),
        Err(_) => {
            replies.close();
            match replies.try_recv() {
                Ok(reply) => Ok(RawJson(reply).into_response()),
                Err(_) => {
                    tracing::debug!(
                        interaction_id = %interaction_id,
                        "No initial response before the deadline, answering 204"
                    );
                    Ok(NoContent.into_response())
                }
            }
        }
    }
}

/// Both headers present, with a hex-encoded 64-byte signature
fn is_signature_shaped(signature: &str, timestamp: &str) -> bool {
    !timestamp.is_empty()
        && signature.len() == SIGNATURE_HEX_LEN
        && signature.bytes().all(|b| b.is_ascii_hexdigit())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
