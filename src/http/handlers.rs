//! Gateway request handlers.
//!
//! Every handler records `gateway_requests_total` and the request latency
//! before returning, whatever the outcome.

use std::time::Instant;

use alloy::hex;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::http::request::{AckRequest, LatestQuery, X_REQUEST_ID};
use crate::http::response::{AckResponse, ApiError, LatestFirmwareResponse};
use crate::http::server::AppState;
use crate::ledger::Receipt;
use crate::observability::metrics;

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn finish(route: &'static str, started: Instant, response: Response) -> Response {
    metrics::record_request(route, response.status().as_u16(), started);
    response
}

/// `GET /firmware/latest?deviceType=<class>`
pub async fn latest_firmware(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LatestQuery>,
) -> Response {
    let started = Instant::now();
    let request_id = request_id(&headers);
    // Only an absent parameter selects the default; an empty one is a class.
    let device_type = query
        .device_type
        .unwrap_or_else(|| state.default_device_type.clone());

    let response = match state.registry.get_latest(&device_type).await {
        Ok(record) => {
            tracing::debug!(
                request_id = %request_id,
                device_type = %device_type,
                version = record.version,
                "Latest firmware served"
            );
            Json(LatestFirmwareResponse::new(device_type, record)).into_response()
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                device_type = %device_type,
                error = %e,
                "Latest firmware lookup failed"
            );
            ApiError::from(e).into_response()
        }
    };

    finish("/firmware/latest", started, response)
}

/// `POST /ack`
///
/// The body is read as JSON regardless of its declared content type. The
/// response is sent only after the acknowledgment has a successful receipt.
pub async fn ack(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();
    let request_id = request_id(&headers);

    let record = match AckRequest::parse(&body) {
        Ok(request) => request.into_record(&state.default_device_type),
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Rejected acknowledgment body");
            return finish("/ack", started, ApiError::BadRequest(e.to_string()).into_response());
        }
    };

    let result = state
        .registry
        .ack(&record, &state.ack_policy)
        .await
        .and_then(Receipt::ensure_success);

    let response = match result {
        Ok(receipt) => {
            tracing::info!(
                request_id = %request_id,
                device_id = %record.device_id,
                device_type = %record.device_type,
                version = record.version,
                success = record.success,
                tx_hash = %receipt.tx_hash,
                gas_used = receipt.gas_used,
                "Acknowledgment recorded"
            );
            Json(AckResponse::ok(receipt.tx_hash)).into_response()
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                device_id = %record.device_id,
                error = %e,
                "Acknowledgment failed"
            );
            ApiError::from(e).into_response()
        }
    };

    finish("/ack", started, response)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let client = state.registry.client();

    let response = if client.is_healthy().await {
        Json(json!({
            "status": "ok",
            "chainId": client.chain_id(),
            "registry": hex::encode_prefixed(state.registry.address()),
        }))
        .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "error": "ledger endpoint unreachable",
            })),
        )
            .into_response()
    };

    finish("/health", started, response)
}
