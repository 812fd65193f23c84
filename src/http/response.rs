//! Response bodies and error translation.
//!
//! Ledger failures become JSON error bodies; the process never crashes on
//! an upstream failure and a failed write is never reported as success.

use alloy::hex;
use alloy::primitives::TxHash;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::registry::FirmwareRecord;
use crate::workflows::digest::to_hex;

/// Body of `GET /firmware/latest`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestFirmwareResponse {
    pub device_type: String,
    pub version: u64,
    pub uri: String,
    pub sha256: String,
}

impl LatestFirmwareResponse {
    pub fn new(device_type: String, record: FirmwareRecord) -> Self {
        Self {
            device_type,
            version: record.version,
            sha256: to_hex(&record.digest),
            uri: record.uri,
        }
    }
}

/// Body of a successful `POST /ack`.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
    pub tx: String,
}

impl AckResponse {
    pub fn ok(tx_hash: TxHash) -> Self {
        Self {
            status: "ok",
            tx: hex::encode_prefixed(tx_hash),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
}

/// Failure of a gateway request.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Ledger(LedgerError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::NonceConflict(_)) => StatusCode::CONFLICT,
            ApiError::Ledger(e) if e.is_transport() => StatusCode::BAD_GATEWAY,
            ApiError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::Ledger(e) => write!(f, "{}", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            status: "error",
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
