//! Request parsing and request identifiers.
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Acknowledgment bodies are parsed as JSON whatever the `Content-Type`;
//!   every field is optional

use axum::http::{HeaderName, Request};
use serde::Deserialize;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::registry::AckRecord;

/// Header carrying the request identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Assigns a UUID v4 to requests arriving without an identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Query of `GET /firmware/latest`.
#[derive(Debug, Default, Deserialize)]
pub struct LatestQuery {
    #[serde(rename = "deviceType")]
    pub device_type: Option<String>,
}

/// Body of `POST /ack`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    pub device_id: Option<String>,
    pub device_type: Option<String>,
    pub version: Option<u64>,
    pub success: Option<bool>,
    pub info: Option<String>,
}

impl AckRequest {
    /// Parse a raw body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Fill in the defaults for absent fields.
    pub fn into_record(self, default_device_type: &str) -> AckRecord {
        AckRecord {
            device_id: self.device_id.unwrap_or_else(|| "unknown".to_string()),
            device_type: self
                .device_type
                .unwrap_or_else(|| default_device_type.to_string()),
            version: self.version.unwrap_or(0),
            success: self.success.unwrap_or(false),
            info: self.info.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gets_defaults() {
        let record = AckRequest::parse(b"{}").unwrap().into_record("esp32-s3");
        assert_eq!(
            record,
            AckRecord {
                device_id: "unknown".into(),
                device_type: "esp32-s3".into(),
                version: 0,
                success: false,
                info: String::new(),
            }
        );
    }

    #[test]
    fn test_full_body() {
        let body = br#"{"deviceId":"dev-1","deviceType":"esp32-c3","version":4,"success":true,"info":"ok"}"#;
        let record = AckRequest::parse(body).unwrap().into_record("esp32-s3");
        assert_eq!(record.device_id, "dev-1");
        assert_eq!(record.device_type, "esp32-c3");
        assert_eq!(record.version, 4);
        assert!(record.success);
        assert_eq!(record.info, "ok");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(AckRequest::parse(b"").is_err());
        assert!(AckRequest::parse(b"{\"version\": -1}").is_err());
        assert!(AckRequest::parse(b"{\"success\": \"yes\"}").is_err());
    }

    #[test]
    fn test_request_id_is_uuid() {
        let request = Request::new(());
        let id = MakeUuidRequestId.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }
}
