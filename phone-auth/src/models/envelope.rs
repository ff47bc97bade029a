//! Signed request envelope for outbound backend calls.

use serde::{Deserialize, Serialize};

/// Header names for the signed-envelope transport.
pub mod headers {
    pub const X_SIGNATURE: &str = "X-Signature";
    pub const X_TIMESTAMP: &str = "X-Timestamp";
    pub const X_NONCE: &str = "X-Nonce";
    pub const X_CLIENT_VERSION: &str = "X-Client-Version";
    pub const X_DEVICE_INFO: &str = "X-Device-Info";
    pub const X_SERVER_SIGNATURE: &str = "X-Server-Signature";
    pub const X_SERVER_TIMESTAMP: &str = "X-Server-Timestamp";
}

/// One outbound request: the payload plus everything the backend needs to
/// check integrity and replay. The signature is deterministic for identical
/// (payload, timestamp, nonce); the nonce is single-use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub payload: serde_json::Value,
    pub timestamp_ms: i64,
    pub nonce: String,
    pub signature: String,
    pub client_version: String,
    pub device_info: String,
}
