//! Builds and checks the signed envelope around every backend call.

use auth_core::utils::signature::{generate_signature, verify_signature};
use serde_json::Value;

use crate::models::SignedEnvelope;
use crate::services::error::AuthError;
use crate::utils::NonceGenerator;

pub struct RequestSigner {
    secret: String,
    client_version: String,
    device_info: String,
    nonce: NonceGenerator,
}

impl RequestSigner {
    /// Construction probes the HMAC primitive once so a missing or unusable
    /// secret fails at startup instead of on the first live request.
    pub fn new(
        secret: String,
        client_version: String,
        device_info: String,
    ) -> Result<Self, AuthError> {
        generate_signature(&secret, 0, "probe", "probe").map_err(AuthError::from)?;

        Ok(Self {
            secret,
            client_version,
            device_info,
            nonce: NonceGenerator::new(),
        })
    }

    /// Sign a payload for the given timestamp and nonce. Deterministic for
    /// identical inputs.
    pub fn sign(&self, payload: &Value, timestamp_ms: i64, nonce: &str) -> Result<String, AuthError> {
        let canonical = canonical_json(payload);
        generate_signature(&self.secret, timestamp_ms, nonce, &canonical)
            .map_err(AuthError::from)
    }

    /// Check a signature the backend attached to a response body. Server
    /// signatures carry no nonce; comparison is constant-time.
    pub fn verify_server(
        &self,
        body: &str,
        signature: &str,
        timestamp_ms: i64,
    ) -> Result<bool, AuthError> {
        verify_signature(&self.secret, timestamp_ms, "", body, signature).map_err(AuthError::from)
    }

    /// Wrap a payload in a fresh envelope: new nonce, current timestamp,
    /// client version and device descriptor.
    pub fn envelope(&self, payload: Value) -> Result<SignedEnvelope, AuthError> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let nonce = self.nonce.generate();
        let signature = self.sign(&payload, timestamp_ms, &nonce)?;

        Ok(SignedEnvelope {
            payload,
            timestamp_ms,
            nonce,
            signature,
            client_version: self.client_version.clone(),
            device_info: self.device_info.clone(),
        })
    }
}

/// Stable string form of a JSON value: object keys sorted recursively, no
/// whitespace. Two payloads that differ only in key order sign identically.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
