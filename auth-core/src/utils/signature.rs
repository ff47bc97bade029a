use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CoreError;

type HmacSha256 = Hmac<Sha256>;

/// Signing secrets shorter than this are refused outright. There is no
/// weaker fallback primitive; a usable HMAC key is a startup requirement.
pub const MIN_SECRET_LEN: usize = 16;

/// Generate HMAC-SHA256 signature.
///
/// Format: HMAC-SHA256(timestamp|nonce|payload_hash, secret), base64-encoded.
pub fn generate_signature(
    secret: &str,
    timestamp: i64,
    nonce: &str,
    payload: &str,
) -> Result<String, CoreError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(CoreError::SigningError(format!(
            "signing secret must be at least {} bytes",
            MIN_SECRET_LEN
        )));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CoreError::SigningError(format!("invalid key length: {}", e)))?;

    // Hash the payload first so the MAC input stays fixed-shape
    let payload_hash = hex::encode(Sha256::digest(payload.as_bytes()));

    let material = format!("{}|{}|{}", timestamp, nonce, payload_hash);

    mac.update(material.as_bytes());
    let result = mac.finalize();

    Ok(BASE64.encode(result.into_bytes()))
}

/// Verify an HMAC-SHA256 signature using constant-time comparison.
pub fn verify_signature(
    secret: &str,
    timestamp: i64,
    nonce: &str,
    payload: &str,
    signature: &str,
) -> Result<bool, CoreError> {
    let expected_signature = generate_signature(secret, timestamp, nonce, payload)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}
