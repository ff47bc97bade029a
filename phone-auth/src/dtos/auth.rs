//! Wire types for the backend token-exchange endpoints. All requests travel
//! inside the signed-envelope transport.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Token-conversion: opaque token (or claimed number) + attempt metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub device_fingerprint: String,
    pub attempt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertTokenResponse {
    pub success: bool,
    pub phone_number: String,
    pub masked: bool,
    pub requires_verification: bool,
}

/// Triggers delivery of a one-time code for the full number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullPhoneRequest {
    pub exchange_token: String,
    pub attempt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullPhoneResponse {
    pub requires_otp: bool,
    pub otp_length: u8,
    pub session_id: String,
}

/// The code is bound to the original exchange token and the challenge
/// session id so a stolen challenge cannot be replayed elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OtpVerifyRequest {
    #[validate(length(min = 1, message = "Session id is required"))]
    pub session_id: String,

    #[validate(length(min = 4, max = 8, message = "Code length out of range"))]
    pub otp_code: String,

    #[validate(length(min = 1, message = "Original token is required"))]
    pub original_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerifyResponse {
    pub full_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAuthRequest {
    pub phone_number: String,
    pub platform_user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub gender_code: u8,
    pub device_fingerprint: String,
    pub attempt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAuthResponse {
    pub user: AuthUser,
    pub tokens: TokenPair,
}

/// Single-shot exchange for the risk-first strategy: phone evidence,
/// identity snapshot and the full assessment in one round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedLoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub platform_user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub gender_code: u8,
    pub risk_score: u8,
    pub risk_tier: String,
    pub risk_factors: Vec<String>,
    pub device_fingerprint: String,
    pub attempt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedLoginResponse {
    pub user: AuthUser,
    pub tokens: TokenPair,
}

/// Minimal phone-only exchange used when the primary paths are down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyLoginRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyLoginResponse {
    pub user: AuthUser,
    pub tokens: TokenPair,
}
