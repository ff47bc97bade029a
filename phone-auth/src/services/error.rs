use auth_core::error::CoreError;
use serde::Serialize;
use thiserror::Error;

use crate::models::RiskTier;

/// Failure taxonomy for one authentication attempt.
///
/// Clone-able so the single-flight guard can hand the same outcome to every
/// joined caller.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Identity API unavailable")]
    IdentityUnavailable,

    #[error("Phone claim unavailable: {0}")]
    PhoneUnavailable(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Risk too high")]
    RiskTooHigh { tier: RiskTier, factors: Vec<String> },

    #[error("Rate limited")]
    RateLimited,

    #[error("Token exchange failed: {reason}")]
    TokenExchangeFailed { reason: String, infrastructure: bool },

    #[error("Server signature mismatch")]
    ServerSignatureInvalid,

    #[error("Verification code rejected")]
    OtpInvalid,

    #[error("Cancelled")]
    Cancelled,

    #[error("Session expired")]
    SessionExpired,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<CoreError> for AuthError {
    fn from(err: CoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl AuthError {
    /// Infrastructure failures (network, backend outage, store trouble) may
    /// fall back to the legacy exchange. Security rejections never do.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            AuthError::TokenExchangeFailed { infrastructure, .. } => *infrastructure,
            AuthError::Store(_) => true,
            _ => false,
        }
    }

    /// Generic message shown to the end user. Scoring and cryptographic
    /// detail stays in logs and the machine-readable report.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::Cancelled => "Sign-in was cancelled.",
            AuthError::RateLimited => "Too many attempts. Please try again later.",
            AuthError::SessionExpired => "Your session has expired. Please sign in again.",
            _ => "Sign-in failed. Please try again.",
        }
    }

    /// Machine-readable payload for telemetry and support tooling.
    pub fn failure_report(&self) -> FailureReport {
        match self {
            AuthError::RiskTooHigh { tier, factors } => FailureReport {
                kind: "risk_too_high",
                risk_level: Some(*tier),
                warnings: factors.clone(),
            },
            AuthError::ValidationFailed(reason) => FailureReport {
                kind: "validation_failed",
                risk_level: None,
                warnings: vec![reason.clone()],
            },
            AuthError::RateLimited => FailureReport {
                kind: "rate_limited",
                risk_level: None,
                warnings: Vec::new(),
            },
            AuthError::TokenExchangeFailed { reason, .. } => FailureReport {
                kind: "token_exchange_failed",
                risk_level: None,
                warnings: vec![reason.clone()],
            },
            AuthError::ServerSignatureInvalid => FailureReport {
                kind: "server_signature_invalid",
                risk_level: None,
                warnings: Vec::new(),
            },
            AuthError::IdentityUnavailable => FailureReport {
                kind: "identity_unavailable",
                risk_level: None,
                warnings: Vec::new(),
            },
            AuthError::PhoneUnavailable(reason) => FailureReport {
                kind: "phone_unavailable",
                risk_level: None,
                warnings: vec![reason.clone()],
            },
            AuthError::OtpInvalid => FailureReport {
                kind: "otp_invalid",
                risk_level: None,
                warnings: Vec::new(),
            },
            AuthError::Cancelled => FailureReport {
                kind: "cancelled",
                risk_level: None,
                warnings: Vec::new(),
            },
            AuthError::SessionExpired => FailureReport {
                kind: "session_expired",
                risk_level: None,
                warnings: Vec::new(),
            },
            AuthError::Store(reason) => FailureReport {
                kind: "store_error",
                risk_level: None,
                warnings: vec![reason.clone()],
            },
        }
    }
}

/// `{risk_level, warnings[]}` payload surfaced alongside the generic user
/// message.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskTier>,
    pub warnings: Vec<String>,
}
