//! Authenticated session with a risk-tiered lifetime.

use serde::{Deserialize, Serialize};

use super::identity::IdentityClaim;
use super::risk::RiskTier;

/// Which exchange path established the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Risk-first single-shot exchange; session lifetime follows the tier.
    Enhanced,
    /// Token-first exchange with optional OTP step-up; fixed lifetime.
    Official,
    /// Phone-only fallback after an infrastructure failure; fixed lifetime.
    Legacy,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Enhanced => "enhanced",
            AuthMethod::Official => "official",
            AuthMethod::Legacy => "legacy",
        }
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "enhanced" => Ok(AuthMethod::Enhanced),
            "official" => Ok(AuthMethod::Official),
            "legacy" => Ok(AuthMethod::Legacy),
            _ => Err(format!("Invalid auth method: {}", s)),
        }
    }
}

/// Session lifetimes by risk tier for the enhanced path.
pub const HIGH_TIER_MAX_AGE_MS: i64 = 30 * 60 * 1000;
pub const MEDIUM_TIER_MAX_AGE_MS: i64 = 2 * 60 * 60 * 1000;
pub const LOW_TIER_MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Official and legacy sessions expire after a fixed hour regardless of tier.
pub const FIXED_MAX_AGE_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub identity_snapshot: IdentityClaim,
    /// The verified number, once the exchange (and any step-up) produced one.
    pub phone_number: Option<String>,
    pub risk_tier: RiskTier,
    pub established_at_ms: i64,
    pub auth_method: AuthMethod,
    pub warnings: Vec<String>,
}

impl Session {
    /// Maximum age before the session expires.
    pub fn max_age_ms(&self) -> i64 {
        match self.auth_method {
            AuthMethod::Enhanced => match self.risk_tier {
                RiskTier::High => HIGH_TIER_MAX_AGE_MS,
                RiskTier::Medium => MEDIUM_TIER_MAX_AGE_MS,
                RiskTier::Low => LOW_TIER_MAX_AGE_MS,
            },
            AuthMethod::Official | AuthMethod::Legacy => FIXED_MAX_AGE_MS,
        }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.established_at_ms
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) > self.max_age_ms()
    }
}
