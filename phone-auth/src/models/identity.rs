//! Identity and phone claims collected from the host platform.

use serde::{Deserialize, Serialize};

use crate::utils::validation;

/// Gender codes accepted from the host identity API: 0 unspecified,
/// 1 male, 2 female.
pub const GENDER_CODES: [u8; 3] = [0, 1, 2];

/// How long collected identity data stays usable.
pub const FRESHNESS_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Profile claim returned by the host identity API. Never mutated;
/// discarded at the end of a single auth attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub platform_user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub birthday: Option<String>,
    pub gender_code: u8,
}

impl IdentityClaim {
    /// Structural validation: required fields present and the gender code
    /// is one the platform defines.
    pub fn is_structurally_valid(&self) -> bool {
        !self.platform_user_id.is_empty()
            && !self.display_name.is_empty()
            && GENDER_CODES.contains(&self.gender_code)
    }

    pub fn gender_specified(&self) -> bool {
        self.gender_code != 0
    }
}

/// What the host phone API handed back: an opaque token to exchange
/// server-side, or a number directly (full or masked).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhoneEvidence {
    ExchangeToken(String),
    DirectNumber(String),
}

impl PhoneEvidence {
    /// The digits of a directly claimed number, if we have one.
    pub fn direct_number(&self) -> Option<&str> {
        match self {
            PhoneEvidence::DirectNumber(n) => Some(n),
            PhoneEvidence::ExchangeToken(_) => None,
        }
    }

    pub fn is_masked(&self) -> bool {
        self.direct_number()
            .map(validation::is_masked)
            .unwrap_or(false)
    }

    /// The exchange token, when the platform returned one.
    pub fn exchange_token(&self) -> Option<&str> {
        match self {
            PhoneEvidence::ExchangeToken(t) => Some(t),
            PhoneEvidence::DirectNumber(_) => None,
        }
    }

    /// Key under which attempts against this claim are rate limited.
    /// A direct number keys by the number itself; token-only claims key
    /// by the token, the only stable handle available before exchange.
    pub fn rate_limit_key(&self) -> &str {
        match self {
            PhoneEvidence::DirectNumber(n) => n,
            PhoneEvidence::ExchangeToken(t) => t,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneClaim {
    pub evidence: PhoneEvidence,
    pub result_code: i32,
    pub result_message: String,
}

/// Everything one auth attempt knows about the caller. Owned by the
/// attempt; never persisted.
#[derive(Debug, Clone)]
pub struct CollectedIdentityData {
    pub identity: IdentityClaim,
    pub phone: PhoneClaim,
    pub collected_at_ms: i64,
    pub device_fingerprint: String,
    pub attempt_session_id: String,
}

impl CollectedIdentityData {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.collected_at_ms
    }

    /// Collected data goes stale 5 minutes after collection.
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) <= FRESHNESS_WINDOW_MS
    }
}
