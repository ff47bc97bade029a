//! Deterministic risk scoring and the hard consistency gate.

use crate::models::{CollectedIdentityData, RiskAssessment, RiskTier};
use crate::utils::validation;

/// Deductions start at this baseline.
const BASE_SCORE: i32 = 100;

/// Soft staleness: data older than this loses points but may still proceed.
const SOFT_STALE_MS: i64 = 2 * 60 * 1000;

pub struct RiskScorer;

impl RiskScorer {
    /// Score the attempt as of now.
    pub fn score(data: &CollectedIdentityData) -> RiskAssessment {
        Self::score_at(data, chrono::Utc::now().timestamp_millis())
    }

    /// Score the attempt as of `now_ms`. Identical inputs always produce
    /// an identical assessment.
    pub fn score_at(data: &CollectedIdentityData, now_ms: i64) -> RiskAssessment {
        let mut score = BASE_SCORE;
        let mut factors = Vec::new();

        if data.identity.avatar_url.is_none() {
            score -= 10;
            factors.push("avatar missing".to_string());
        }

        if data.identity.birthday.is_none() {
            score -= 5;
            factors.push("birthday missing".to_string());
        }

        if !data.identity.gender_specified() {
            score -= 5;
            factors.push("gender unspecified".to_string());
        }

        if data.age_ms(now_ms) > SOFT_STALE_MS {
            score -= 15;
            factors.push("identity data stale".to_string());
        }

        if let Some(number) = data.phone.evidence.direct_number() {
            if has_triple_repeat(number) {
                score -= 25;
                factors.push("repeated digit pattern in phone number".to_string());
            }
        }

        let score = score.clamp(0, 100) as u8;

        RiskAssessment {
            score,
            tier: Self::tier_for(score),
            factors,
        }
    }

    pub fn tier_for(score: u8) -> RiskTier {
        if score >= 85 {
            RiskTier::Low
        } else if score >= 70 {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    /// Hard gate, distinct from soft scoring: stale data, a malformed
    /// direct number, or a structurally broken identity claim fails the
    /// attempt outright.
    pub fn check_consistency(data: &CollectedIdentityData) -> bool {
        Self::check_consistency_at(data, chrono::Utc::now().timestamp_millis())
    }

    pub fn check_consistency_at(data: &CollectedIdentityData, now_ms: i64) -> bool {
        if !data.is_fresh_at(now_ms) {
            return false;
        }

        if let Some(number) = data.phone.evidence.direct_number() {
            if !validation::is_masked(number) && !validation::is_valid_mobile(number) {
                return false;
            }
        }

        data.identity.is_structurally_valid()
    }
}

/// Three identical consecutive digits anywhere in the number.
fn has_triple_repeat(number: &str) -> bool {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .windows(3)
        .any(|w| w[0] == w[1] && w[1] == w[2])
}
