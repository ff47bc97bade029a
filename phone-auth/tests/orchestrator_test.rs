//! End-to-end orchestrator flows against mocked platform and backend.

mod common;

use common::*;
use phone_auth::services::{AuthError, AuthStrategy, StepUpOutcome};
use phone_auth::{AuthMethod, RiskTier};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_enhanced_login_with_complete_fresh_data() {
    // Scenario: avatar, birthday and gender present, data collected moments
    // ago, no repeating digits -> low tier, 24h session
    let h = default_harness();

    let session = h.orchestrator.login(AuthStrategy::Enhanced).await.unwrap();

    assert_eq!(session.risk_tier, RiskTier::Low);
    assert_eq!(session.auth_method, AuthMethod::Enhanced);
    assert_eq!(session.max_age_ms(), 24 * 60 * 60 * 1000);
    assert_eq!(h.backend.enhanced_calls.load(Ordering::SeqCst), 1);
    assert!(h.orchestrator.is_authenticated().await.unwrap());
}

#[tokio::test]
async fn test_official_login_without_masking_skips_step_up() {
    let h = default_harness();

    let session = h.orchestrator.login(AuthStrategy::Official).await.unwrap();

    assert_eq!(session.auth_method, AuthMethod::Official);
    assert_eq!(session.phone_number, Some(GOOD_PHONE.to_string()));
    // Fixed one-hour lifetime on the official path
    assert_eq!(session.max_age_ms(), 60 * 60 * 1000);
    assert_eq!(h.backend.full_phone_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.otp_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.complete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_masked_phone_triggers_step_up_and_unmasks() {
    // Scenario: exchange response is masked -> step-up -> correct 6-digit
    // code -> session holds the unmasked phone
    let h = harness(
        MockPlatform::new(complete_identity(), token_phone_claim("opaque-token")),
        MockBackend::default().with_masked_convert(),
        MockStepUp::with_code("123456"),
    );

    let session = h.orchestrator.login(AuthStrategy::Official).await.unwrap();

    assert_eq!(session.phone_number, Some(GOOD_PHONE.to_string()));

    // The challenge surfaced the backend-issued session id and code length
    let challenges = h.step_up.challenges.lock().unwrap();
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0].session_id, "otp-sess-1");
    assert_eq!(challenges[0].code_length, 6);
    drop(challenges);

    // The verify call was bound to the original exchange token
    let otp_req = h.backend.last_otp.lock().unwrap().clone().unwrap();
    assert_eq!(otp_req.original_token, "opaque-token");
    assert_eq!(otp_req.session_id, "otp-sess-1");

    // Completion used the unmasked number
    let complete_req = h.backend.last_complete.lock().unwrap().clone().unwrap();
    assert_eq!(complete_req.phone_number, GOOD_PHONE);
}

#[tokio::test]
async fn test_wrong_codes_exhaust_into_otp_invalid() {
    let h = harness(
        MockPlatform::new(complete_identity(), token_phone_claim("opaque-token")),
        MockBackend::default().with_masked_convert(),
        MockStepUp::with_code("000000"),
    );

    let err = h.orchestrator.login(AuthStrategy::Official).await.unwrap_err();

    assert!(matches!(err, AuthError::OtpInvalid));
    // Three attempts allowed, all consumed
    assert_eq!(h.backend.otp_calls.load(Ordering::SeqCst), 3);
    assert_eq!(h.backend.complete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retry_after_one_wrong_code_succeeds() {
    let h = harness(
        MockPlatform::new(complete_identity(), token_phone_claim("opaque-token")),
        MockBackend::default().with_masked_convert(),
        MockStepUp::with_sequence(vec![
            StepUpOutcome::Code("999999".to_string()),
            StepUpOutcome::Code("123456".to_string()),
        ]),
    );

    let session = h.orchestrator.login(AuthStrategy::Official).await.unwrap();
    assert_eq!(session.phone_number, Some(GOOD_PHONE.to_string()));
    assert_eq!(h.backend.otp_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancellation_aborts_verification() {
    let h = harness(
        MockPlatform::new(complete_identity(), token_phone_claim("opaque-token")),
        MockBackend::default().with_masked_convert(),
        MockStepUp::cancelling(),
    );

    let err = h.orchestrator.login(AuthStrategy::Official).await.unwrap_err();

    assert!(matches!(err, AuthError::Cancelled));
    assert_eq!(h.backend.otp_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.complete_calls.load(Ordering::SeqCst), 0);
    assert!(!h.orchestrator.is_authenticated().await.unwrap());
}

#[tokio::test]
async fn test_high_risk_fails_with_zero_network_calls() {
    // Sparse identity plus a repeating-digit number: 100-10-5-5-25 = 55
    let h = harness(
        MockPlatform::new(sparse_identity(), direct_phone_claim("13000045678")),
        MockBackend::default(),
        MockStepUp::with_code("123456"),
    );

    let err = h.orchestrator.login(AuthStrategy::Enhanced).await.unwrap_err();

    match err {
        AuthError::RiskTooHigh { tier, factors } => {
            assert_eq!(tier, RiskTier::High);
            assert!(!factors.is_empty());
        }
        other => panic!("expected RiskTooHigh, got {:?}", other),
    }
    assert_eq!(h.backend.total_calls(), 0);
}

#[tokio::test]
async fn test_medium_risk_proceeds_to_exchange() {
    // Missing avatar, birthday and gender on fresh data: 100-10-5-5 = 80
    let h = harness(
        MockPlatform::new(sparse_identity(), direct_phone_claim(GOOD_PHONE)),
        MockBackend::default(),
        MockStepUp::with_code("123456"),
    );

    let session = h.orchestrator.login(AuthStrategy::Enhanced).await.unwrap();

    assert_eq!(session.risk_tier, RiskTier::Medium);
    assert_eq!(h.backend.enhanced_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rate_limit_rejects_fourth_attempt_before_network() {
    // Scenario: three prior acquisitions for this phone inside the window
    let h = default_harness();

    let limiter = phone_auth::RateLimiter::new(h.store.clone());
    for _ in 0..3 {
        assert!(limiter.try_acquire(GOOD_PHONE).await.unwrap());
    }

    let err = h.orchestrator.login(AuthStrategy::Enhanced).await.unwrap_err();

    assert!(matches!(err, AuthError::RateLimited));
    assert_eq!(h.backend.total_calls(), 0);
}

#[tokio::test]
async fn test_infrastructure_failure_falls_back_to_legacy() {
    let mut backend = MockBackend::default();
    backend.enhanced = Err(MockBackend::infrastructure_failure());
    let h = harness(
        MockPlatform::new(complete_identity(), direct_phone_claim(GOOD_PHONE)),
        backend,
        MockStepUp::with_code("123456"),
    );

    let session = h.orchestrator.login(AuthStrategy::Enhanced).await.unwrap();

    assert_eq!(session.auth_method, AuthMethod::Legacy);
    assert_eq!(session.risk_tier, RiskTier::Medium);
    assert_eq!(session.max_age_ms(), 60 * 60 * 1000);
    assert!(!session.warnings.is_empty());
    assert_eq!(h.backend.legacy_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_security_rejection_never_falls_back() {
    let mut backend = MockBackend::default();
    backend.enhanced = Err(MockBackend::security_rejection());
    let h = harness(
        MockPlatform::new(complete_identity(), direct_phone_claim(GOOD_PHONE)),
        backend,
        MockStepUp::with_code("123456"),
    );

    let err = h.orchestrator.login(AuthStrategy::Enhanced).await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::TokenExchangeFailed {
            infrastructure: false,
            ..
        }
    ));
    assert_eq!(h.backend.legacy_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fallback_requires_a_direct_number() {
    // Token-only evidence cannot drive the phone-only legacy exchange; the
    // original infrastructure error surfaces instead
    let mut backend = MockBackend::default();
    backend.convert = Err(MockBackend::infrastructure_failure());
    let h = harness(
        MockPlatform::new(complete_identity(), token_phone_claim("opaque-token")),
        backend,
        MockStepUp::with_code("123456"),
    );

    let err = h.orchestrator.login(AuthStrategy::Official).await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::TokenExchangeFailed {
            infrastructure: true,
            ..
        }
    ));
    assert_eq!(h.backend.legacy_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_logins_share_one_attempt() {
    let mut backend = MockBackend::default();
    backend.enhanced_delay_ms = 50;
    let h = harness(
        MockPlatform::new(complete_identity(), direct_phone_claim(GOOD_PHONE)),
        backend,
        MockStepUp::with_code("123456"),
    );

    let (a, b) = tokio::join!(
        h.orchestrator.login(AuthStrategy::Enhanced),
        h.orchestrator.login(AuthStrategy::Enhanced)
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(a.unwrap().access_token, b.unwrap().access_token);
    // One exchange served both callers
    assert_eq!(h.backend.enhanced_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_logout_clears_the_session() {
    let h = default_harness();
    h.orchestrator.login(AuthStrategy::Enhanced).await.unwrap();
    assert!(h.orchestrator.is_authenticated().await.unwrap());

    h.orchestrator.logout().await.unwrap();
    assert!(!h.orchestrator.is_authenticated().await.unwrap());
}

#[tokio::test]
async fn test_failed_conversion_is_a_security_rejection() {
    let mut backend = MockBackend::default();
    backend.convert = Ok(phone_auth::dtos::ConvertTokenResponse {
        success: false,
        phone_number: String::new(),
        masked: false,
        requires_verification: false,
    });
    let h = harness(
        MockPlatform::new(complete_identity(), direct_phone_claim(GOOD_PHONE)),
        backend,
        MockStepUp::with_code("123456"),
    );

    let err = h.orchestrator.login(AuthStrategy::Official).await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::TokenExchangeFailed {
            infrastructure: false,
            ..
        }
    ));
    assert_eq!(h.backend.legacy_calls.load(Ordering::SeqCst), 0);
}
