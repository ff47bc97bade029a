//! Test helper module for phone-auth integration tests.
//!
//! Provides mock host-platform, backend and step-up implementations with
//! call counters, plus builders for a fully wired orchestrator.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use auth_core::kv::MemoryStore;
use phone_auth::dtos::{
    AuthUser, CompleteAuthRequest, CompleteAuthResponse, ConvertTokenRequest,
    ConvertTokenResponse, EnhancedLoginRequest, EnhancedLoginResponse, FullPhoneRequest,
    FullPhoneResponse, LegacyLoginRequest, LegacyLoginResponse, OtpVerifyRequest,
    OtpVerifyResponse, TokenPair,
};
use phone_auth::services::{
    AuthBackend, AuthError, AuthOrchestrator, HostPlatform, IdentityDataCollector,
    OrchestratorOptions, PlatformError, RateLimiter, RawIdentity, RawPhoneClaim, SessionStore,
    StepUpChallenge, StepUpHandler, StepUpOutcome,
};
use phone_auth::utils::DeviceProfile;

pub const GOOD_PHONE: &str = "13812345678";
pub const MASKED_PHONE: &str = "138****5678";

pub fn device() -> DeviceProfile {
    DeviceProfile {
        brand: "Pixel".to_string(),
        model: "Pixel 8".to_string(),
        platform: "android".to_string(),
        system: "Android 14".to_string(),
        language: "zh_CN".to_string(),
        pixel_ratio: 2.75,
        screen_width: 1080,
        screen_height: 2400,
    }
}

pub fn complete_identity() -> RawIdentity {
    RawIdentity {
        id: "u-1".to_string(),
        name: "Sam".to_string(),
        avatar: Some("https://cdn/avatar.png".to_string()),
        birthday: Some("1995-04-02".to_string()),
        gender: 1,
    }
}

pub fn sparse_identity() -> RawIdentity {
    RawIdentity {
        id: "u-1".to_string(),
        name: "Sam".to_string(),
        avatar: None,
        birthday: None,
        gender: 0,
    }
}

pub fn direct_phone_claim(number: &str) -> RawPhoneClaim {
    RawPhoneClaim {
        code: None,
        phone_number: Some(number.to_string()),
        err_code: 0,
        err_msg: String::new(),
    }
}

pub fn token_phone_claim(token: &str) -> RawPhoneClaim {
    RawPhoneClaim {
        code: Some(token.to_string()),
        phone_number: None,
        err_code: 0,
        err_msg: String::new(),
    }
}

pub struct MockPlatform {
    pub identity: Result<RawIdentity, PlatformError>,
    pub phone: Result<RawPhoneClaim, PlatformError>,
}

impl MockPlatform {
    pub fn new(identity: RawIdentity, phone: RawPhoneClaim) -> Self {
        Self {
            identity: Ok(identity),
            phone: Ok(phone),
        }
    }
}

#[async_trait]
impl HostPlatform for MockPlatform {
    async fn get_identity(&self) -> Result<RawIdentity, PlatformError> {
        self.identity.clone()
    }

    async fn get_phone_claim(&self) -> Result<RawPhoneClaim, PlatformError> {
        self.phone.clone()
    }
}

/// Scripted backend with per-endpoint call counters. `expected_otp` drives
/// the verify endpoint; everything else returns its configured result.
pub struct MockBackend {
    pub convert: Result<ConvertTokenResponse, AuthError>,
    pub full_phone: Result<FullPhoneResponse, AuthError>,
    pub expected_otp: String,
    pub complete: Result<CompleteAuthResponse, AuthError>,
    pub enhanced: Result<EnhancedLoginResponse, AuthError>,
    pub legacy: Result<LegacyLoginResponse, AuthError>,
    pub enhanced_delay_ms: u64,

    pub convert_calls: AtomicUsize,
    pub full_phone_calls: AtomicUsize,
    pub otp_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub enhanced_calls: AtomicUsize,
    pub legacy_calls: AtomicUsize,

    pub last_complete: Mutex<Option<CompleteAuthRequest>>,
    pub last_otp: Mutex<Option<OtpVerifyRequest>>,
}

pub fn tokens() -> TokenPair {
    TokenPair {
        access_token: "access-1".to_string(),
        refresh_token: Some("refresh-1".to_string()),
    }
}

pub fn user() -> AuthUser {
    AuthUser {
        user_id: "backend-u-1".to_string(),
        display_name: "Sam".to_string(),
        avatar_url: None,
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            convert: Ok(ConvertTokenResponse {
                success: true,
                phone_number: GOOD_PHONE.to_string(),
                masked: false,
                requires_verification: false,
            }),
            full_phone: Ok(FullPhoneResponse {
                requires_otp: true,
                otp_length: 6,
                session_id: "otp-sess-1".to_string(),
            }),
            expected_otp: "123456".to_string(),
            complete: Ok(CompleteAuthResponse {
                user: user(),
                tokens: tokens(),
            }),
            enhanced: Ok(EnhancedLoginResponse {
                user: user(),
                tokens: tokens(),
            }),
            legacy: Ok(LegacyLoginResponse {
                user: user(),
                tokens: tokens(),
            }),
            enhanced_delay_ms: 0,
            convert_calls: AtomicUsize::new(0),
            full_phone_calls: AtomicUsize::new(0),
            otp_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            enhanced_calls: AtomicUsize::new(0),
            legacy_calls: AtomicUsize::new(0),
            last_complete: Mutex::new(None),
            last_otp: Mutex::new(None),
        }
    }
}

impl MockBackend {
    pub fn total_calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
            + self.full_phone_calls.load(Ordering::SeqCst)
            + self.otp_calls.load(Ordering::SeqCst)
            + self.complete_calls.load(Ordering::SeqCst)
            + self.enhanced_calls.load(Ordering::SeqCst)
            + self.legacy_calls.load(Ordering::SeqCst)
    }

    pub fn with_masked_convert(mut self) -> Self {
        self.convert = Ok(ConvertTokenResponse {
            success: true,
            phone_number: MASKED_PHONE.to_string(),
            masked: true,
            requires_verification: true,
        });
        self
    }

    pub fn infrastructure_failure() -> AuthError {
        AuthError::TokenExchangeFailed {
            reason: "connect timeout".to_string(),
            infrastructure: true,
        }
    }

    pub fn security_rejection() -> AuthError {
        AuthError::TokenExchangeFailed {
            reason: "401 Unauthorized".to_string(),
            infrastructure: false,
        }
    }
}

#[async_trait]
impl AuthBackend for MockBackend {
    async fn convert_token(
        &self,
        _req: &ConvertTokenRequest,
    ) -> Result<ConvertTokenResponse, AuthError> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        self.convert.clone()
    }

    async fn request_full_phone(
        &self,
        _req: &FullPhoneRequest,
    ) -> Result<FullPhoneResponse, AuthError> {
        self.full_phone_calls.fetch_add(1, Ordering::SeqCst);
        self.full_phone.clone()
    }

    async fn verify_otp(&self, req: &OtpVerifyRequest) -> Result<OtpVerifyResponse, AuthError> {
        self.otp_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_otp.lock().unwrap() = Some(req.clone());
        if req.otp_code == self.expected_otp {
            Ok(OtpVerifyResponse {
                full_phone: GOOD_PHONE.to_string(),
            })
        } else {
            Err(AuthError::OtpInvalid)
        }
    }

    async fn complete_auth(
        &self,
        req: &CompleteAuthRequest,
    ) -> Result<CompleteAuthResponse, AuthError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_complete.lock().unwrap() = Some(req.clone());
        self.complete.clone()
    }

    async fn enhanced_login(
        &self,
        _req: &EnhancedLoginRequest,
    ) -> Result<EnhancedLoginResponse, AuthError> {
        self.enhanced_calls.fetch_add(1, Ordering::SeqCst);
        if self.enhanced_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.enhanced_delay_ms)).await;
        }
        self.enhanced.clone()
    }

    async fn legacy_login(
        &self,
        _req: &LegacyLoginRequest,
    ) -> Result<LegacyLoginResponse, AuthError> {
        self.legacy_calls.fetch_add(1, Ordering::SeqCst);
        self.legacy.clone()
    }
}

/// Hands out scripted step-up outcomes in order; repeats the last one when
/// the script runs dry. Records every challenge it receives.
pub struct MockStepUp {
    outcomes: Mutex<Vec<StepUpOutcome>>,
    pub challenges: Mutex<Vec<StepUpChallenge>>,
}

impl MockStepUp {
    pub fn with_code(code: &str) -> Self {
        Self {
            outcomes: Mutex::new(vec![StepUpOutcome::Code(code.to_string())]),
            challenges: Mutex::new(Vec::new()),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            outcomes: Mutex::new(vec![StepUpOutcome::Cancelled]),
            challenges: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sequence(outcomes: Vec<StepUpOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            challenges: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StepUpHandler for MockStepUp {
    async fn on_challenge(&self, challenge: StepUpChallenge) -> StepUpOutcome {
        self.challenges.lock().unwrap().push(challenge);
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            outcomes.remove(0)
        } else {
            outcomes[0].clone()
        }
    }
}

pub struct Harness {
    pub orchestrator: AuthOrchestrator,
    pub backend: Arc<MockBackend>,
    pub step_up: Arc<MockStepUp>,
    pub store: Arc<MemoryStore>,
}

pub fn harness(platform: MockPlatform, backend: MockBackend, step_up: MockStepUp) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(backend);
    let step_up = Arc::new(step_up);

    let orchestrator = AuthOrchestrator::new(
        IdentityDataCollector::new(Arc::new(platform), device()),
        RateLimiter::new(store.clone()),
        backend.clone(),
        SessionStore::new(store.clone()),
        step_up.clone(),
        OrchestratorOptions::default(),
    );

    Harness {
        orchestrator,
        backend,
        step_up,
        store,
    }
}

pub fn default_harness() -> Harness {
    harness(
        MockPlatform::new(complete_identity(), direct_phone_claim(GOOD_PHONE)),
        MockBackend::default(),
        MockStepUp::with_code("123456"),
    )
}
