//! Drives the multi-step exchange protocol: collect, gate, throttle,
//! exchange, optional step-up, complete, persist.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{FutureExt, Shared};
use validator::Validate;

use crate::config::AuthConfig;
use crate::dtos::{
    CompleteAuthRequest, ConvertTokenRequest, EnhancedLoginRequest, FullPhoneRequest,
    LegacyLoginRequest, OtpVerifyRequest,
};
use crate::models::{AuthMethod, CollectedIdentityData, RiskAssessment, RiskTier, Session};
use crate::services::collector::{HostPlatform, IdentityDataCollector};
use crate::services::error::AuthError;
use crate::services::rate_limit::RateLimiter;
use crate::services::risk::RiskScorer;
use crate::services::secure_client::{AuthBackend, HttpAuthBackend, SecureRequestClient};
use crate::services::session::SessionStore;
use crate::services::signing::RequestSigner;
use crate::utils::{device_fingerprint, validation, DeviceProfile};
use auth_core::kv::{KeyValueStore, RedisStore};

/// Which exchange path to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Risk-first: gate locally, then one enhanced-login round-trip.
    Enhanced,
    /// Token-first: convert the platform token, step up if masked, then
    /// complete.
    Official,
}

#[derive(Debug, Clone, Copy)]
enum AuthPhase {
    CollectingIdentity,
    Gating,
    Exchanging,
    StepUpRequired,
    Verifying,
    Completing,
    Authenticated,
    Failed,
}

impl AuthPhase {
    fn as_str(&self) -> &'static str {
        match self {
            AuthPhase::CollectingIdentity => "collecting_identity",
            AuthPhase::Gating => "gating",
            AuthPhase::Exchanging => "exchanging",
            AuthPhase::StepUpRequired => "step_up_required",
            AuthPhase::Verifying => "verifying",
            AuthPhase::Completing => "completing",
            AuthPhase::Authenticated => "authenticated",
            AuthPhase::Failed => "failed",
        }
    }
}

fn enter(phase: AuthPhase) {
    tracing::debug!(phase = phase.as_str(), "Auth state transition");
}

/// Emitted when the backend demands a one-time code. The handler returns
/// the user's code (or a cancellation); it never builds UI inside this
/// crate.
#[derive(Debug, Clone)]
pub struct StepUpChallenge {
    pub session_id: String,
    pub code_length: u8,
}

#[derive(Debug, Clone)]
pub enum StepUpOutcome {
    Code(String),
    Cancelled,
}

#[async_trait]
pub trait StepUpHandler: Send + Sync {
    async fn on_challenge(&self, challenge: StepUpChallenge) -> StepUpOutcome;
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub step_up_max_attempts: u32,
    pub step_up_response_timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            step_up_max_attempts: 3,
            step_up_response_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&AuthConfig> for OrchestratorOptions {
    fn from(config: &AuthConfig) -> Self {
        Self {
            step_up_max_attempts: config.step_up.max_attempts,
            step_up_response_timeout: Duration::from_secs(config.step_up.response_timeout_secs),
        }
    }
}

type AttemptFuture =
    Shared<Pin<Box<dyn Future<Output = Result<Session, AuthError>> + Send + 'static>>>;

pub struct AuthOrchestrator {
    inner: Arc<Inner>,
    in_flight: Arc<Mutex<Option<AttemptFuture>>>,
}

struct Inner {
    collector: IdentityDataCollector,
    limiter: RateLimiter,
    backend: Arc<dyn AuthBackend>,
    sessions: SessionStore,
    step_up: Arc<dyn StepUpHandler>,
    options: OrchestratorOptions,
}

impl AuthOrchestrator {
    pub fn new(
        collector: IdentityDataCollector,
        limiter: RateLimiter,
        backend: Arc<dyn AuthBackend>,
        sessions: SessionStore,
        step_up: Arc<dyn StepUpHandler>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                collector,
                limiter,
                backend,
                sessions,
                step_up,
                options,
            }),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Wire the production stack from configuration: Redis-backed store,
    /// HMAC signer, signed HTTP transport.
    pub async fn connect(
        config: &AuthConfig,
        platform: Arc<dyn HostPlatform>,
        device: DeviceProfile,
        step_up: Arc<dyn StepUpHandler>,
    ) -> Result<Self, AuthError> {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(RedisStore::connect(&config.redis_url).await?);

        let signer = RequestSigner::new(
            config.signing_secret.clone(),
            config.client_version.clone(),
            device_fingerprint(&device),
        )?;
        let client = SecureRequestClient::new(config, signer)?;
        let backend = Arc::new(HttpAuthBackend::new(client));

        Ok(Self::new(
            IdentityDataCollector::new(platform, device),
            RateLimiter::new(store.clone()),
            backend,
            SessionStore::new(store),
            step_up,
            OrchestratorOptions::from(config),
        ))
    }

    /// Run one authentication attempt. Only one attempt is ever in flight;
    /// concurrent callers join the pending attempt and receive its result.
    pub async fn login(&self, strategy: AuthStrategy) -> Result<Session, AuthError> {
        let attempt = {
            let mut guard = self.in_flight.lock().expect("in-flight guard poisoned");
            if let Some(pending) = guard.as_ref() {
                tracing::debug!("Joining pending authentication attempt");
                pending.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let slot = Arc::clone(&self.in_flight);
                let fut: AttemptFuture = async move {
                    let outcome = inner.run(strategy).await;
                    slot.lock().expect("in-flight guard poisoned").take();
                    outcome
                }
                .boxed()
                .shared();
                *guard = Some(fut.clone());
                fut
            }
        };

        attempt.await
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.inner.sessions.clear().await
    }

    pub async fn is_authenticated(&self) -> Result<bool, AuthError> {
        self.inner.sessions.is_authenticated().await
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }
}

impl Inner {
    async fn run(&self, strategy: AuthStrategy) -> Result<Session, AuthError> {
        let result = self.run_attempt(strategy).await;

        match &result {
            Ok(session) => {
                enter(AuthPhase::Authenticated);
                tracing::info!(
                    method = session.auth_method.as_str(),
                    tier = session.risk_tier.as_str(),
                    "Authentication succeeded"
                );
            }
            Err(e) => {
                enter(AuthPhase::Failed);
                tracing::warn!(
                    error = %e,
                    report = ?e.failure_report(),
                    "Authentication failed"
                );
            }
        }

        result
    }

    async fn run_attempt(&self, strategy: AuthStrategy) -> Result<Session, AuthError> {
        enter(AuthPhase::CollectingIdentity);
        let data = self.collector.collect().await?;

        enter(AuthPhase::Gating);
        let now_ms = chrono::Utc::now().timestamp_millis();
        if !RiskScorer::check_consistency_at(&data, now_ms) {
            return Err(AuthError::ValidationFailed(
                "collected identity data failed the consistency gate".to_string(),
            ));
        }

        let assessment = RiskScorer::score_at(&data, now_ms);
        tracing::debug!(
            score = assessment.score,
            tier = assessment.tier.as_str(),
            "Risk assessment computed"
        );

        // High tier resolves locally: no round-trip, no signal to probe
        if assessment.tier == RiskTier::High {
            return Err(AuthError::RiskTooHigh {
                tier: assessment.tier,
                factors: assessment.factors,
            });
        }

        enter(AuthPhase::Exchanging);
        let phone_key = data.phone.evidence.rate_limit_key().to_string();
        if !self.limiter.try_acquire(&phone_key).await? {
            return Err(AuthError::RateLimited);
        }

        let exchanged = match strategy {
            AuthStrategy::Enhanced => self.run_enhanced(&data, &assessment).await,
            AuthStrategy::Official => self.run_official(&data, &assessment).await,
        };

        match exchanged {
            Ok(session) => {
                self.sessions.save(&session).await?;
                Ok(session)
            }
            Err(e) if e.is_infrastructure() => {
                tracing::warn!(error = %e, "Exchange infrastructure failure; trying legacy fallback");
                let session = self.run_legacy(&data, e).await?;
                self.sessions.save(&session).await?;
                Ok(session)
            }
            Err(e) => Err(e),
        }
    }

    /// Single-shot risk-first exchange.
    async fn run_enhanced(
        &self,
        data: &CollectedIdentityData,
        assessment: &RiskAssessment,
    ) -> Result<Session, AuthError> {
        let request = EnhancedLoginRequest {
            code: data.phone.evidence.exchange_token().map(String::from),
            phone_number: data.phone.evidence.direct_number().map(String::from),
            platform_user_id: data.identity.platform_user_id.clone(),
            display_name: data.identity.display_name.clone(),
            avatar_url: data.identity.avatar_url.clone(),
            gender_code: data.identity.gender_code,
            risk_score: assessment.score,
            risk_tier: assessment.tier.as_str().to_string(),
            risk_factors: assessment.factors.clone(),
            device_fingerprint: data.device_fingerprint.clone(),
            attempt_id: data.attempt_session_id.clone(),
        };

        let response = self.backend.enhanced_login(&request).await?;

        // Single-shot path never unmasks; keep whatever direct number we had
        let phone_number = data
            .phone
            .evidence
            .direct_number()
            .filter(|n| !validation::is_masked(n))
            .map(String::from);

        Ok(self.build_session(
            response.tokens.access_token,
            response.tokens.refresh_token,
            data,
            phone_number,
            assessment.tier,
            AuthMethod::Enhanced,
            Vec::new(),
        ))
    }

    /// Token-first exchange: convert, step up if the number came back
    /// masked, then complete.
    async fn run_official(
        &self,
        data: &CollectedIdentityData,
        assessment: &RiskAssessment,
    ) -> Result<Session, AuthError> {
        let request = ConvertTokenRequest {
            code: data.phone.evidence.exchange_token().map(String::from),
            phone_number: data.phone.evidence.direct_number().map(String::from),
            device_fingerprint: data.device_fingerprint.clone(),
            attempt_id: data.attempt_session_id.clone(),
        };

        let converted = self.backend.convert_token(&request).await?;
        if !converted.success {
            return Err(AuthError::TokenExchangeFailed {
                reason: "token conversion rejected".to_string(),
                infrastructure: false,
            });
        }

        let phone_number = if converted.masked || converted.requires_verification {
            self.step_up(data).await?
        } else {
            converted.phone_number
        };

        enter(AuthPhase::Completing);
        let completion = CompleteAuthRequest {
            phone_number,
            platform_user_id: data.identity.platform_user_id.clone(),
            display_name: data.identity.display_name.clone(),
            avatar_url: data.identity.avatar_url.clone(),
            gender_code: data.identity.gender_code,
            device_fingerprint: data.device_fingerprint.clone(),
            attempt_id: data.attempt_session_id.clone(),
        };

        let verified_phone = completion.phone_number.clone();
        let response = self.backend.complete_auth(&completion).await?;

        Ok(self.build_session(
            response.tokens.access_token,
            response.tokens.refresh_token,
            data,
            Some(verified_phone),
            assessment.tier,
            AuthMethod::Official,
            Vec::new(),
        ))
    }

    /// One-time-code challenge. The code is bound to the original exchange
    /// token and the challenge session id.
    async fn step_up(&self, data: &CollectedIdentityData) -> Result<String, AuthError> {
        enter(AuthPhase::StepUpRequired);

        let original_token = data.phone.evidence.rate_limit_key().to_string();
        let challenge = self
            .backend
            .request_full_phone(&FullPhoneRequest {
                exchange_token: original_token.clone(),
                attempt_id: data.attempt_session_id.clone(),
            })
            .await?;

        if !challenge.requires_otp {
            return Err(AuthError::TokenExchangeFailed {
                reason: "backend did not issue a verification challenge".to_string(),
                infrastructure: true,
            });
        }

        enter(AuthPhase::Verifying);
        for attempt in 1..=self.options.step_up_max_attempts {
            let outcome = tokio::time::timeout(
                self.options.step_up_response_timeout,
                self.step_up.on_challenge(StepUpChallenge {
                    session_id: challenge.session_id.clone(),
                    code_length: challenge.otp_length,
                }),
            )
            .await;

            let code = match outcome {
                Err(_) => {
                    tracing::warn!("Step-up challenge timed out waiting for a code");
                    return Err(AuthError::OtpInvalid);
                }
                Ok(StepUpOutcome::Cancelled) => return Err(AuthError::Cancelled),
                Ok(StepUpOutcome::Code(code)) => code,
            };

            if !validation::is_valid_otp_code(&code, challenge.otp_length as usize) {
                tracing::debug!(attempt, "Step-up code failed local format check");
                continue;
            }

            let verify = OtpVerifyRequest {
                session_id: challenge.session_id.clone(),
                otp_code: code,
                original_token: original_token.clone(),
            };
            verify
                .validate()
                .map_err(|e| AuthError::ValidationFailed(e.to_string()))?;

            match self.backend.verify_otp(&verify).await {
                Ok(verified) => return Ok(verified.full_phone),
                Err(AuthError::OtpInvalid) if attempt < self.options.step_up_max_attempts => {
                    tracing::debug!(attempt, "Step-up code rejected; retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AuthError::OtpInvalid)
    }

    /// Minimal phone-only exchange, reached only after an infrastructure
    /// failure. No risk scoring; the session is pinned to the medium tier
    /// and carries a warning.
    async fn run_legacy(
        &self,
        data: &CollectedIdentityData,
        original: AuthError,
    ) -> Result<Session, AuthError> {
        let phone_number = match data.phone.evidence.direct_number() {
            Some(number) if !validation::is_masked(number) => number.to_string(),
            // Without a usable number the fallback cannot run
            _ => return Err(original),
        };

        let response = self
            .backend
            .legacy_login(&LegacyLoginRequest {
                phone_number: phone_number.clone(),
            })
            .await?;

        Ok(self.build_session(
            response.tokens.access_token,
            response.tokens.refresh_token,
            data,
            Some(phone_number),
            RiskTier::Medium,
            AuthMethod::Legacy,
            vec![format!("legacy fallback after: {}", original)],
        ))
    }

    fn build_session(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        data: &CollectedIdentityData,
        phone_number: Option<String>,
        risk_tier: RiskTier,
        auth_method: AuthMethod,
        warnings: Vec<String>,
    ) -> Session {
        Session {
            access_token,
            refresh_token,
            identity_snapshot: data.identity.clone(),
            phone_number,
            risk_tier,
            established_at_ms: chrono::Utc::now().timestamp_millis(),
            auth_method,
            warnings,
        }
    }
}
