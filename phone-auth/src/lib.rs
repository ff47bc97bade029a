//! phone-auth: phone identity verification and request integrity.
//!
//! Turns a platform-issued phone-number token into a verified phone number,
//! scores the authenticity of the claim, signs every outbound request,
//! throttles abuse, and manages a risk-tiered session lifecycle. Screens and
//! stores elsewhere in the app are thin consumers of the [`models::Session`]
//! this crate produces.

pub mod config;
pub mod dtos;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AuthConfig;
pub use models::{
    AuthMethod, CollectedIdentityData, IdentityClaim, PhoneClaim, PhoneEvidence, RiskAssessment,
    RiskTier, Session, SignedEnvelope,
};
pub use services::{
    AuthBackend, AuthError, AuthOrchestrator, AuthStrategy, HostPlatform, HttpAuthBackend,
    IdentityDataCollector, OrchestratorOptions, RateLimiter, RequestSigner, RiskScorer,
    SecureRequestClient, SessionStore, StepUpChallenge, StepUpHandler, StepUpOutcome,
};
