//! Services layer for the phone-auth subsystem.
//!
//! Collection, scoring, throttling, signing, transport and the orchestrator
//! that drives the exchange protocol end to end.

mod collector;
pub mod error;
mod orchestrator;
mod rate_limit;
mod risk;
mod secure_client;
mod session;
mod signing;

pub use collector::{
    HostPlatform, IdentityDataCollector, PlatformError, RawIdentity, RawPhoneClaim,
};
pub use error::{AuthError, FailureReport};
pub use orchestrator::{
    AuthOrchestrator, AuthStrategy, OrchestratorOptions, StepUpChallenge, StepUpHandler,
    StepUpOutcome,
};
pub use rate_limit::{spawn_sweeper, RateLimiter};
pub use risk::RiskScorer;
pub use secure_client::{AuthBackend, HttpAuthBackend, SecureRequestClient};
pub use session::SessionStore;
pub use signing::RequestSigner;
