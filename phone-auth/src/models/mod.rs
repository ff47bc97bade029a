pub mod envelope;
pub mod identity;
pub mod risk;
pub mod session;

pub use envelope::SignedEnvelope;
pub use identity::{CollectedIdentityData, IdentityClaim, PhoneClaim, PhoneEvidence};
pub use risk::{RiskAssessment, RiskTier};
pub use session::{AuthMethod, Session};
