//! Collects identity and phone claims from the host platform and validates
//! their structure before anything downstream sees them.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CollectedIdentityData, IdentityClaim, PhoneClaim, PhoneEvidence};
use crate::services::error::AuthError;
use crate::utils::{device_fingerprint, validation, DeviceProfile};

/// Raw profile payload from the host identity API.
#[derive(Debug, Clone)]
pub struct RawIdentity {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub birthday: Option<String>,
    pub gender: u8,
}

/// Raw phone payload: an opaque exchange token (`code`) or a direct number,
/// depending on platform capability.
#[derive(Debug, Clone)]
pub struct RawPhoneClaim {
    pub code: Option<String>,
    pub phone_number: Option<String>,
    pub err_code: i32,
    pub err_msg: String,
}

#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("API unavailable")]
    ApiUnavailable,

    #[error("Permission denied: {0}")]
    Denied(String),

    #[error("{0}")]
    Other(String),
}

/// The host platform's identity and phone-claim APIs.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    async fn get_identity(&self) -> Result<RawIdentity, PlatformError>;
    async fn get_phone_claim(&self) -> Result<RawPhoneClaim, PlatformError>;
}

pub struct IdentityDataCollector {
    platform: Arc<dyn HostPlatform>,
    device: DeviceProfile,
}

impl IdentityDataCollector {
    pub fn new(platform: Arc<dyn HostPlatform>, device: DeviceProfile) -> Self {
        Self { platform, device }
    }

    pub async fn collect_identity(&self) -> Result<IdentityClaim, AuthError> {
        let raw = self.platform.get_identity().await.map_err(|e| match e {
            PlatformError::ApiUnavailable => AuthError::IdentityUnavailable,
            PlatformError::Denied(_) => AuthError::IdentityUnavailable,
            PlatformError::Other(msg) => AuthError::ValidationFailed(msg),
        })?;

        let claim = IdentityClaim {
            platform_user_id: raw.id,
            display_name: raw.name,
            avatar_url: raw.avatar.filter(|a| !a.is_empty()),
            birthday: raw.birthday.filter(|b| !b.is_empty()),
            gender_code: raw.gender,
        };

        if !claim.is_structurally_valid() {
            return Err(AuthError::ValidationFailed(
                "identity claim missing required fields".to_string(),
            ));
        }

        Ok(claim)
    }

    pub async fn collect_phone(&self) -> Result<PhoneClaim, AuthError> {
        let raw = self.platform.get_phone_claim().await.map_err(|e| match e {
            PlatformError::ApiUnavailable => {
                AuthError::PhoneUnavailable("phone API unavailable".to_string())
            }
            PlatformError::Denied(msg) => AuthError::PhoneUnavailable(msg),
            PlatformError::Other(msg) => AuthError::PhoneUnavailable(msg),
        })?;

        if raw.err_code != 0 {
            return Err(AuthError::PhoneUnavailable(raw.err_msg));
        }

        let evidence = match (raw.code, raw.phone_number) {
            (Some(code), _) if !code.is_empty() => PhoneEvidence::ExchangeToken(code),
            (_, Some(number)) if !number.is_empty() => {
                // Masked numbers get validated after the step-up unmasks them
                if !validation::is_masked(&number) && !validation::is_valid_mobile(&number) {
                    return Err(AuthError::ValidationFailed(format!(
                        "phone number failed format check: {}",
                        number
                    )));
                }
                PhoneEvidence::DirectNumber(number)
            }
            _ => {
                return Err(AuthError::PhoneUnavailable(
                    "phone claim carried neither token nor number".to_string(),
                ))
            }
        };

        Ok(PhoneClaim {
            evidence,
            result_code: raw.err_code,
            result_message: raw.err_msg,
        })
    }

    /// Issue both host calls concurrently and join the results into one
    /// attempt-scoped bundle.
    pub async fn collect(&self) -> Result<CollectedIdentityData, AuthError> {
        let (identity, phone) = tokio::try_join!(self.collect_identity(), self.collect_phone())?;

        Ok(CollectedIdentityData {
            identity,
            phone,
            collected_at_ms: chrono::Utc::now().timestamp_millis(),
            device_fingerprint: device_fingerprint(&self.device),
            attempt_session_id: Uuid::new_v4().to_string(),
        })
    }
}
