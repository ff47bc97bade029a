//! Persists the single active session as discrete key-value entries and
//! enforces the risk-tiered expiry policy.

use std::sync::Arc;

use auth_core::kv::KeyValueStore;

use crate::models::{AuthMethod, IdentityClaim, RiskTier, Session};
use crate::services::error::AuthError;

mod keys {
    pub const ACCESS_TOKEN: &str = "auth:access_token";
    pub const REFRESH_TOKEN: &str = "auth:refresh_token";
    pub const IDENTITY: &str = "auth:identity_snapshot";
    pub const PHONE_NUMBER: &str = "auth:phone_number";
    pub const RISK_TIER: &str = "auth:risk_tier";
    pub const METHOD: &str = "auth:method";
    pub const ESTABLISHED_AT: &str = "auth:established_at";
    pub const WARNINGS: &str = "auth:warnings";
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, session: &Session) -> Result<(), AuthError> {
        let identity = serde_json::to_string(&session.identity_snapshot)
            .map_err(|e| AuthError::Store(format!("failed to encode identity: {}", e)))?;
        let warnings = serde_json::to_string(&session.warnings)
            .map_err(|e| AuthError::Store(format!("failed to encode warnings: {}", e)))?;

        self.store
            .set(keys::ACCESS_TOKEN, &session.access_token)
            .await?;
        match &session.refresh_token {
            Some(token) => self.store.set(keys::REFRESH_TOKEN, token).await?,
            None => self.store.delete(keys::REFRESH_TOKEN).await?,
        }
        self.store.set(keys::IDENTITY, &identity).await?;
        match &session.phone_number {
            Some(number) => self.store.set(keys::PHONE_NUMBER, number).await?,
            None => self.store.delete(keys::PHONE_NUMBER).await?,
        }
        self.store
            .set(keys::RISK_TIER, session.risk_tier.as_str())
            .await?;
        self.store
            .set(keys::METHOD, session.auth_method.as_str())
            .await?;
        self.store
            .set(keys::ESTABLISHED_AT, &session.established_at_ms.to_string())
            .await?;
        self.store.set(keys::WARNINGS, &warnings).await?;

        tracing::info!(
            method = session.auth_method.as_str(),
            tier = session.risk_tier.as_str(),
            "Session persisted"
        );

        Ok(())
    }

    pub async fn load(&self) -> Result<Option<Session>, AuthError> {
        let access_token = match self.store.get(keys::ACCESS_TOKEN).await? {
            Some(token) => token,
            None => return Ok(None),
        };

        let identity_raw = match self.store.get(keys::IDENTITY).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let identity_snapshot: IdentityClaim = serde_json::from_str(&identity_raw)
            .map_err(|e| AuthError::Store(format!("corrupt identity snapshot: {}", e)))?;

        let risk_tier = self
            .store
            .get(keys::RISK_TIER)
            .await?
            .and_then(|raw| raw.parse::<RiskTier>().ok())
            .unwrap_or(RiskTier::High);

        let auth_method = self
            .store
            .get(keys::METHOD)
            .await?
            .and_then(|raw| raw.parse::<AuthMethod>().ok())
            .unwrap_or(AuthMethod::Legacy);

        let established_at_ms = self
            .store
            .get(keys::ESTABLISHED_AT)
            .await?
            .and_then(|raw| raw.parse::<i64>().ok())
            .unwrap_or(0);

        let warnings = self
            .store
            .get(keys::WARNINGS)
            .await?
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        Ok(Some(Session {
            access_token,
            refresh_token: self.store.get(keys::REFRESH_TOKEN).await?,
            identity_snapshot,
            phone_number: self.store.get(keys::PHONE_NUMBER).await?,
            risk_tier,
            established_at_ms,
            auth_method,
            warnings,
        }))
    }

    pub async fn clear(&self) -> Result<(), AuthError> {
        for key in [
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::IDENTITY,
            keys::PHONE_NUMBER,
            keys::RISK_TIER,
            keys::METHOD,
            keys::ESTABLISHED_AT,
            keys::WARNINGS,
        ] {
            self.store.delete(key).await?;
        }
        Ok(())
    }

    pub async fn is_authenticated(&self) -> Result<bool, AuthError> {
        self.is_authenticated_at(chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Expired sessions are logged out on sight: deleted, then reported as
    /// unauthenticated.
    pub async fn is_authenticated_at(&self, now_ms: i64) -> Result<bool, AuthError> {
        match self.load().await? {
            Some(session) => {
                if session.is_expired_at(now_ms) {
                    tracing::info!(
                        tier = session.risk_tier.as_str(),
                        age_ms = session.age_ms(now_ms),
                        "Session expired; clearing"
                    );
                    self.clear().await?;
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
            None => Ok(false),
        }
    }
}
