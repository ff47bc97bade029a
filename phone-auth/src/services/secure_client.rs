//! Signed-envelope HTTP transport and the backend endpoint surface.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::AuthConfig;
use crate::dtos::{
    CompleteAuthRequest, CompleteAuthResponse, ConvertTokenRequest, ConvertTokenResponse,
    EnhancedLoginRequest, EnhancedLoginResponse, FullPhoneRequest, FullPhoneResponse,
    LegacyLoginRequest, LegacyLoginResponse, OtpVerifyRequest, OtpVerifyResponse,
};
use crate::models::envelope::headers;
use crate::services::error::AuthError;
use crate::services::signing::RequestSigner;

/// Composes the signer and an HTTP client with explicit timeouts. Every
/// call leaves with integrity headers; responses that carry server
/// signature headers are checked before the body is trusted.
pub struct SecureRequestClient {
    http: reqwest::Client,
    base_url: String,
    signer: RequestSigner,
}

impl SecureRequestClient {
    pub fn new(config: &AuthConfig, signer: RequestSigner) -> Result<Self, AuthError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AuthError::TokenExchangeFailed {
                reason: format!("failed to build HTTP client: {}", e),
                infrastructure: true,
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    pub async fn post_signed(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, AuthError> {
        let envelope = self.signer.envelope(payload)?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .header(headers::X_SIGNATURE, &envelope.signature)
            .header(headers::X_TIMESTAMP, envelope.timestamp_ms.to_string())
            .header(headers::X_NONCE, &envelope.nonce)
            .header(headers::X_CLIENT_VERSION, &envelope.client_version)
            .header(headers::X_DEVICE_INFO, &envelope.device_info)
            .json(&envelope.payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "Signed request failed to send");
                AuthError::TokenExchangeFailed {
                    reason: format!("request to {} failed: {}", path, e),
                    infrastructure: true,
                }
            })?;

        let status = response.status();
        let server_signature = header_value(&response, headers::X_SERVER_SIGNATURE);
        let server_timestamp = header_value(&response, headers::X_SERVER_TIMESTAMP)
            .and_then(|v| v.parse::<i64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                reason: format!("failed to read response from {}: {}", path, e),
                infrastructure: true,
            })?;

        if !status.is_success() {
            return Err(classify_status(path, status, &body));
        }

        if let (Some(signature), Some(timestamp)) = (server_signature, server_timestamp) {
            if !self.signer.verify_server(&body, &signature, timestamp)? {
                tracing::error!(url = %url, "Server signature did not verify");
                return Err(AuthError::ServerSignatureInvalid);
            }
        }

        serde_json::from_str(&body).map_err(|e| AuthError::TokenExchangeFailed {
            reason: format!("malformed response from {}: {}", path, e),
            infrastructure: true,
        })
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// 5xx means the backend is in trouble (fallback allowed); anything else is
/// the backend rejecting the request (it is not).
fn classify_status(path: &str, status: StatusCode, body: &str) -> AuthError {
    let infrastructure = status.is_server_error();
    tracing::warn!(path = %path, status = %status, infrastructure, "Exchange endpoint returned an error");
    AuthError::TokenExchangeFailed {
        reason: format!("{} returned {}: {}", path, status, truncate(body, 200)),
        infrastructure,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Backend token-exchange surface, one method per endpoint. The orchestrator
/// only ever talks to this trait.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn convert_token(
        &self,
        req: &ConvertTokenRequest,
    ) -> Result<ConvertTokenResponse, AuthError>;
    async fn request_full_phone(
        &self,
        req: &FullPhoneRequest,
    ) -> Result<FullPhoneResponse, AuthError>;
    async fn verify_otp(&self, req: &OtpVerifyRequest) -> Result<OtpVerifyResponse, AuthError>;
    async fn complete_auth(
        &self,
        req: &CompleteAuthRequest,
    ) -> Result<CompleteAuthResponse, AuthError>;
    async fn enhanced_login(
        &self,
        req: &EnhancedLoginRequest,
    ) -> Result<EnhancedLoginResponse, AuthError>;
    async fn legacy_login(
        &self,
        req: &LegacyLoginRequest,
    ) -> Result<LegacyLoginResponse, AuthError>;
}

pub struct HttpAuthBackend {
    client: SecureRequestClient,
}

impl HttpAuthBackend {
    pub fn new(client: SecureRequestClient) -> Self {
        Self { client }
    }

    async fn call<Req, Resp>(&self, path: &str, req: &Req) -> Result<Resp, AuthError>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let payload =
            serde_json::to_value(req).map_err(|e| AuthError::TokenExchangeFailed {
                reason: format!("failed to encode request for {}: {}", path, e),
                infrastructure: true,
            })?;

        let body = self.client.post_signed(path, payload).await?;

        serde_json::from_value(body).map_err(|e| AuthError::TokenExchangeFailed {
            reason: format!("unexpected response shape from {}: {}", path, e),
            infrastructure: true,
        })
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn convert_token(
        &self,
        req: &ConvertTokenRequest,
    ) -> Result<ConvertTokenResponse, AuthError> {
        self.call("/auth/phone/convert", req).await
    }

    async fn request_full_phone(
        &self,
        req: &FullPhoneRequest,
    ) -> Result<FullPhoneResponse, AuthError> {
        self.call("/auth/phone/full", req).await
    }

    async fn verify_otp(&self, req: &OtpVerifyRequest) -> Result<OtpVerifyResponse, AuthError> {
        // A backend rejection of the code is an OTP failure, not an outage
        self.call("/auth/phone/otp/verify", req)
            .await
            .map_err(|e| match e {
                AuthError::TokenExchangeFailed {
                    infrastructure: false,
                    ..
                } => AuthError::OtpInvalid,
                other => other,
            })
    }

    async fn complete_auth(
        &self,
        req: &CompleteAuthRequest,
    ) -> Result<CompleteAuthResponse, AuthError> {
        self.call("/auth/complete", req).await
    }

    async fn enhanced_login(
        &self,
        req: &EnhancedLoginRequest,
    ) -> Result<EnhancedLoginResponse, AuthError> {
        self.call("/auth/enhanced-login", req).await
    }

    async fn legacy_login(
        &self,
        req: &LegacyLoginRequest,
    ) -> Result<LegacyLoginResponse, AuthError> {
        self.call("/auth/legacy-login", req).await
    }
}
