use auth_core::config::{self as core_config, get_env};
use auth_core::error::CoreError;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::CoreConfig,
    pub api_base_url: String,
    pub signing_secret: String,
    pub client_version: String,
    pub redis_url: String,
    pub request_timeout_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub step_up: StepUpConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct StepUpConfig {
    pub max_attempts: u32,
    pub response_timeout_secs: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        let common = core_config::CoreConfig::from_env("phone-auth")?;
        let is_prod = common.is_prod();

        let config = AuthConfig {
            common,
            api_base_url: get_env("AUTH_API_BASE_URL", Some("http://localhost:8080"), is_prod)?,
            signing_secret: get_env(
                "AUTH_SIGNING_SECRET",
                Some("dev-only-signing-secret"),
                is_prod,
            )?,
            client_version: get_env("CLIENT_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            redis_url: get_env("REDIS_URL", Some("redis://127.0.0.1:6379"), is_prod)?,
            request_timeout_secs: get_env("AUTH_REQUEST_TIMEOUT_SECS", Some("10"), is_prod)?
                .parse()
                .unwrap_or(10),
            rate_limit: RateLimitConfig {
                sweep_interval_seconds: get_env(
                    "RATE_LIMIT_SWEEP_INTERVAL_SECONDS",
                    Some("300"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(300),
            },
            step_up: StepUpConfig {
                max_attempts: get_env("STEP_UP_MAX_ATTEMPTS", Some("3"), is_prod)?
                    .parse()
                    .unwrap_or(3),
                response_timeout_secs: get_env(
                    "STEP_UP_RESPONSE_TIMEOUT_SECS",
                    Some("120"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(120),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if !self.api_base_url.starts_with("http") {
            return Err(CoreError::ConfigError(anyhow::anyhow!(
                "AUTH_API_BASE_URL must be an http(s) URL"
            )));
        }

        if self.signing_secret.len() < auth_core::utils::signature::MIN_SECRET_LEN {
            return Err(CoreError::ConfigError(anyhow::anyhow!(
                "AUTH_SIGNING_SECRET must be at least {} bytes",
                auth_core::utils::signature::MIN_SECRET_LEN
            )));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(CoreError::ConfigError(anyhow::anyhow!(
                "AUTH_REQUEST_TIMEOUT_SECS must be between 1 and 60"
            )));
        }

        if self.step_up.max_attempts == 0 {
            return Err(CoreError::ConfigError(anyhow::anyhow!(
                "STEP_UP_MAX_ATTEMPTS must be greater than 0"
            )));
        }

        Ok(())
    }
}
