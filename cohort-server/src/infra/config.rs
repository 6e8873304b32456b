use std::{env, fmt, time::Duration};

use anyhow::{Context, anyhow, bail};
use cohort_model::enrollment::normalize_currency;
use url::Url;
use zeroize::Zeroizing;

/// Server configuration loaded from environment variables. `main` applies
/// CLI overrides on top.
#[derive(Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Database settings
    pub database_url: Option<String>,
    pub db_max_connections: u32,

    // CORS settings
    pub cors_allowed_origins: Vec<String>,

    /// HMAC key shared with the auth service for hashing bearer tokens.
    pub auth_token_key: Zeroizing<String>,

    pub gateway: GatewaySettings,
    pub enrollment: EnrollmentSettings,
}

#[derive(Clone)]
pub struct GatewaySettings {
    /// Required unless the server runs against the offline gateway.
    pub base_url: Option<Url>,
    pub key_id: String,
    pub key_secret: Zeroizing<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentSettings {
    pub fee_minor: i64,
    pub currency: String,
    pub requires_confirmation: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<redacted>"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("auth_token_key", &"<redacted>")
            .field("gateway", &self.gateway)
            .field("enrollment", &self.enrollment)
            .finish()
    }
}

impl fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let server_port = match var("SERVER_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("SERVER_PORT is not a port: {raw}"))?,
            None => 3000,
        };

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().with_context(|| {
                format!("DB_MAX_CONNECTIONS is not a number: {raw}")
            })?,
            None => 10,
        };

        let base_url = var("GATEWAY_BASE_URL")
            .map(|raw| {
                Url::parse(&raw)
                    .with_context(|| format!("GATEWAY_BASE_URL is not a URL: {raw}"))
            })
            .transpose()?;

        let timeout = match var("GATEWAY_TIMEOUT") {
            Some(raw) => humantime::parse_duration(&raw)
                .with_context(|| format!("GATEWAY_TIMEOUT is not a duration: {raw}"))?,
            None => Duration::from_secs(10),
        };

        let fee_minor: i64 = match var("ENROLLMENT_FEE_MINOR") {
            Some(raw) => raw.parse().with_context(|| {
                format!("ENROLLMENT_FEE_MINOR is not an integer: {raw}")
            })?,
            None => 1000,
        };
        if fee_minor <= 0 {
            bail!("ENROLLMENT_FEE_MINOR must be positive, got {fee_minor}");
        }

        let currency = normalize_currency(
            &var("ENROLLMENT_CURRENCY").unwrap_or_else(|| "INR".to_string()),
        )
        .map_err(|err| anyhow!("ENROLLMENT_CURRENCY: {err}"))?;

        let requires_confirmation = match var("ADMISSION_REQUIRES_CONFIRMATION") {
            Some(raw) => parse_flag(&raw).with_context(|| {
                format!("ADMISSION_REQUIRES_CONFIRMATION is not a boolean: {raw}")
            })?,
            None => true,
        };

        Ok(Self {
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,

            database_url: var("DATABASE_URL"),
            db_max_connections,

            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| {
                    "http://localhost:3000,http://localhost:5173".to_string()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            auth_token_key: Zeroizing::new(
                var("AUTH_TOKEN_KEY").context("AUTH_TOKEN_KEY must be set")?,
            ),

            gateway: GatewaySettings {
                base_url,
                key_id: var("GATEWAY_KEY_ID").context("GATEWAY_KEY_ID must be set")?,
                key_secret: Zeroizing::new(
                    var("GATEWAY_KEY_SECRET")
                        .context("GATEWAY_KEY_SECRET must be set")?,
                ),
                timeout,
            },

            enrollment: EnrollmentSettings {
                fee_minor,
                currency,
                requires_confirmation,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("expected true or false")),
    }
}
