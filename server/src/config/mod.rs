use std::env;
use std::time::Duration;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ticketing";
const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_QR_RENDER_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Public base URL of the web app, used for payment callbacks and QR links.
    pub app_base_url: String,
    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    pub payment_timeout: Duration,
    pub auth_jwt_secret: String,
    pub auth_jwt_audience: Option<String>,
    pub qr_render_url: String,
    pub cors_allowed_origins: String,
    pub production: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: 5,
            host: "0.0.0.0".to_string(),
            port: 3001,
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
            paystack_secret_key: String::new(),
            paystack_base_url: DEFAULT_PAYSTACK_BASE_URL.to_string(),
            payment_timeout: Duration::from_secs(15),
            auth_jwt_secret: String::new(),
            auth_jwt_audience: Some("authenticated".to_string()),
            qr_render_url: DEFAULT_QR_RENDER_URL.to_string(),
            cors_allowed_origins: cors::DEFAULT_ALLOWED_ORIGINS.to_string(),
            production: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let required = |key: &'static str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(
                &get,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            app_base_url: get("APP_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.app_base_url),
            paystack_secret_key: required("PAYSTACK_SECRET_KEY")?,
            paystack_base_url: get("PAYSTACK_BASE_URL").unwrap_or(defaults.paystack_base_url),
            payment_timeout: Duration::from_secs(parse_or(
                &get,
                "PAYMENT_TIMEOUT_SECS",
                defaults.payment_timeout.as_secs(),
            )?),
            auth_jwt_secret: required("AUTH_JWT_SECRET")?,
            auth_jwt_audience: match get("AUTH_JWT_AUDIENCE") {
                Some(aud) if aud.trim().is_empty() => None,
                Some(aud) => Some(aud),
                None => defaults.auth_jwt_audience,
            },
            qr_render_url: get("QR_RENDER_URL").unwrap_or(defaults.qr_render_url),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
            production: get("RUST_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Page the payer returns to after checkout.
    pub fn payment_callback_url(&self) -> String {
        format!("{}/payment/callback", self.app_base_url)
    }

    pub fn qr_code_url(&self, code: &str) -> String {
        format!("{}/api/qr/{code}", self.app_base_url)
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://db/tickets"),
        ("PAYSTACK_SECRET_KEY", "sk_test_123"),
        ("AUTH_JWT_SECRET", "jwt-secret"),
    ];

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.payment_timeout, Duration::from_secs(15));
        assert_eq!(config.paystack_base_url, DEFAULT_PAYSTACK_BASE_URL);
    }

    #[test]
    fn missing_secret_fails() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AUTH_JWT_SECRET")));
    }

    #[test]
    fn invalid_port_fails() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn builds_public_urls_without_double_slash() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("APP_BASE_URL", "https://tickets.example.com/"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.payment_callback_url(),
            "https://tickets.example.com/payment/callback"
        );
        assert_eq!(
            config.qr_code_url("ABC-123"),
            "https://tickets.example.com/api/qr/ABC-123"
        );
    }
}
