//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use discoverly_core::Email;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 365;
pub const MAX_TOKEN_TTL_DAYS: i64 = 3_650;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// True when `JWT_SECRET` was not set and the dev default is in use.
    pub jwt_secret_is_default: bool,
    pub token_ttl: chrono::Duration,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    /// Promoted to `Admin` at startup, registering them if needed.
    pub admin_emails: Vec<Email>,
    /// Whether `POST /jwt` issues credentials. Deployments with an external
    /// identity provider turn it off.
    pub token_endpoint_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = parse(
            "BIND_ADDR",
            get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;
        let jwt_secret = get("JWT_SECRET");
        let ttl_days: i64 = match get("TOKEN_TTL_DAYS") {
            Some(raw) => parse("TOKEN_TTL_DAYS", raw)?,
            None => DEFAULT_TOKEN_TTL_DAYS,
        };
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&ttl_days) {
            return Err(invalid(
                "TOKEN_TTL_DAYS",
                format!("must be between 1 and {MAX_TOKEN_TTL_DAYS}"),
            ));
        }
        let store_timeout_ms: u64 = match get("STORE_TIMEOUT_MS") {
            Some(raw) => parse("STORE_TIMEOUT_MS", raw)?,
            None => DEFAULT_STORE_TIMEOUT_MS,
        };
        if store_timeout_ms == 0 {
            return Err(invalid("STORE_TIMEOUT_MS", "must be positive"));
        }
        let db_max_connections: u32 = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse("DATABASE_MAX_CONNECTIONS", raw)?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let token_endpoint_enabled: bool = match get("TOKEN_ENDPOINT_ENABLED") {
            Some(raw) => parse("TOKEN_ENDPOINT_ENABLED", raw.to_lowercase())?,
            None => true,
        };

        let admin_emails = get("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(|e| Email::parse(e).map_err(|err| invalid("ADMIN_EMAILS", err.to_string())))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            jwt_secret_is_default: jwt_secret.is_none(),
            jwt_secret: jwt_secret.unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            token_ttl: chrono::Duration::days(ttl_days),
            database_url: get("DATABASE_URL"),
            db_max_connections,
            store_timeout: Duration::from_millis(store_timeout_ms),
            admin_emails,
            token_endpoint_enabled,
        })
    }
}

fn parse<T>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse::<T>().map_err(|e| invalid(name, e.to_string()))
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_select_in_memory_store() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(cfg.jwt_secret_is_default);
        assert_eq!(cfg.token_ttl, chrono::Duration::days(365));
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.store_timeout, Duration::from_millis(5_000));
        assert!(cfg.token_endpoint_enabled);
    }

    #[test]
    fn token_endpoint_can_be_disabled() {
        let cfg = config(&[("TOKEN_ENDPOINT_ENABLED", "False")]).unwrap();
        assert!(!cfg.token_endpoint_enabled);
        assert!(config(&[("TOKEN_ENDPOINT_ENABLED", "maybe")]).is_err());
    }

    #[test]
    fn invalid_numbers_are_startup_errors() {
        assert!(matches!(
            config(&[("TOKEN_TTL_DAYS", "soon")]),
            Err(ConfigError::Invalid { name: "TOKEN_TTL_DAYS", .. })
        ));
        assert!(config(&[("STORE_TIMEOUT_MS", "0")]).is_err());
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn blank_database_url_is_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert!(!cfg.jwt_secret_is_default);
    }

    #[test]
    fn admin_emails_are_parsed_and_normalized() {
        let cfg = config(&[("ADMIN_EMAILS", "Root@X.io, ops@x.io,")]).unwrap();
        let emails: Vec<&str> = cfg.admin_emails.iter().map(Email::as_str).collect();
        assert_eq!(emails, vec!["root@x.io", "ops@x.io"]);
        assert!(config(&[("ADMIN_EMAILS", "not-an-email")]).is_err());
    }
}
