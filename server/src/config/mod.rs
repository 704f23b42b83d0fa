use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEV_JWT_SECRET: &str = "fira-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub production: bool,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub admin_emails: Vec<String>,
    pub commission_percent: Decimal,
    pub scan_dedupe_seconds: u64,
    pub upload_dir: PathBuf,
    pub public_upload_url: String,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Option<String>,
    pub whatsapp_verify_token: Option<String>,
    pub whatsapp_relay_url: Option<String>,
    pub whatsapp_relay_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/fira".to_string(),
            database_max_connections: 5,
            port: 3001,
            production: false,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_hours: 24,
            admin_emails: Vec::new(),
            commission_percent: Decimal::from(10),
            scan_dedupe_seconds: 5,
            upload_dir: PathBuf::from("./uploads"),
            public_upload_url: "/uploads".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            cors_allowed_origins: None,
            whatsapp_verify_token: None,
            whatsapp_relay_url: None,
            whatsapp_relay_timeout_secs: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET is not set, falling back to the development secret");
                defaults.jwt_secret.clone()
            }
        };

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            port: parse_var("PORT").unwrap_or(defaults.port),
            production: env::var("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            jwt_secret,
            jwt_ttl_hours: parse_var("JWT_TTL_HOURS").unwrap_or(defaults.jwt_ttl_hours),
            admin_emails: env::var("ADMIN_EMAILS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            commission_percent: parse_var("PLATFORM_COMMISSION_PERCENT")
                .filter(|p: &Decimal| *p >= Decimal::ZERO && *p <= Decimal::ONE_HUNDRED)
                .unwrap_or(defaults.commission_percent),
            scan_dedupe_seconds: parse_var("SCAN_DEDUPE_SECONDS")
                .unwrap_or(defaults.scan_dedupe_seconds),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_upload_url: env::var("PUBLIC_UPLOAD_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_upload_url),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            whatsapp_verify_token: non_empty_var("WHATSAPP_VERIFY_TOKEN"),
            whatsapp_relay_url: non_empty_var("WHATSAPP_RELAY_URL"),
            whatsapp_relay_timeout_secs: parse_var("WHATSAPP_RELAY_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(defaults.whatsapp_relay_timeout_secs),
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Config: ignoring unparsable value for {}", key);
            None
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_lowercases() {
        assert_eq!(
            parse_list(" Root@Fira.events, ,ops@fira.events "),
            vec!["root@fira.events".to_string(), "ops@fira.events".to_string()]
        );
    }

    #[test]
    fn test_admin_email_match_is_case_insensitive() {
        let config = Config {
            admin_emails: vec!["root@fira.events".to_string()],
            ..Config::default()
        };
        assert!(config.is_admin_email("ROOT@fira.events"));
        assert!(!config.is_admin_email("guest@fira.events"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.commission_percent, Decimal::from(10));
        assert_eq!(config.scan_dedupe_seconds, 5);
        assert!(config.whatsapp_verify_token.is_none());
    }
}
