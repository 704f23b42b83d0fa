use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;

// Web client and admin dashboard dev servers.
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer(config: &Config) -> CorsLayer {
    let origins_str = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or(DEFAULT_ALLOWED_ORIGINS);

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS));

    match parse_origins(origins_str) {
        Some(origins) => {
            tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
            base.allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
        }
        None => {
            // Credentials cannot be combined with a wildcard origin.
            tracing::warn!(
                "CORS: No valid origins configured, using permissive settings for development"
            );
            base.allow_origin(AllowOrigin::any())
        }
    }
}

fn parse_origins(origins_str: &str) -> Option<Vec<HeaderValue>> {
    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        None
    } else {
        Some(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cors_layer() {
        let _layer = create_cors_layer(&Config::default());
    }

    #[test]
    fn test_default_origins_are_valid() {
        let origins = parse_origins(DEFAULT_ALLOWED_ORIGINS).expect("defaults parse");
        assert_eq!(origins.len(), 2);
    }

    #[test]
    fn test_blank_origin_list_falls_back() {
        assert!(parse_origins(" , ,").is_none());
    }
}
