use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::auth::JwtManager;
use crate::config::Config;
use crate::services::checkin::ScanGuard;
use crate::services::whatsapp_service;
use crate::utils::error::AppResult;

/// Shared handles cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtManager>,
    pub scan_guard: Arc<ScanGuard>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> AppResult<Self> {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_ttl_hours);
        let scan_guard = ScanGuard::new(Duration::from_secs(config.scan_dedupe_seconds));
        let http = whatsapp_service::relay_client(Duration::from_secs(config.whatsapp_relay_timeout_secs))?;
        Ok(Self {
            pool,
            jwt: Arc::new(jwt),
            scan_guard: Arc::new(scan_guard),
            config: Arc::new(config),
            http,
        })
    }
}
