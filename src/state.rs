//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the startup configuration and the
//! process-local rate limiter. All durable state lives in Postgres; nothing
//! here needs flushing on shutdown.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::rate_limit::RateLimiter;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// In-memory limiter for login and promo redemption.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: Config) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limits);
        Self { pool, config: Arc::new(config), rate_limiter }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
