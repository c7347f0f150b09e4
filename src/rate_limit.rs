//! In-memory rate limiting for credential and voucher endpoints.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! one map per scope. Two limits are enforced on every check:
//! - Per-key: login attempts per email, promo redemptions per user
//! - Global: all limited requests across every key and scope
//!
//! TRADE-OFFS
//! ==========
//! State is process-local, so limits are per instance rather than per
//! deployment. Keys are never persisted; a restart clears all windows.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::env_parse;

const DEFAULT_LOGIN_LIMIT: usize = 10;
const DEFAULT_LOGIN_WINDOW_SECS: u64 = 300;

const DEFAULT_REDEEM_LIMIT: usize = 5;
const DEFAULT_REDEEM_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 600;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub login_limit: usize,
    pub login_window: Duration,
    pub redeem_limit: usize,
    pub redeem_window: Duration,
    pub global_limit: usize,
    pub global_window: Duration,
}

impl RateLimitConfig {
    /// Per-key limit and window for `scope`.
    fn scope_limit(&self, scope: RateLimitScope) -> (usize, Duration) {
        match scope {
            RateLimitScope::Login => (self.login_limit, self.login_window),
            RateLimitScope::Redeem => (self.redeem_limit, self.redeem_window),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self {
            login_limit: env_parse("RATE_LIMIT_LOGIN_PER_CLIENT", DEFAULT_LOGIN_LIMIT),
            login_window: Duration::from_secs(env_parse("RATE_LIMIT_LOGIN_WINDOW_SECS", DEFAULT_LOGIN_WINDOW_SECS)),
            redeem_limit: env_parse("RATE_LIMIT_REDEEM_PER_CLIENT", DEFAULT_REDEEM_LIMIT),
            redeem_window: Duration::from_secs(env_parse("RATE_LIMIT_REDEEM_WINDOW_SECS", DEFAULT_REDEEM_WINDOW_SECS)),
            global_limit: env_parse("RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(env_parse("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_limit: DEFAULT_LOGIN_LIMIT,
            login_window: Duration::from_secs(DEFAULT_LOGIN_WINDOW_SECS),
            redeem_limit: DEFAULT_REDEEM_LIMIT,
            redeem_window: Duration::from_secs(DEFAULT_REDEEM_WINDOW_SECS),
            global_limit: DEFAULT_GLOBAL_LIMIT,
            global_window: Duration::from_secs(DEFAULT_GLOBAL_WINDOW_SECS),
        }
    }
}

/// Which counter family a request is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    Login,
    Redeem,
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("too many attempts (max {limit} requests/{window_secs}s)")]
    PerKeyExceeded { limit: usize, window_secs: u64 },
    #[error("service is busy (max {limit} requests/{window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

impl crate::error::ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: std::sync::Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

#[derive(Default)]
struct RateLimiterInner {
    /// Per-scope, per-key request timestamps.
    keyed: HashMap<(RateLimitScope, String), VecDeque<Instant>>,
    /// Global request timestamps.
    global: VecDeque<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { inner: std::sync::Arc::new(Mutex::new(RateLimiterInner::default())), config }
    }

    /// Check both per-key and global limits, then record the request.
    pub fn check_and_record(&self, scope: RateLimitScope, key: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(scope, key, Instant::now())
    }

    fn check_and_record_at(&self, scope: RateLimitScope, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;
        let (limit, window) = cfg.scope_limit(scope);

        // Keys that have aged out of their window are dropped entirely.
        inner.keyed.retain(|(key_scope, _), deque| {
            prune_window(deque, now, cfg.scope_limit(*key_scope).1);
            !deque.is_empty()
        });

        prune_window(&mut inner.global, now, cfg.global_window);
        if inner.global.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let deque = inner.keyed.entry((scope, key.to_owned())).or_default();
        if deque.len() >= limit {
            return Err(RateLimitError::PerKeyExceeded { limit, window_secs: window.as_secs() });
        }

        deque.push_back(now);
        inner.global.push_back(now);
        Ok(())
    }

    /// Forget the per-key window, e.g. after a successful login.
    pub fn reset(&self, scope: RateLimitScope, key: &str) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.keyed.remove(&(scope, key.to_owned()));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
