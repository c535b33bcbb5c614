//! Application Configuration
//!
//! Configuration for the promotion service.

use platform::config::{ConfigError, env_or};
use platform::rate_limit::RateLimitConfig;
use std::time::Duration;

/// Promotion service configuration
#[derive(Debug, Clone)]
pub struct PromotionConfig {
    /// Per-client admission limit applied to every promotion route
    pub rate_limit: RateLimitConfig,
    /// How often idle client windows are evicted
    pub sweep_interval: Duration,
    /// Identify clients by `X-Forwarded-For`; off unless a trusted proxy
    /// sets the header
    pub trust_forwarded_for: bool,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            sweep_interval: Duration::from_secs(300),
            trust_forwarded_for: false,
        }
    }
}

impl PromotionConfig {
    /// Relaxed limits for local development
    pub fn development() -> Self {
        Self {
            rate_limit: RateLimitConfig::new(1_000, 60),
            sweep_interval: Duration::from_secs(60),
            trust_forwarded_for: false,
        }
    }

    /// Read `RATE_LIMIT_MAX_REQUESTS`, `RATE_LIMIT_WINDOW_SECS`,
    /// `RATE_LIMIT_SWEEP_SECS` and `TRUST_FORWARDED_FOR`, falling back to the
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_requests = env_or("RATE_LIMIT_MAX_REQUESTS", defaults.rate_limit.max_requests)?;
        let window_secs = env_or(
            "RATE_LIMIT_WINDOW_SECS",
            defaults.rate_limit.window.as_secs(),
        )?;
        let sweep_secs = env_or("RATE_LIMIT_SWEEP_SECS", defaults.sweep_interval.as_secs())?;
        let trust_forwarded_for = env_or("TRUST_FORWARDED_FOR", defaults.trust_forwarded_for)?;

        Ok(Self {
            rate_limit: RateLimitConfig::new(max_requests, window_secs),
            sweep_interval: Duration::from_secs(sweep_secs.max(1)),
            trust_forwarded_for,
        })
    }
}
