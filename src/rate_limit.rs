/// Rate Limiting System
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{LedgerError, LedgerResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(100) {
    Some(n) => n,
    None => unreachable!(),
};
const DEFAULT_BURST: NonZeroU32 = match NonZeroU32::new(50) {
    Some(n) => n,
    None => unreachable!(),
};

/// Rate limiter shared by every procedure
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    limiter: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(DEFAULT_RPS),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(DEFAULT_BURST));

        Self {
            enabled: config.enabled,
            limiter: Arc::new(GovernorLimiter::direct(quota)),
        }
    }

    /// Check whether another request may proceed
    pub fn check(&self) -> LedgerResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.limiter
            .check()
            .map_err(|_| LedgerError::RateLimitExceeded {
                retry_after: Duration::from_secs(1),
            })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, LedgerError> {
    ctx.rate_limiter.check().inspect_err(|_| {
        tracing::warn!(path = %request.uri().path(), "rate limit exceeded");
    })?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, rps: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled,
            requests_per_second: rps,
            burst_size: burst,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&config(true, 100, 50));

        // Should allow first request
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(true, 1, 5));

        // Should allow burst requests
        for _ in 0..5 {
            assert!(limiter.check().is_ok());
        }

        // Should hit rate limit after burst
        assert!(matches!(
            limiter.check(),
            Err(LedgerError::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_disabled_limiter_never_rejects() {
        let limiter = RateLimiter::new(&config(false, 1, 1));
        for _ in 0..20 {
            assert!(limiter.check().is_ok());
        }
    }

    #[test]
    fn test_zero_quota_falls_back_to_defaults() {
        let limiter = RateLimiter::new(&config(true, 0, 0));
        assert!(limiter.check().is_ok());
    }
}
