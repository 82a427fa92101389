//! Request pacing for rate-limited chat APIs.
//!
//! Startup reconciliation issues one membership lookup per (user, server) pair. These are
//! paced by a token bucket with a burst of one, so the call cadence never exceeds one
//! request per configured interval, no matter how quickly the lookups themselves return.

use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::base::config::Config;

/// A token-bucket pacer; a zero interval disables pacing.
pub struct Pacer {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Pacer {
    /// Create a pacer that allows one call per `interval`.
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval).map(RateLimiter::direct);
        Self { limiter }
    }

    /// Create a pacer that never waits.
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    /// Wait until the next call is allowed.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// The pacers used during startup reconciliation.
pub struct ReconcilePacing {
    /// Paces guild member lookups.
    pub member_lookups: Pacer,
    /// Paces moving on to the next authorized user.
    pub users: Pacer,
}

impl ReconcilePacing {
    /// Build the pacers from the configured intervals.
    pub fn from_config(config: &Config) -> Self {
        Self {
            member_lookups: Pacer::new(config.member_lookup_interval()),
            users: Pacer::new(config.user_reconcile_interval()),
        }
    }

    /// Pacing that never waits.
    pub fn unlimited() -> Self {
        Self {
            member_lookups: Pacer::unlimited(),
            users: Pacer::unlimited(),
        }
    }
}

// Tests.
