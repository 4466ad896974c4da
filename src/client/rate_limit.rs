//! Rate limiting
//!
//! Two independent limiters live here:
//!
//! - [`RateLimiterSet`]: per-asset-class outbound throttles that only
//!   activate after an origin answers 429.
//! - [`ActionRateLimiter`]: a persisted fixed-window counter keyed by action
//!   name, guarding operator actions such as bulk cache clears.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::cache::CacheStorage;
use crate::cache::matcher::AssetClass;
use crate::error::CacheError;

/// Outbound request budget per asset class (requests per second).
///
/// Own-origin assets get a generous budget; third-party CDNs and the data
/// API get less.
pub fn class_rate_limit(class: AssetClass) -> f64 {
    match class {
        AssetClass::Static => 50.0,
        AssetClass::Image => 20.0,
        AssetClass::Font => 20.0,
        AssetClass::Api => 6.0,
        AssetClass::Cdn => 10.0,
        AssetClass::Dynamic => 10.0,
    }
}

/// Rate limiter state for a single asset class.
pub struct ClassRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    active: AtomicBool,
    class: AssetClass,
}

impl ClassRateLimiter {
    pub fn new(class: AssetClass) -> Self {
        let rate = class_rate_limit(class);

        // Handle sub-1 rates by using per-minute quotas
        let quota = if rate >= 1.0 {
            Quota::per_second(NonZeroU32::new(rate as u32).unwrap_or(NonZeroU32::MIN))
        } else {
            let per_min = (rate * 60.0).round() as u32;
            Quota::per_minute(NonZeroU32::new(per_min).unwrap_or(NonZeroU32::MIN))
        };

        Self {
            limiter: RateLimiter::direct(quota),
            active: AtomicBool::new(false),
            class,
        }
    }

    /// Activate rate limiting for this class.
    pub fn activate(&self) {
        let was_active = self.active.swap(true, Ordering::SeqCst);
        if !was_active {
            debug!("Rate limiting activated for {} requests", self.class);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for permission if rate limiting is active.
    pub async fn wait_if_active(&self) {
        if self.is_active() {
            debug!("Waiting for {} rate limiter", self.class);
            self.limiter.until_ready().await;
        }
    }
}

/// Outbound limiters for every asset class.
pub struct RateLimiterSet {
    limiters: RwLock<HashMap<AssetClass, ClassRateLimiter>>,
}

impl Default for RateLimiterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterSet {
    pub fn new() -> Self {
        let map = AssetClass::ALL
            .into_iter()
            .map(|class| (class, ClassRateLimiter::new(class)))
            .collect();

        Self {
            limiters: RwLock::new(map),
        }
    }

    /// Wait for permission for a class (if active).
    pub async fn wait_for(&self, class: AssetClass) {
        let limiters = self.limiters.read().await;
        if let Some(limiter) = limiters.get(&class) {
            limiter.wait_if_active().await;
        }
    }

    /// Activate rate limiting for a class (called on 429).
    pub async fn activate(&self, class: AssetClass) {
        let limiters = self.limiters.read().await;
        if let Some(limiter) = limiters.get(&class) {
            limiter.activate();
        }
    }

    #[cfg(test)]
    pub async fn is_active(&self, class: AssetClass) -> bool {
        let limiters = self.limiters.read().await;
        limiters.get(&class).is_some_and(ClassRateLimiter::is_active)
    }
}

/// Longest window a rule may configure (one year)
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Fixed-window rule for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Allowed attempts per window
    pub max: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitRule {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Persisted counter for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterState {
    pub count: u32,
    /// Epoch milliseconds after which the window restarts
    pub reset_time: i64,
}

impl RateLimiterState {
    /// Apply one attempt at `now_ms`. Returns whether it is allowed.
    ///
    /// A lapsed window restarts at `count = 1`. Inside the window the count
    /// only grows while below `max`, so a denied attempt leaves it unchanged.
    pub fn attempt(&mut self, rule: &RateLimitRule, now_ms: i64) -> bool {
        if now_ms > self.reset_time {
            self.count = 1;
            self.reset_time = now_ms.saturating_add(window_millis(rule));
            return true;
        }

        if self.count < rule.max {
            self.count += 1;
            true
        } else {
            false
        }
    }

    fn fresh(rule: &RateLimitRule, now_ms: i64) -> Self {
        Self {
            count: 1,
            reset_time: now_ms.saturating_add(window_millis(rule)),
        }
    }
}

fn window_millis(rule: &RateLimitRule) -> i64 {
    i64::try_from(rule.window().as_millis()).unwrap_or(i64::MAX)
}

/// Fixed-window limiter whose state survives between runs
pub struct ActionRateLimiter<'a> {
    storage: &'a CacheStorage,
    rules: &'a HashMap<String, RateLimitRule>,
}

impl<'a> ActionRateLimiter<'a> {
    pub fn new(storage: &'a CacheStorage, rules: &'a HashMap<String, RateLimitRule>) -> Self {
        Self { storage, rules }
    }

    /// Record an attempt of `action` at `now_ms`; actions without a rule are always allowed
    pub fn check_at(&self, action: &str, now_ms: i64) -> Result<bool, CacheError> {
        let Some(rule) = self.rules.get(action) else {
            return Ok(true);
        };

        let (allowed, state) = match self.storage.load_rate_limit(action)? {
            Some(mut state) => {
                let allowed = state.attempt(rule, now_ms);
                (allowed, state)
            }
            None => (true, RateLimiterState::fresh(rule, now_ms)),
        };

        self.storage.save_rate_limit(action, &state)?;
        if !allowed {
            debug!("Action '{}' denied by rate limit", action);
        }
        Ok(allowed)
    }

    pub fn check(&self, action: &str) -> Result<bool, CacheError> {
        self.check_at(action, crate::cache::freshness::now_millis())
    }
}
