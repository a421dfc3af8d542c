//! Freshness tracking for the polled sensor state.
//!
//! The cache never stores the value itself, the characteristic does. It only
//! remembers when the last successful query happened.

use crate::error::{Result, SensorError};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Configured value meaning "never expire".
pub const INFINITE_SENTINEL: i64 = -1;

/// Time-to-live of a successful query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Query once, then never again.
    Infinite,
    /// Re-query once this much time has elapsed. Zero means always query.
    For(Duration),
}

impl CacheTtl {
    /// Build from the configured millisecond value.
    pub fn from_millis(millis: i64) -> Result<Self> {
        match millis {
            INFINITE_SENTINEL => Ok(CacheTtl::Infinite),
            m if m < 0 => Err(SensorError::Configuration(format!(
                "statusCache must be >= 0 or {} (infinite), got {}",
                INFINITE_SENTINEL, m
            ))),
            m => Ok(CacheTtl::For(Duration::from_millis(m as u64))),
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        CacheTtl::For(Duration::ZERO)
    }
}

pub struct FreshnessCache {
    ttl: CacheTtl,
    last_queried: Mutex<Option<Instant>>,
}

impl FreshnessCache {
    /// Create an expired cache. The first `should_query()` is always true.
    pub fn new(ttl: CacheTtl) -> Self {
        Self {
            ttl,
            last_queried: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    pub fn is_infinite(&self) -> bool {
        self.ttl == CacheTtl::Infinite
    }

    pub fn should_query(&self) -> bool {
        let Some(last) = *self.last_queried.lock() else {
            return true;
        };

        match self.ttl {
            CacheTtl::Infinite => false,
            CacheTtl::For(ttl) => last.elapsed() >= ttl,
        }
    }

    /// Record a successful refresh at the current instant.
    pub fn queried(&self) {
        *self.last_queried.lock() = Some(Instant::now());
    }

    pub fn last_queried(&self) -> Option<Instant> {
        *self.last_queried.lock()
    }
}
