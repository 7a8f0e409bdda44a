// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rate-limit gate for outbound CI calls.
//!
//! One [`RateLimiter`] is constructed per process and shared (via `Arc`) by
//! every component that calls the CI source. It enforces a global minimum
//! interval between calls: concurrent workers queue on the gate, then do
//! their parsing work in parallel.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Minimum-interval gate shared by all workers.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Gate allowing at most `calls_per_second` calls per second.
    ///
    /// Non-positive or non-finite rates disable the gate.
    pub fn new(calls_per_second: f64) -> Self {
        let min_interval = if calls_per_second.is_finite() && calls_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / calls_per_second)
        } else {
            Duration::ZERO
        };
        Self::with_interval(min_interval)
    }

    /// Gate with an explicit minimum interval.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Gate that never waits.
    pub fn unlimited() -> Self {
        Self::with_interval(Duration::ZERO)
    }

    /// Minimum interval between two calls.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next call is allowed, then claim the slot.
    ///
    /// The first call passes immediately.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                trace!(wait_ms = wait.as_millis() as u64, "rate limit gate waiting");
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(gh_perf_report_core::config::DEFAULT_API_RATE_LIMIT)
    }
}
