// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded backoff for polling submitted changes, and HTTP status classification.
//!
//! Cloud DNS applies changes asynchronously. The reconciler polls a change until it
//! leaves the `pending` state, sleeping for an interval that starts at the configured
//! poll interval and grows exponentially up to a cap. The total wait is bounded so a
//! change that never completes surfaces as an error instead of stalling the event loop.

use std::time::Duration;

use crate::constants::{
    CHANGE_POLL_MULTIPLIER, DEFAULT_CHANGE_POLL_INTERVAL_MILLIS, DEFAULT_CHANGE_TIMEOUT_SECS,
    MAX_CHANGE_POLL_INTERVAL_SECS,
};

/// Tunables for waiting on a submitted change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Delay before the first status poll
    pub initial_interval: Duration,
    /// Upper bound for a single delay
    pub max_interval: Duration,
    /// Growth factor applied after each poll
    pub multiplier: f64,
    /// Total time budget for the wait
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(DEFAULT_CHANGE_POLL_INTERVAL_MILLIS),
            max_interval: Duration::from_secs(MAX_CHANGE_POLL_INTERVAL_SECS),
            multiplier: CHANGE_POLL_MULTIPLIER,
            timeout: Duration::from_secs(DEFAULT_CHANGE_TIMEOUT_SECS),
        }
    }
}

impl PollPolicy {
    /// Policy with a custom first interval and total timeout, default growth.
    #[must_use]
    pub fn new(initial_interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_interval,
            max_interval: Duration::from_secs(MAX_CHANGE_POLL_INTERVAL_SECS).max(initial_interval),
            timeout,
            ..Self::default()
        }
    }

    /// Start a fresh backoff sequence for one change.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            remaining: self.timeout,
        }
    }
}

/// Exponential backoff over a fixed time budget.
///
/// The budget is accounted in slept time rather than wall-clock time, which keeps the
/// sequence deterministic and lets tests drive it with a paused tokio clock.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Interval returned by the next call to [`ExponentialBackoff::next_backoff`]
    pub current_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Budget left before giving up
    remaining: Duration,
}

impl ExponentialBackoff {
    /// Get the next backoff interval, or `None` once the budget is spent.
    ///
    /// The last interval is clipped so the sum of all returned intervals never
    /// exceeds the budget.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining.is_zero() {
            return None;
        }

        let interval = self.current_interval.min(self.remaining);
        self.remaining -= interval;

        let next = self.current_interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(interval)
    }
}

/// Determine if an HTTP status code is retryable.
///
/// # Retryable Status Codes
///
/// - **429** (Too Many Requests) - Rate limiting / quota
/// - **500** (Internal Server Error) - Server error
/// - **502** (Bad Gateway) - Proxy/gateway error
/// - **503** (Service Unavailable) - Temporary unavailability
/// - **504** (Gateway Timeout) - Gateway timeout
#[must_use]
pub fn is_retryable_status_code(status_code: u16) -> bool {
    matches!(status_code, 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
