//! Runtime configuration for the marketplace workflows.

use crate::application::retry::RetryPolicy;

/// Rental duration used when a request does not name one.
pub const DEFAULT_RENTAL_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    /// Days booked by `request_rental` when the caller passes no duration.
    ///
    /// Default: 14
    pub default_rental_days: u32,

    /// Replay policy for commits that lose an optimistic-concurrency race.
    pub retry: RetryPolicy,
}

impl MarketConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default rental duration.
    #[must_use]
    pub fn with_default_rental_days(mut self, days: u32) -> Self {
        self.default_rental_days = days;
        self
    }

    /// Set the conflict retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            default_rental_days: DEFAULT_RENTAL_DAYS,
            retry: RetryPolicy::default(),
        }
    }
}
