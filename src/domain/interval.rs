use std::time::Duration;

use thiserror::Error;

/// Upstream allowance of quota-consuming calls per day.
pub const DAILY_CALL_ALLOWANCE: u64 = 1440;

pub const MIN_INTERVAL: Duration = Duration::from_secs(60);
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cadence of the usage lookup. Not charged against [`DAILY_CALL_ALLOWANCE`].
pub const QUOTA_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error(
        "current intervals would result in API usage exceeding the maximum daily allowance \
         ({calls_per_day} calls per day, allowance {allowance})"
    )]
    BudgetExceeded { calls_per_day: u64, allowance: u64 },
}

/// Effective poll periods of the two quota-consuming tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalConfig {
    pub real_time: Duration,
    pub status: Duration,
}

impl IntervalConfig {
    /// Calls per day made by the real-time and status tasks together.
    pub fn calls_per_day(&self) -> u64 {
        calls_per_day(self.real_time) + calls_per_day(self.status)
    }

    pub fn check_budget(&self) -> Result<(), IntervalError> {
        let calls_per_day = self.calls_per_day();
        if calls_per_day > DAILY_CALL_ALLOWANCE {
            return Err(IntervalError::BudgetExceeded {
                calls_per_day,
                allowance: DAILY_CALL_ALLOWANCE,
            });
        }
        Ok(())
    }
}

/// Clamp both intervals to `[MIN_INTERVAL, MAX_INTERVAL]`, then check the
/// clamped values against the daily budget.
///
/// The clamped intervals are returned even when the budget check fails so
/// callers can report what would have been used.
pub fn validate(
    real_time: Duration,
    status: Duration,
) -> (IntervalConfig, Result<(), IntervalError>) {
    let intervals = IntervalConfig {
        real_time: clamp(real_time),
        status: clamp(status),
    };
    let outcome = intervals.check_budget();
    (intervals, outcome)
}

fn clamp(interval: Duration) -> Duration {
    interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

fn calls_per_day(interval: Duration) -> u64 {
    // whole calls only; a partial period at the end of the day is not charged
    (MAX_INTERVAL.as_nanos() / interval.as_nanos().max(1)) as u64
}
