//! Trial window computation
//!
//! Pure elapsed-time math over a stored trial start. Elapsed days use
//! whole-day truncation of the timestamp difference, never calendar-day
//! boundaries, so a trial started at 23:59 is not a day old one minute
//! later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trial window length applied when no override is configured.
pub const DEFAULT_TRIAL_LENGTH_DAYS: i64 = 10;

/// Derived trial state for one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialState {
    /// When the trial began. Set once, never mutated.
    pub started_at: DateTime<Utc>,
    /// Whole days since the start, truncated. Never negative.
    pub elapsed_days: i64,
    /// Days left in the window, floored at zero.
    pub remaining_days: i64,
    /// Whether the window has been used up.
    pub expired: bool,
}

/// Compute the trial state for `now`.
///
/// A missing `started_at` means the trial begins at `now`; persisting that
/// value back is the caller's job, this function stays pure. A start in
/// the future (clock rolled back) counts as zero elapsed days rather than
/// going negative.
pub fn compute_trial(
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    trial_length_days: i64,
) -> TrialState {
    let started_at = started_at.unwrap_or(now);
    let elapsed_days = (now - started_at).num_days().max(0);
    let remaining_days = (trial_length_days - elapsed_days).max(0);

    TrialState {
        started_at,
        elapsed_days,
        remaining_days,
        expired: elapsed_days >= trial_length_days,
    }
}
