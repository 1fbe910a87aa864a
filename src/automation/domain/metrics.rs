//! Metrics value types: bounded date ranges, paging, and tallies.

use super::{DateRangeError, ExecutionOutcome, SuppressionReason};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validated inclusive time window for ledger queries.
///
/// Bounded to keep aggregation queries cheap: at most
/// [`DateRange::MAX_WINDOW_DAYS`] days wide, with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl DateRange {
    /// Widest accepted window, in days.
    pub const MAX_WINDOW_DAYS: i64 = 90;

    /// Creates a validated range.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::Inverted`] when `from > to` and
    /// [`DateRangeError::WindowTooWide`] when the window exceeds the cap.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, DateRangeError> {
        if from > to {
            return Err(DateRangeError::Inverted { from, to });
        }
        let days = (to - from).num_days();
        if days > Self::MAX_WINDOW_DAYS {
            return Err(DateRangeError::WindowTooWide {
                days,
                max: Self::MAX_WINDOW_DAYS,
            });
        }
        Ok(Self { from, to })
    }

    /// Returns the inclusive start.
    #[must_use]
    pub const fn from(&self) -> DateTime<Utc> {
        self.from
    }

    /// Returns the inclusive end.
    #[must_use]
    pub const fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Returns `true` when the timestamp falls inside the range.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }

    /// Returns the last `days` days ending at `now`.
    ///
    /// `days` must not exceed the cap; used by services to build default
    /// windows.
    #[must_use]
    pub fn trailing(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            from: now - Duration::days(days),
            to: now,
        }
    }
}

/// Offset/limit paging for ledger listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    limit: usize,
    offset: usize,
}

impl Page {
    /// Creates a page selector.
    #[must_use]
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Returns the maximum number of rows to return.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

/// Evaluation tally for one rule (or one workflow, when merged) over a
/// range: counts of evaluations by outcome with a per-reason suppression
/// breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTally {
    /// Total evaluations recorded.
    pub evaluated: u64,
    /// Evaluations that applied the rule.
    pub applied: u64,
    /// Evaluations that suppressed the rule.
    pub suppressed: u64,
    /// Suppressed evaluations broken down by reason.
    pub breakdown: BTreeMap<SuppressionReason, u64>,
}

impl RuleTally {
    /// Folds one ledger outcome into the tally.
    pub fn record(&mut self, outcome: ExecutionOutcome) {
        self.evaluated += 1;
        match outcome.suppression_reason() {
            None => self.applied += 1,
            Some(reason) => {
                self.suppressed += 1;
                *self.breakdown.entry(reason).or_default() += 1;
            }
        }
    }

    /// Merges another tally into this one.
    pub fn merge(&mut self, other: &Self) {
        self.evaluated += other.evaluated;
        self.applied += other.applied;
        self.suppressed += other.suppressed;
        for (reason, count) in &other.breakdown {
            *self.breakdown.entry(*reason).or_default() += count;
        }
    }
}
