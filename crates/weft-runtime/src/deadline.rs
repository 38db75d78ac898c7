#![forbid(unsafe_code)]

//! Idle-period deadlines.
//!
//! A [`Deadline`] answers one question for the work loop: how much of the
//! current idle period is left. Hosts hand the loop whatever deadline their
//! idle mechanism provides; [`TimeBudget`] covers wall-clock periods,
//! [`UnitBudget`] gives deterministic turn sizes for tests, and [`Unbounded`]
//! never asks the loop to yield.

use std::cell::Cell;
use std::time::Duration;

use web_time::Instant;

/// Remaining time in the current idle period.
pub trait Deadline {
    /// Time left before the host wants control back.
    fn time_remaining(&self) -> Duration;

    /// Whether the period is already exhausted.
    fn did_timeout(&self) -> bool {
        self.time_remaining().is_zero()
    }
}

/// Cap for periods whose end is not representable as an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A wall-clock idle period.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    end: Instant,
}

impl TimeBudget {
    /// Period of `budget` starting now.
    ///
    /// A budget too large to add to the current instant is clamped to a
    /// year, which the loop treats as unbounded.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        let now = Instant::now();
        Self::until(now.checked_add(budget).unwrap_or_else(|| now + FAR_FUTURE))
    }

    /// Period ending at `end`.
    #[must_use]
    pub fn until(end: Instant) -> Self {
        Self { end }
    }
}

impl Deadline for TimeBudget {
    fn time_remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}

/// A period measured in budget checks rather than time.
///
/// Each query consumes one check. The first `checks - 1` queries report an
/// unlimited budget and every later query reports none, so with the default
/// scheduler configuration a turn performs exactly `checks` units of work
/// (at least one).
#[derive(Debug)]
pub struct UnitBudget {
    left: Cell<usize>,
}

impl UnitBudget {
    /// Budget allowing `units` units of work.
    #[must_use]
    pub fn new(units: usize) -> Self {
        Self {
            left: Cell::new(units),
        }
    }

    /// Checks not yet consumed.
    #[must_use]
    pub fn remaining_checks(&self) -> usize {
        self.left.get()
    }
}

impl Deadline for UnitBudget {
    fn time_remaining(&self) -> Duration {
        let left = self.left.get().saturating_sub(1);
        self.left.set(left);
        if left > 0 { Duration::MAX } else { Duration::ZERO }
    }
}

/// A period that never runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_budget_grants_one_less_check_than_units() {
        let budget = UnitBudget::new(3);
        assert!(!budget.did_timeout());
        assert!(!budget.did_timeout());
        assert!(budget.did_timeout());
        assert!(budget.did_timeout());
        assert_eq!(budget.remaining_checks(), 0);
    }

    #[test]
    fn oversized_time_budget_is_clamped() {
        let budget = TimeBudget::new(Duration::MAX);
        assert!(!budget.did_timeout());
        assert!(budget.time_remaining() > FAR_FUTURE - Duration::from_secs(60));
    }

    #[test]
    fn zero_unit_budget_is_exhausted() {
        assert!(UnitBudget::new(0).did_timeout());
        assert!(UnitBudget::new(1).did_timeout());
    }

    #[test]
    fn elapsed_time_budget_reports_zero() {
        let budget = TimeBudget::until(Instant::now());
        assert_eq!(budget.time_remaining(), Duration::ZERO);
        assert!(budget.did_timeout());
    }

    #[test]
    fn fresh_time_budget_has_time_left() {
        let budget = TimeBudget::new(Duration::from_secs(60));
        assert!(budget.time_remaining() > Duration::from_secs(30));
    }

    #[test]
    fn unbounded_never_times_out() {
        assert!(!Unbounded.did_timeout());
    }
}
