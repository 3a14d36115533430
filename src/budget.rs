//! # Time budget planning.
//!
//! [`plan`] turns a caller timeout and a task count into an immutable
//! [`TimeBudget`] shared (read-only) by the whole batch:
//!
//! ```text
//! total ──┬── exploration = total - fallback ──┬── slice  = exploration / (tasks * 2)
//!         │                                    └── solver = min(exploration / tasks, solver cap)
//!         └── fallback = min(total / 2, fallback cap * tasks)
//! ```
//!
//! ## Rules
//! - `exploration > 10ms` and `fallback > 10ms`, and `slice >= 1ms`; otherwise
//!   [`PlanError::BudgetTooSmall`] is returned.
//! - `tasks == 0` or `total == 0` produce an empty budget
//!   ([`TimeBudget::is_empty`]): the scheduler grants no turns at all.
//! - Integer milliseconds, truncating division.

use std::time::Duration;

use crate::error::PlanError;

/// Smallest share (exclusive) accepted for both the exploration and the fallback phase.
pub const MIN_PHASE_MS: u64 = 10;

/// Budget of one batch, computed once by [`plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    /// Caller-supplied ceiling for the whole batch.
    pub total_ms: u64,
    /// Time reserved for the cheap fallback phase.
    pub fallback_ms: u64,
    /// Time for the expensive exploration phase (`total - fallback`).
    pub exploration_ms: u64,
    /// Wall-clock slice granted to one task per round-robin turn.
    pub slice_ms: u64,
    /// Constraint-solving sub-budget handed to each engine.
    pub solver_cap_ms: u64,
    /// Number of tasks the budget was planned for.
    pub task_count: usize,
}

impl TimeBudget {
    /// Budget that grants no turns.
    pub fn empty(total_ms: u64, task_count: usize) -> Self {
        Self {
            total_ms,
            fallback_ms: 0,
            exploration_ms: 0,
            slice_ms: 0,
            solver_cap_ms: 0,
            task_count,
        }
    }

    /// Returns true if no turn will be granted under this budget.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.task_count == 0 || self.total_ms == 0
    }

    #[inline]
    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }

    #[inline]
    pub fn exploration(&self) -> Duration {
        Duration::from_millis(self.exploration_ms)
    }

    #[inline]
    pub fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }

    #[inline]
    pub fn slice(&self) -> Duration {
        Duration::from_millis(self.slice_ms)
    }

    #[inline]
    pub fn solver_cap(&self) -> Duration {
        Duration::from_millis(self.solver_cap_ms)
    }
}

impl std::fmt::Display for TimeBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total={}ms exploration={}ms fallback={}ms slice={}ms solver={}ms",
            self.total_ms, self.exploration_ms, self.fallback_ms, self.slice_ms, self.solver_cap_ms
        )
    }
}

/// Computes the budget of a batch.
///
/// Pure and total: never blocks, never panics.
///
/// # Example
/// ```
/// use genvisor::plan;
///
/// let b = plan(1000, 2, 300, 1000).unwrap();
/// assert_eq!(b.fallback_ms, 500);
/// assert_eq!(b.exploration_ms, 500);
/// assert_eq!(b.slice_ms, 125);
/// assert_eq!(b.solver_cap_ms, 250);
/// ```
pub fn plan(
    total_ms: u64,
    task_count: usize,
    per_task_fallback_cap_ms: u64,
    global_solver_cap_ms: u64,
) -> Result<TimeBudget, PlanError> {
    if task_count == 0 || total_ms == 0 {
        return Ok(TimeBudget::empty(total_ms, task_count));
    }
    let tasks = task_count as u64;

    let fallback_ms = (total_ms / 2).min(per_task_fallback_cap_ms.saturating_mul(tasks));
    let exploration_ms = total_ms - fallback_ms;
    let slice_ms = exploration_ms / tasks.saturating_mul(2);
    let solver_cap_ms = (exploration_ms / tasks).min(global_solver_cap_ms);

    if exploration_ms <= MIN_PHASE_MS || fallback_ms <= MIN_PHASE_MS || slice_ms == 0 {
        return Err(PlanError::BudgetTooSmall {
            total_ms,
            task_count,
            exploration_ms,
            fallback_ms,
            slice_ms,
        });
    }

    Ok(TimeBudget {
        total_ms,
        fallback_ms,
        exploration_ms,
        slice_ms,
        solver_cap_ms,
        task_count,
    })
}
