//! Error types used by the scheduler, the budget planner and exploration tasks.
//!
//! This module defines three error enums:
//!
//! - [`PlanError`]: the budget cannot satisfy its invariants; raised before any task starts.
//! - [`TaskError`]: terminal errors raised by one exploration task's producer.
//! - [`RuntimeError`]: errors raised by the teardown of the scheduler itself.
//!
//! Running out of time is **not** an error: a batch that hits its deadline
//! still returns a (possibly partial) [`BatchResult`](crate::BatchResult).
//!
//! All types provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the budget planner.
///
/// Surfaced to the caller of [`Scheduler::run_batch`](crate::Scheduler::run_batch)
/// before any task is started; callers may clamp the task count or raise the
/// timeout and retry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The total timeout is too small for the number of tasks.
    #[error(
        "budget too small: total={total_ms}ms tasks={task_count} \
         (exploration={exploration_ms}ms, fallback={fallback_ms}ms, slice={slice_ms}ms)"
    )]
    BudgetTooSmall {
        /// Caller-supplied ceiling for the whole batch.
        total_ms: u64,
        /// Number of tasks the budget was planned for.
        task_count: usize,
        /// Computed exploration share (must exceed 10ms).
        exploration_ms: u64,
        /// Computed fallback share (must exceed 10ms).
        fallback_ms: u64,
        /// Computed per-turn slice (must be at least 1ms).
        slice_ms: u64,
    },
}

impl PlanError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use genvisor::plan;
    ///
    /// let err = plan(5, 1000, 300, 1000).unwrap_err();
    /// assert_eq!(err.as_label(), "plan_budget_too_small");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PlanError::BudgetTooSmall { .. } => "plan_budget_too_small",
        }
    }
}

/// # Errors produced by the teardown of a batch.
///
/// Never returned from `run_batch`: the batch still yields its results and the
/// error is published as a [`GraceExceeded`](crate::EventKind::GraceExceeded) event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Grace period was exceeded; some tasks remained stuck and were aborted.
    #[error("teardown grace {grace:?} exceeded; aborted: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Subroutines whose tasks did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by an exploration task.
///
/// Returned by a [`Producer`](crate::Producer) to end its task early.
/// `Fail` and `Fatal` are recorded in the subroutine's failure histogram;
/// `Canceled` is a graceful stop and records nothing.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Non-recoverable error in the engine.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The engine gave up on this subroutine.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task was cancelled by its controller.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use genvisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "solver crashed".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Description recorded in the failure histogram, `None` for graceful cancellation.
    pub fn description(&self) -> Option<String> {
        match self {
            TaskError::Canceled => None,
            e => Some(e.to_string()),
        }
    }
}
