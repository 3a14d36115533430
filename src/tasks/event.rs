//! # Results produced by an exploration task.
//!
//! ```text
//! Producer::step() ──► Step::Emit(ResultEvent) ──► channel ──► ResultAggregator
//!                  ├─► Step::Progress            (work done, nothing to report)
//!                  └─► Step::Exhausted           (search space done)
//! ```

/// Where an execution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Found by the expensive path-exploring engine.
    Explored,
    /// Produced by the cheap fallback engine after the degrade switch.
    Fallback,
}

/// One successful execution of a subroutine.
///
/// `value` is opaque to the scheduler; `origin` is stamped by the task that
/// emitted it and `tainted_by_forced_mocking` by the scheduler when it routes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution<T> {
    pub value: T,
    pub origin: Origin,
    /// A forced-mock side effect fired during the turn this execution was produced in.
    pub tainted_by_forced_mocking: bool,
}

impl<T> Execution<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            origin: Origin::Explored,
            tainted_by_forced_mocking: false,
        }
    }
}

/// One item of a task's result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEvent<T> {
    Success(Execution<T>),
    Failure(String),
}

impl<T> ResultEvent<T> {
    pub fn success(value: T) -> Self {
        ResultEvent::Success(Execution::new(value))
    }

    pub fn failure(description: impl Into<String>) -> Self {
        ResultEvent::Failure(description.into())
    }
}

/// Outcome of one unit of producer work (one path, one candidate input, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Report a result; the emit itself is a suspension point.
    Emit(ResultEvent<T>),
    /// Work was done but nothing is reported.
    Progress,
    /// Nothing left to explore.
    Exhausted,
}

impl<T> Step<T> {
    pub fn success(value: T) -> Self {
        Step::Emit(ResultEvent::success(value))
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Step::Emit(ResultEvent::failure(description))
    }
}
