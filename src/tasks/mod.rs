//! # Exploration tasks and the engine contract.
//!
//! This module provides the task-related types:
//! - [`SubroutineId`] - key of one subroutine under test
//! - [`Producer`], [`EngineFactory`] - the opaque engine the scheduler drives
//! - [`StepFn`] - closure-backed producer
//! - [`ExplorationTask`] - checkpoint loop honoring pause / degrade / cancel
//! - [`ResultEvent`], [`Execution`], [`Step`] - what a task produces
//! - [`MockSignals`] - forced-mocking side channel

mod event;
mod id;
mod producer;
mod signals;
mod step_fn;
mod task;

pub use event::{Execution, Origin, ResultEvent, Step};
pub use id::SubroutineId;
pub use producer::{EngineFactory, ExploreParams, Preflight, Producer};
pub use signals::MockSignals;
pub use step_fn::StepFn;
pub use task::{EventStream, ExplorationTask, Outcome, TaskExit};
