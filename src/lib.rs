//! # genvisor
//!
//! **Genvisor** is a time-sliced scheduler for batches of test-generation tasks.
//!
//! Given a list of subroutines and one total timeout, it splits the timeout into
//! an exploration phase and a fallback phase, runs one exploration task per
//! subroutine, and lets exactly one of them execute at a time in round-robin
//! slices. Once the exploration phase is over every task is told to degrade to
//! its cheap fallback engine; at the deadline every task is cancelled and the
//! partial results of the batch are returned.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     subroutines + total timeout
//!                 │
//!                 ▼
//!      plan() ──► TimeBudget { exploration | fallback, slice, solver cap }
//!                 │
//!                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (batch orchestrator)                                   │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - Watchdog (degrade at exploration end, cancel at deadline)      │
//! │  - one TaskController per subroutine (pause / resume / degrade)   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
//!  │ Exploration  │   │ Exploration  │   │ Exploration  │      │
//!  │   Task #1    │   │   Task #2    │   │   Task #3    │      │
//!  │ explorer ──► │   │ explorer ──► │   │ explorer ──► │      │
//!  │   fallback   │   │   fallback   │   │   fallback   │      │
//!  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘      │
//!         │ ResultEvent      │                  │              │
//!         ▼                  ▼                  ▼              ▼
//!  ResultAggregator   ResultAggregator   ResultAggregator     Bus
//!  (executions +      ...                ...                   │
//!   failure counts)                                            ▼
//!                                                       SubscriberSet
//!                                                     (per-sub queues)
//! ```
//!
//! ### Turn cycle
//! ```text
//! loop over active tasks, in submission order {
//!   ├─► task already exited? ─► collect its results, skip
//!   ├─► reset the task's mock signals, resume(task)           TurnStarted
//!   ├─► until slice elapsed or task exhausted:
//!   │       ├─ watchdog: elapsed > exploration ─► degrade all (once)
//!   │       ├─ watchdog: elapsed > total       ─► cancel all, stop
//!   │       └─ route results into the task's aggregator
//!   └─► pause(task)                                          TurnEnded
//! }
//! teardown: cancel all ─► wait up to grace ─► abort stragglers ─► BatchResult
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                           |
//! |-------------------|-----------------------------------------------------------------|----------------------------------------------|
//! | **Budget**        | Split one timeout into phases, slices and the solver cap.       | [`plan`], [`TimeBudget`]                     |
//! | **Scheduling**    | Round-robin time slicing with degrade and hard deadline.        | [`Scheduler`], [`SchedulerBuilder`]          |
//! | **Engines**       | Plug in explorer and fallback producers.                        | [`EngineFactory`], [`Producer`], [`StepFn`]  |
//! | **Results**       | Executions in discovery order, failures collapsed to counts.    | [`BatchResult`], [`ResultAggregator`]        |
//! | **Subscriber API**| Hook into batch events (logging, metrics, custom subscribers).  | [`Subscribe`]                                |
//! | **Errors**        | Typed errors for planning, teardown and producers.              | [`PlanError`], [`RuntimeError`], [`TaskError`] |
//! | **Configuration** | Centralize batch settings.                                      | [`Config`]                                   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use genvisor::{
//!     Config, EngineFactory, ExploreParams, Producer, SchedulerBuilder, Step, StepFn,
//!     SubroutineId, TaskError,
//! };
//!
//! struct Counter;
//!
//! impl EngineFactory for Counter {
//!     type Output = u32;
//!
//!     fn explorer(&self, _id: &SubroutineId, _p: &ExploreParams) -> Box<dyn Producer<u32>> {
//!         let mut left = 3u32;
//!         StepFn::boxed(move || {
//!             let step = if left == 0 {
//!                 Step::Exhausted
//!             } else {
//!                 left -= 1;
//!                 Step::success(left)
//!             };
//!             async move { Ok::<_, TaskError>(step) }
//!         })
//!     }
//!
//!     fn fallback(
//!         &self,
//!         _id: &SubroutineId,
//!         _p: &ExploreParams,
//!         explorer: Box<dyn Producer<u32>>,
//!     ) -> Box<dyn Producer<u32>> {
//!         explorer
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = SchedulerBuilder::new(Config::default()).build(Counter);
//!
//!     let results = scheduler
//!         .run_batch(["Foo.bar", "Foo.baz"], Duration::from_secs(2))
//!         .await?;
//!
//!     let bar = results.get("Foo.bar").expect("submitted");
//!     assert_eq!(bar.executions.len(), 3);
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```

mod aggregate;
mod budget;
mod config;
mod control;
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use aggregate::{BatchResult, Recorded, ResultAggregator, SubroutineResult};
pub use budget::{MIN_PHASE_MS, TimeBudget, plan};
pub use config::{Config, DEFAULT_ALWAYS_MOCKED, MockStrategy};
pub use control::{ControlView, TaskController};
pub use crate::core::{Scheduler, SchedulerBuilder};
pub use error::{PlanError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    EngineFactory, EventStream, Execution, ExplorationTask, ExploreParams, MockSignals, Origin,
    Outcome, Preflight, Producer, ResultEvent, Step, StepFn, SubroutineId, TaskExit,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
