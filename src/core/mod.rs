//! Runtime core: batch orchestration and lifecycle.
//!
//! The only public API from this module is [`Scheduler`] (and its builder),
//! which time-slices exploration tasks and tears them down on the deadline.
//!
//! Internal modules:
//! - [`scheduler`]: plans the budget, runs the round-robin drive loop, reaps tasks;
//! - [`watchdog`]: elapsed-time policy (degrade, deadline, interrupt);
//! - [`lane`]: scheduler-side state of one subroutine (stream, aggregator, join handle);
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod lane;
mod scheduler;
mod shutdown;
mod watchdog;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
