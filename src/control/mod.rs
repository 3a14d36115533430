//! Task control: pause/resume, degrade and cancel signals.
//!
//! - [`TaskController`]: scheduler-owned writer of one task's flags
//! - [`ControlView`]: the read-only half consulted by the task at its checkpoints

mod controller;

pub use controller::{ControlView, TaskController};
