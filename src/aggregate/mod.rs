//! Result aggregation.
//!
//! - [`ResultAggregator`]: per-subroutine sink (executions + failure histogram)
//! - [`BatchResult`], [`SubroutineResult`]: what `run_batch` returns

mod aggregator;
mod batch;

pub use aggregator::{Recorded, ResultAggregator};
pub use batch::{BatchResult, SubroutineResult};
