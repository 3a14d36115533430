//! # Engine contract.
//!
//! The scheduler treats the exploration engine as an opaque producer of
//! [`Step`]s. An [`EngineFactory`] builds one expensive explorer per
//! subroutine and, once the task observes the degrade signal, turns it into a
//! cheap fallback producer that may pick up whatever the explorer had pending.
//!
//! ```text
//! EngineFactory::preflight()                 once per batch
//! EngineFactory::explorer(id, params)        once per subroutine
//!        │ degrade observed
//!        ▼
//! EngineFactory::fallback(id, params, explorer)   at most once per subroutine
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::MockStrategy;
use crate::error::TaskError;
use crate::tasks::{MockSignals, Step, SubroutineId};

/// # Step-wise producer of results.
///
/// Every call to [`step`](Producer::step) performs one unit of work. Returning
/// from `step` is the task's checkpoint: pause, degrade and cancel are only
/// observed between steps, so long steps overrun their slice.
#[async_trait]
pub trait Producer<T: Send + 'static>: Send + 'static {
    async fn step(&mut self) -> Result<Step<T>, TaskError>;
}

/// Parameters handed to the engine for one subroutine.
#[derive(Clone, Debug)]
pub struct ExploreParams {
    /// Sub-budget for constraint solving inside the engine.
    pub solver_timeout: Duration,
    pub mock_strategy: MockStrategy,
    pub classes_always_mocked: Arc<BTreeSet<String>>,
    /// Raise these when a mock had to be forced.
    pub mock_signals: MockSignals,
}

/// Result of loading the engine's execution context, before any task starts.
///
/// The default is [`Preflight::ready`], the same as [`EngineFactory::preflight`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preflight {
    /// `false` aborts the batch: no task is started.
    pub ready: bool,
    /// Each description is seeded once into every subroutine's failure histogram.
    pub errors: Vec<String>,
}

impl Default for Preflight {
    fn default() -> Self {
        Self::ready()
    }
}

impl Preflight {
    pub fn ready() -> Self {
        Self {
            ready: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ready: false,
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }
}

/// Builds the producers of a batch.
pub trait EngineFactory: Send + Sync + 'static {
    /// Payload of a successful execution.
    type Output: Send + 'static;

    fn preflight(&self) -> Preflight {
        Preflight::ready()
    }

    fn explorer(&self, id: &SubroutineId, params: &ExploreParams)
    -> Box<dyn Producer<Self::Output>>;

    /// Replaces the explorer once degrade is observed. Results already
    /// emitted stay; the fallback only continues from the explorer's state.
    fn fallback(
        &self,
        id: &SubroutineId,
        params: &ExploreParams,
        explorer: Box<dyn Producer<Self::Output>>,
    ) -> Box<dyn Producer<Self::Output>>;
}
