//! # ExplorationTask: the checkpoint loop around one subroutine's producer.
//!
//! ```text
//! loop {
//!   ├─► wait_resumed()           parks while paused; cancelled → stop
//!   ├─► degrade observed?        swap explorer → fallback (once)
//!   ├─► producer.step()          cancellable
//!   │     ├─ Emit(ev)   ──► send to EventStream (cancellable, backpressured)
//!   │     ├─ Progress   ──► next checkpoint
//!   │     ├─ Exhausted  ──► exit Exhausted
//!   │     └─ Err(e)     ──► exit Failed(e) / Cancelled
//! }
//! ```
//!
//! ## Rules
//! - Not restartable: [`run`](ExplorationTask::run) consumes the task.
//! - After cancellation no further event is emitted.
//! - Events emitted after the degrade switch are stamped [`Origin::Fallback`].
//! - Explored executions are tainted when the task's own forced-mock flags are
//!   up at emit time; the scheduler lowers them at the start of each turn.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::control::ControlView;
use crate::tasks::{EngineFactory, ExploreParams, Origin, ResultEvent, Step, SubroutineId};

/// Terminal state of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Never got a turn before the batch ended.
    NotStarted,
    /// The search space was finished.
    Exhausted,
    /// Stopped by its controller.
    Cancelled,
    /// The producer returned an error or panicked.
    Failed(String),
}

impl Outcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::NotStarted => "not_started",
            Outcome::Exhausted => "exhausted",
            Outcome::Cancelled => "cancelled",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// What a finished task reports back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskExit {
    pub outcome: Outcome,
    /// The task observed the degrade signal and switched to its fallback.
    pub degraded: bool,
}

/// Receiving end of a task's result sequence.
///
/// Ends (`None`) once the task has finished and every buffered event was taken.
#[derive(Debug)]
pub struct EventStream<T> {
    rx: mpsc::Receiver<ResultEvent<T>>,
}

impl<T> EventStream<T> {
    /// Waits for the next event.
    pub async fn next_event(&mut self) -> Option<ResultEvent<T>> {
        self.rx.recv().await
    }

    /// Takes an already buffered event without waiting.
    pub fn try_next_event(&mut self) -> Result<ResultEvent<T>, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

impl<T> Stream for EventStream<T> {
    type Item = ResultEvent<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// One subroutine's exploration, driven by its controller's signals.
pub struct ExplorationTask<F: EngineFactory> {
    id: SubroutineId,
    params: ExploreParams,
    factory: Arc<F>,
    control: ControlView,
    tx: mpsc::Sender<ResultEvent<F::Output>>,
}

impl<F: EngineFactory> ExplorationTask<F> {
    /// Creates the task and the stream its results arrive on.
    pub fn new(
        id: SubroutineId,
        params: ExploreParams,
        factory: Arc<F>,
        control: ControlView,
        queue_capacity: usize,
    ) -> (Self, EventStream<F::Output>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let task = Self {
            id,
            params,
            factory,
            control,
            tx,
        };
        (task, EventStream { rx })
    }

    pub fn id(&self) -> &SubroutineId {
        &self.id
    }

    /// Runs until the search space is exhausted, the producer fails or the
    /// controller cancels. Dropping the returned future also ends the stream.
    pub async fn run(self) -> TaskExit {
        let Self {
            id,
            params,
            factory,
            control,
            tx,
        } = self;

        let mut degraded = false;
        if !control.wait_resumed().await {
            return TaskExit {
                outcome: Outcome::Cancelled,
                degraded,
            };
        }
        let mut producer = factory.explorer(&id, &params);

        let outcome = loop {
            if !control.wait_resumed().await {
                break Outcome::Cancelled;
            }
            if !degraded && control.is_degraded() {
                producer = factory.fallback(&id, &params, producer);
                degraded = true;
            }

            let step = tokio::select! {
                biased;
                _ = control.cancelled() => break Outcome::Cancelled,
                step = producer.step() => step,
            };

            match step {
                Ok(Step::Emit(mut ev)) => {
                    if let ResultEvent::Success(exec) = &mut ev {
                        if degraded {
                            exec.origin = Origin::Fallback;
                        } else {
                            exec.origin = Origin::Explored;
                            exec.tainted_by_forced_mocking = params.mock_signals.triggered();
                        }
                    }
                    tokio::select! {
                        biased;
                        _ = control.cancelled() => break Outcome::Cancelled,
                        sent = tx.send(ev) => {
                            if sent.is_err() {
                                break Outcome::Cancelled;
                            }
                        }
                    }
                }
                Ok(Step::Progress) => {}
                Ok(Step::Exhausted) => break Outcome::Exhausted,
                Err(e) => match e.description() {
                    Some(description) => break Outcome::Failed(description),
                    None => break Outcome::Cancelled,
                },
            }
        };

        TaskExit { outcome, degraded }
    }
}
