use tokio::task::JoinHandle;

use crate::aggregate::{Recorded, ResultAggregator, SubroutineResult};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;
use crate::tasks::{EventStream, MockSignals, Outcome, ResultEvent, SubroutineId, TaskExit};

/// Scheduler-side state of one subroutine (everything but its controller).
pub(crate) struct Lane<T> {
    pub(crate) id: SubroutineId,
    events: EventStream<T>,
    aggregator: ResultAggregator<T>,
    /// Forced-mock flags of this task only.
    signals: MockSignals,
    join: Option<JoinHandle<TaskExit>>,
    exit: Option<TaskExit>,
    /// Stream still open: the task may produce more events.
    pub(crate) active: bool,
    pub(crate) turns: u32,
}

impl<T: Send + 'static> Lane<T> {
    pub(crate) fn new(
        id: SubroutineId,
        events: EventStream<T>,
        aggregator: ResultAggregator<T>,
        signals: MockSignals,
        join: JoinHandle<TaskExit>,
    ) -> Self {
        Self {
            id,
            events,
            aggregator,
            signals,
            join: Some(join),
            exit: None,
            active: true,
            turns: 0,
        }
    }

    /// Counts a new turn and lowers the task's forced-mock flags.
    pub(crate) fn begin_turn(&mut self) -> u32 {
        self.signals.reset();
        self.turns += 1;
        self.turns
    }

    /// Retires a lane whose task already exited: routes its buffered events
    /// and marks it inactive. Returns whether the lane is still active.
    pub(crate) fn settle(&mut self, bus: &Bus) -> bool {
        if self.active && self.join_finished() {
            self.drain(bus);
            self.active = false;
        }
        self.active
    }

    /// Waits for the next event of this lane; marks it inactive when the stream ends.
    pub(crate) async fn pull(&mut self) -> Option<ResultEvent<T>> {
        let ev = self.events.next_event().await;
        if ev.is_none() {
            self.active = false;
        }
        ev
    }

    /// Routes whatever is still buffered in the stream.
    pub(crate) fn drain(&mut self, bus: &Bus) {
        while let Ok(ev) = self.events.try_next_event() {
            self.route(ev, bus);
        }
    }

    /// Sends one event to the aggregator; the first occurrence of a failure
    /// is published.
    pub(crate) fn route(&mut self, ev: ResultEvent<T>, bus: &Bus) {
        match ev {
            ResultEvent::Success(exec) => {
                self.aggregator.record(ResultEvent::Success(exec));
            }
            ResultEvent::Failure(description) => {
                let first = !self.aggregator.failure_counts().contains_key(&description);
                if first {
                    bus.publish(
                        Event::new(EventKind::FailureRecorded)
                            .with_task(self.id.as_arc())
                            .with_reason(description.as_str()),
                    );
                }
                let recorded = self.aggregator.record(ResultEvent::Failure(description));
                debug_assert_eq!(recorded == Recorded::NewFailure, first);
            }
        }
    }

    pub(crate) fn join_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Awaits the task and stores its exit.
    pub(crate) async fn join(&mut self) {
        let Some(handle) = self.join.as_mut() else {
            return;
        };
        let exit = match handle.await {
            Ok(exit) => exit,
            Err(e) if e.is_panic() => TaskExit {
                outcome: Outcome::Failed(format!("panic: {}", panic_message(&*e.into_panic()))),
                degraded: false,
            },
            Err(_) => TaskExit {
                outcome: Outcome::Cancelled,
                degraded: false,
            },
        };
        self.join = None;
        self.exit = Some(exit);
    }

    /// Aborts a task that did not stop in time.
    pub(crate) fn abort(&mut self) {
        if let Some(handle) = self.join.take() {
            handle.abort();
            self.exit = Some(TaskExit {
                outcome: Outcome::Cancelled,
                degraded: false,
            });
        }
    }

    /// Final snapshot; publishes the terminal event of the task.
    pub(crate) fn finish(self, bus: &Bus) -> (SubroutineId, SubroutineResult<T>) {
        let Lane {
            id,
            mut aggregator,
            exit,
            turns,
            ..
        } = self;
        let TaskExit { outcome, degraded } = exit.unwrap_or(TaskExit {
            outcome: Outcome::Cancelled,
            degraded: false,
        });

        let outcome = if turns == 0 {
            Outcome::NotStarted
        } else {
            outcome
        };
        let kind = match &outcome {
            Outcome::NotStarted | Outcome::Cancelled => EventKind::TaskCancelled,
            Outcome::Exhausted => EventKind::TaskExhausted,
            Outcome::Failed(msg) => {
                aggregator.record_failure(msg.clone());
                EventKind::TaskFailed
            }
        };
        let mut ev = Event::new(kind).with_task(id.as_arc());
        if let Outcome::Failed(msg) = &outcome {
            ev = ev.with_reason(msg.as_str());
        }
        bus.publish(ev);

        let result = SubroutineResult::from_aggregator(aggregator, turns, outcome, degraded);
        (id, result)
    }
}
