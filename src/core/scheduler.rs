//! # Scheduler: round-robin time slicing of one batch of exploration tasks.
//!
//! The [`Scheduler`] owns the event bus, a [`SubscriberSet`], the engine factory
//! and the batch configuration. Each call to [`Scheduler::run_batch`] plans a
//! [`TimeBudget`], spawns one paused [`ExplorationTask`] per subroutine and
//! drives them one at a time until every task is exhausted or the clock runs out.
//!
//! ## High-level architecture
//! ```text
//! run_batch(subroutines, timeout):
//!   plan(timeout, n, caps) ──► Err(BudgetTooSmall) → returned, nothing started
//!   factory.preflight()    ──► not ready            → every result = errors, nothing started
//!
//! Spawn (all paused):
//!   id[0]  id[1]  ...  id[n-1]
//!     │      │           │
//!     └──► ExplorationTask::new(id, params, factory, controller.view())
//!            └──► tokio::spawn(task.run())       controller = root.child_token()
//!
//! Drive loop (one pass = one turn per active task, in submission order):
//!   for lane in lanes:
//!     task already exited  → route its buffered events, cancel, skip (no turn)
//!     hand_over(lane): pause previous ─► lane.signals.reset() ─► resume ─► TurnStarted
//!     while lane active && turn < slice:
//!        watchdog.step(controllers)
//!          ├─ Degraded   → DegradeRequested (once)
//!          └─ Stop(..)   → DeadlineExceeded | ShutdownRequested, leave the loop
//!        select { lane.pull() → route to aggregator, sleep(tick) }
//!     stream closed → request_cancel(lane)
//!     hand_over(none) ─► TurnEnded
//!   no active lane left → leave the loop
//!
//! Teardown (reap):
//!   request_cancel(all) ─► timeout(grace, join all)
//!                           ├─ Ok       → AllStoppedWithin
//!                           └─ exceeded → abort stuck tasks, GraceExceeded
//!   drain buffered events ─► finish lanes (TaskExhausted | TaskCancelled | TaskFailed)
//!   BatchFinished
//! ```
//!
//! At most one controller is unpaused at any instant. The drive loop owns the
//! index of that controller and is the only caller of `resume`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::aggregate::{BatchResult, ResultAggregator, SubroutineResult};
use crate::budget::{TimeBudget, plan};
use crate::config::{Config, millis};
use crate::control::TaskController;
use crate::error::{PlanError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::tasks::{
    EngineFactory, ExplorationTask, ExploreParams, MockSignals, Outcome, SubroutineId,
};

use super::lane::Lane;
use super::shutdown;
use super::watchdog::{StopReason, Verdict, Watchdog};

/// Runs batches of exploration tasks under a shared time budget.
///
/// Built with [`SchedulerBuilder`](crate::SchedulerBuilder). Batches on the same
/// scheduler share its bus and subscribers; each batch has its own controllers
/// and budget, and each task its own mock signals.
pub struct Scheduler<F: EngineFactory> {
    cfg: Config,
    factory: Arc<F>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
}

impl<F: EngineFactory> Scheduler<F> {
    pub(crate) fn new_internal(
        cfg: Config,
        factory: Arc<F>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        Self {
            cfg,
            factory,
            bus,
            subs,
        }
    }

    /// Event bus of this scheduler. Subscribe before `run_batch` to observe a batch.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs one batch; see [`run_batch_with_cancel`](Self::run_batch_with_cancel).
    pub async fn run_batch<I, S>(
        &self,
        subroutines: I,
        total_timeout: Duration,
    ) -> Result<BatchResult<F::Output>, PlanError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SubroutineId>,
    {
        self.run_batch_with_cancel(subroutines, total_timeout, CancellationToken::new())
            .await
    }

    /// Runs one batch of subroutines within `total_timeout`.
    ///
    /// Duplicate subroutines are collapsed (first occurrence wins). Cancelling
    /// `cancel` stops the batch like the hard deadline does: tasks are cancelled,
    /// torn down within the grace period and their partial results returned.
    ///
    /// # Errors
    /// [`PlanError::BudgetTooSmall`] when the timeout cannot be split among the
    /// subroutines; no task is started in that case.
    pub async fn run_batch_with_cancel<I, S>(
        &self,
        subroutines: I,
        total_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<BatchResult<F::Output>, PlanError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SubroutineId>,
    {
        let ids = dedupe(subroutines);
        let budget = plan(
            millis(total_timeout),
            ids.len(),
            self.cfg.per_task_fallback_cap_ms(),
            self.cfg.global_solver_cap_ms(),
        )?;

        if budget.is_empty() || cancel.is_cancelled() {
            return Ok(untouched(ids, &[]));
        }
        let preflight = self.factory.preflight();
        if !preflight.ready {
            return Ok(untouched(ids, &preflight.errors));
        }

        let done = CancellationToken::new();
        let listener = self.subscriber_listener(done.clone());
        let interrupt = cancel.child_token();
        let signal_watch = self
            .cfg
            .stop_on_signal
            .then(|| shutdown::watch_signals(interrupt.clone(), done.clone()));

        self.bus
            .publish(Event::new(EventKind::BudgetPlanned).with_reason(budget.to_string()));
        let result = self
            .execute(ids, &budget, &preflight.errors, interrupt)
            .await;

        done.cancel();
        if let Some(handle) = signal_watch {
            let _ = handle.await;
        }
        if let Some(handle) = listener {
            let _ = handle.await;
        }
        Ok(result)
    }

    /// Flushes subscriber queues and waits for their workers.
    pub async fn shutdown(self) {
        if let Ok(set) = Arc::try_unwrap(self.subs) {
            set.shutdown().await;
        }
    }

    async fn execute(
        &self,
        ids: Vec<SubroutineId>,
        budget: &TimeBudget,
        seed_errors: &[String],
        interrupt: CancellationToken,
    ) -> BatchResult<F::Output> {
        let root = CancellationToken::new();
        // Dropping the batch future must not leave paused tasks behind.
        let _guard = root.clone().drop_guard();

        let mut controllers = Vec::with_capacity(ids.len());
        let mut lanes = Vec::with_capacity(ids.len());
        for id in ids {
            let signals = MockSignals::new();
            let params = ExploreParams {
                solver_timeout: budget.solver_cap(),
                mock_strategy: self.cfg.mock_strategy,
                classes_always_mocked: Arc::clone(&self.cfg.classes_always_mocked),
                mock_signals: signals.clone(),
            };
            let controller = TaskController::new(root.child_token());
            let (task, events) = ExplorationTask::new(
                id.clone(),
                params,
                Arc::clone(&self.factory),
                controller.view(),
                self.cfg.event_queue_capacity_clamped(),
            );
            let join = tokio::spawn(task.run());

            let mut aggregator = ResultAggregator::new();
            for err in seed_errors {
                aggregator.seed_failure(err.as_str());
            }
            lanes.push(Lane::new(id, events, aggregator, signals, join));
            controllers.push(controller);
        }

        let start = Instant::now();
        self.bus.publish(
            Event::new(EventKind::BatchStarted).with_reason(format!("tasks={}", lanes.len())),
        );

        let mut watchdog = Watchdog::new(start, budget, interrupt);
        let stop = self
            .drive(&controllers, &mut lanes, budget, &mut watchdog)
            .await;
        if let Some(reason) = stop {
            let kind = match reason {
                StopReason::Deadline => EventKind::DeadlineExceeded,
                StopReason::Interrupted => EventKind::ShutdownRequested,
            };
            self.bus
                .publish(Event::new(kind).with_elapsed(watchdog.elapsed()));
        }

        controllers.iter().for_each(TaskController::request_cancel);
        match self.reap(&mut lanes).await {
            Ok(()) => self.bus.publish(Event::new(EventKind::AllStoppedWithin)),
            Err(e) => self
                .bus
                .publish(Event::new(EventKind::GraceExceeded).with_reason(e.to_string())),
        }

        let mut results = HashMap::with_capacity(lanes.len());
        for mut lane in lanes {
            lane.drain(&self.bus);
            let (id, result) = lane.finish(&self.bus);
            results.insert(id, result);
        }
        self.bus
            .publish(Event::new(EventKind::BatchFinished).with_elapsed(watchdog.elapsed()));
        BatchResult::from_map(results)
    }

    /// Round-robin loop. Returns why it stopped early, or `None` once every
    /// lane is inactive.
    async fn drive(
        &self,
        controllers: &[TaskController],
        lanes: &mut [Lane<F::Output>],
        budget: &TimeBudget,
        watchdog: &mut Watchdog,
    ) -> Option<StopReason> {
        let slice = budget.slice();
        let tick = self.cfg.watchdog_interval_clamped();
        let mut active: Option<usize> = None;

        loop {
            let mut granted = 0usize;
            for idx in 0..lanes.len() {
                let lane = &mut lanes[idx];
                if !lane.active {
                    continue;
                }
                // exited while paused, e.g. a step that overran its last turn
                if !lane.settle(&self.bus) {
                    controllers[idx].request_cancel();
                    continue;
                }
                granted += 1;

                let turn = lane.begin_turn();
                hand_over(controllers, &mut active, Some(idx));
                self.bus.publish(
                    Event::new(EventKind::TurnStarted)
                        .with_task(lane.id.as_arc())
                        .with_turn(turn)
                        .with_elapsed(watchdog.elapsed()),
                );

                let turn_start = Instant::now();
                let turn_end = turn_start + slice;
                let mut stop = None;
                while lane.active && Instant::now() < turn_end {
                    match watchdog.step(controllers) {
                        Verdict::Stop(reason) => {
                            stop = Some(reason);
                            break;
                        }
                        Verdict::Degraded => self.bus.publish(
                            Event::new(EventKind::DegradeRequested)
                                .with_elapsed(watchdog.elapsed()),
                        ),
                        Verdict::Continue => {}
                    }

                    let wake = (Instant::now() + tick).min(turn_end);
                    tokio::select! {
                        biased;
                        ev = lane.pull() => {
                            if let Some(ev) = ev {
                                lane.route(ev, &self.bus);
                            }
                        }
                        _ = time::sleep_until(wake) => {}
                    }
                }

                if !lane.active {
                    controllers[idx].request_cancel();
                }
                hand_over(controllers, &mut active, None);
                self.bus.publish(
                    Event::new(EventKind::TurnEnded)
                        .with_task(lane.id.as_arc())
                        .with_turn(turn)
                        .with_elapsed(watchdog.elapsed()),
                );
                if stop.is_some() {
                    return stop;
                }
            }
            if granted == 0 {
                return None;
            }
        }
    }

    /// Waits for every cancelled task within the grace period, aborting the rest.
    async fn reap(&self, lanes: &mut [Lane<F::Output>]) -> Result<(), RuntimeError> {
        let Some(grace) = self.cfg.grace_period() else {
            return abort_unfinished(lanes, Duration::ZERO).await;
        };

        let joined = time::timeout(grace, async {
            for lane in lanes.iter_mut() {
                lane.join().await;
            }
        })
        .await;

        match joined {
            Ok(()) => Ok(()),
            Err(_) => abort_unfinished(lanes, grace).await,
        }
    }

    /// Forwards bus events to the subscriber set until `done` is cancelled.
    fn subscriber_listener(&self, done: CancellationToken) -> Option<JoinHandle<()>> {
        if self.subs.is_empty() {
            return None;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    },
                    _ = done.cancelled() => break,
                }
            }
            while let Ok(ev) = rx.try_recv() {
                set.emit(&ev);
            }
        }))
    }
}

/// Joins lanes whose task already finished; aborts the others.
async fn abort_unfinished<T: Send + 'static>(
    lanes: &mut [Lane<T>],
    grace: Duration,
) -> Result<(), RuntimeError> {
    let mut stuck = Vec::new();
    for lane in lanes.iter_mut() {
        if lane.join_finished() {
            // resolves at once
            lane.join().await;
        } else {
            stuck.push(lane.id.to_string());
            lane.abort();
        }
    }
    if stuck.is_empty() {
        Ok(())
    } else {
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }
}

/// Moves the single unpaused slot to `next`, pausing its previous holder.
fn hand_over(controllers: &[TaskController], active: &mut Option<usize>, next: Option<usize>) {
    if let Some(prev) = active.take() {
        controllers[prev].pause();
    }
    if let Some(idx) = next {
        controllers[idx].resume();
    }
    *active = next;
}

fn dedupe<I, S>(subroutines: I) -> Vec<SubroutineId>
where
    I: IntoIterator<Item = S>,
    S: Into<SubroutineId>,
{
    let mut seen = HashSet::new();
    subroutines
        .into_iter()
        .map(Into::into)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Results for a batch in which no task ever ran.
fn untouched<T>(ids: Vec<SubroutineId>, errors: &[String]) -> BatchResult<T> {
    let results = ids
        .into_iter()
        .map(|id| {
            let mut aggregator = ResultAggregator::new();
            for err in errors {
                aggregator.seed_failure(err.as_str());
            }
            let result =
                SubroutineResult::from_aggregator(aggregator, 0, Outcome::NotStarted, false);
            (id, result)
        })
        .collect();
    BatchResult::from_map(results)
}
