use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use genvisor::{
    Config, EngineFactory, Event, EventKind, ExploreParams, Origin, Outcome, PlanError,
    Preflight, Producer, SchedulerBuilder, Step, StepFn, Subscribe, SubroutineId, TaskError,
};

type Make = dyn Fn(&SubroutineId, &ExploreParams) -> Box<dyn Producer<u32>> + Send + Sync;

/// Factory assembled from closures; counts explorer and fallback builds.
struct Factory {
    preflight: Preflight,
    explorer: Box<Make>,
    fallback: Box<Make>,
    explorers: Arc<AtomicUsize>,
    fallbacks: Arc<AtomicUsize>,
}

impl Factory {
    fn new<E>(explorer: E) -> Self
    where
        E: Fn(&SubroutineId, &ExploreParams) -> Box<dyn Producer<u32>> + Send + Sync + 'static,
    {
        Self {
            preflight: Preflight::ready(),
            explorer: Box::new(explorer),
            fallback: Box::new(default_fallback),
            explorers: Arc::new(AtomicUsize::new(0)),
            fallbacks: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_fallback<B>(mut self, fallback: B) -> Self
    where
        B: Fn(&SubroutineId, &ExploreParams) -> Box<dyn Producer<u32>> + Send + Sync + 'static,
    {
        self.fallback = Box::new(fallback);
        self
    }

    fn with_preflight(mut self, preflight: Preflight) -> Self {
        self.preflight = preflight;
        self
    }
}

impl EngineFactory for Factory {
    type Output = u32;

    fn preflight(&self) -> Preflight {
        self.preflight.clone()
    }

    fn explorer(&self, id: &SubroutineId, params: &ExploreParams) -> Box<dyn Producer<u32>> {
        self.explorers.fetch_add(1, Ordering::SeqCst);
        (self.explorer)(id, params)
    }

    fn fallback(
        &self,
        id: &SubroutineId,
        params: &ExploreParams,
        _explorer: Box<dyn Producer<u32>>,
    ) -> Box<dyn Producer<u32>> {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        (self.fallback)(id, params)
    }
}

fn default_fallback(_: &SubroutineId, _: &ExploreParams) -> Box<dyn Producer<u32>> {
    endless(Duration::from_millis(10))
}

/// Emits `n` successes, one per `every`, then exhausts.
fn finite(n: u32, every: Duration) -> Box<dyn Producer<u32>> {
    let mut next = 0u32;
    StepFn::boxed(move || {
        let step = if next == n {
            Step::Exhausted
        } else {
            next += 1;
            Step::success(next)
        };
        async move {
            tokio::time::sleep(every).await;
            Ok(step)
        }
    })
}

/// Emits a success every `every`, forever.
fn endless(every: Duration) -> Box<dyn Producer<u32>> {
    let mut next = 0u32;
    StepFn::boxed(move || {
        next = next.wrapping_add(1);
        let value = next;
        async move {
            tokio::time::sleep(every).await;
            Ok(Step::success(value))
        }
    })
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

#[tokio::test(start_paused = true)]
async fn test_turns_rotate_in_submission_order() {
    let factory = Factory::new(|_, _| endless(Duration::from_millis(10)));
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let results = scheduler
        .run_batch(["A", "B", "C"], Duration::from_millis(3000))
        .await
        .unwrap();
    let events = drain(&mut rx);

    let order: Vec<String> = events
        .iter()
        .filter(|e| e.kind == EventKind::TurnStarted)
        .map(|e| e.task.as_deref().unwrap_or_default().to_string())
        .collect();
    assert!(order.len() >= 6, "turns: {order:?}");
    for (i, task) in order.iter().enumerate() {
        assert_eq!(task, ["A", "B", "C"][i % 3]);
    }

    // one turn open at a time
    let mut open = false;
    for ev in &events {
        match ev.kind {
            EventKind::TurnStarted => {
                assert!(!open);
                open = true;
            }
            EventKind::TurnEnded => {
                assert!(open);
                open = false;
            }
            _ => {}
        }
    }

    for id in ["A", "B", "C"] {
        let r = results.get(id).unwrap();
        assert!(r.turns_granted >= 2);
        assert!(!r.executions.is_empty());
        assert_eq!(r.outcome, Outcome::Cancelled);
    }
}

#[tokio::test(start_paused = true)]
async fn test_hard_deadline_cuts_long_steps() {
    let factory = Factory::new(|_, _| endless(Duration::from_secs(10)));
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let start = Instant::now();
    let results = scheduler
        .run_batch(["slow"], Duration::from_millis(100))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(150), "{elapsed:?}");

    let r = results.get("slow").unwrap();
    assert_eq!(r.outcome, Outcome::Cancelled);
    assert!(r.executions.is_empty());
    assert!(r.turns_granted >= 1);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DeadlineExceeded), 1);
    assert_eq!(count(&events, EventKind::AllStoppedWithin), 1);
    assert_eq!(count(&events, EventKind::BatchFinished), 1);
}

#[tokio::test(start_paused = true)]
async fn test_finished_task_leaves_the_rotation_and_the_other_degrades() {
    let factory = Factory::new(|id, _| match id.as_str() {
        "A" => finite(3, Duration::from_millis(1)),
        _ => endless(Duration::from_millis(20)),
    })
    .with_fallback(|_, _| endless(Duration::from_millis(5)));
    let fallbacks = Arc::clone(&factory.fallbacks);
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let results = scheduler
        .run_batch(["A", "B"], Duration::from_millis(1000))
        .await
        .unwrap();

    let a = results.get("A").unwrap();
    assert_eq!(a.outcome, Outcome::Exhausted);
    assert_eq!(a.turns_granted, 1);
    assert_eq!(
        a.executions.iter().map(|e| e.value).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(!a.degraded);

    let b = results.get("B").unwrap();
    assert_eq!(b.outcome, Outcome::Cancelled);
    assert!(b.degraded);
    assert!(b.turns_granted > 1);
    assert!(b.executions.iter().any(|e| e.origin == Origin::Explored));
    assert!(b.executions.iter().any(|e| e.origin == Origin::Fallback));
    // explored results come first, fallback results after
    let first_fallback = b
        .executions
        .iter()
        .position(|e| e.origin == Origin::Fallback)
        .unwrap();
    assert!(
        b.executions[first_fallback..]
            .iter()
            .all(|e| e.origin == Origin::Fallback)
    );
    assert_eq!(fallbacks.load(Ordering::SeqCst), 1);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::DegradeRequested), 1);
    assert_eq!(count(&events, EventKind::DeadlineExceeded), 1);
    assert_eq!(count(&events, EventKind::TaskExhausted), 1);
    let a_turns = events
        .iter()
        .filter(|e| e.kind == EventKind::TurnStarted && e.task.as_deref() == Some("A"))
        .count();
    assert_eq!(a_turns, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_storm_collapses_to_one_entry() {
    let factory = Factory::new(|_, _| {
        let mut left = 1000u32;
        StepFn::boxed(move || {
            let step = if left == 0 {
                Step::Exhausted
            } else {
                left -= 1;
                Step::failure("X")
            };
            async move { Ok(step) }
        })
    });
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let results = scheduler
        .run_batch(["storm"], Duration::from_millis(1000))
        .await
        .unwrap();

    let r = results.get("storm").unwrap();
    assert_eq!(r.outcome, Outcome::Exhausted);
    assert!(r.executions.is_empty());
    assert_eq!(r.failure_counts, HashMap::from([("X".to_string(), 1000)]));

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::FailureRecorded), 1);
}

#[tokio::test(start_paused = true)]
async fn test_budget_too_small_starts_nothing() {
    let factory = Factory::new(|_, _| endless(Duration::from_millis(1)));
    let explorers = Arc::clone(&factory.explorers);
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let err = scheduler
        .run_batch(["A"], Duration::from_millis(5))
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::BudgetTooSmall { task_count: 1, .. }));
    assert_eq!(explorers.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_returns_immediately() {
    let factory = Factory::new(|_, _| endless(Duration::from_millis(1)));
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let empty: [&str; 0] = [];
    let results = scheduler
        .run_batch(empty, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_preflight_failure_seeds_every_histogram() {
    let factory = Factory::new(|_, _| endless(Duration::from_millis(1)))
        .with_preflight(Preflight::failed(["no classpath", "no classpath"]));
    let explorers = Arc::clone(&factory.explorers);
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let results = scheduler
        .run_batch(["A", "B"], Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for (_, r) in results.iter() {
        assert_eq!(r.outcome, Outcome::NotStarted);
        assert!(r.was_starved());
        assert_eq!(
            r.failure_counts,
            HashMap::from([("no classpath".to_string(), 1)])
        );
    }
    assert_eq!(explorers.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_subroutines_run_once() {
    let factory = Factory::new(|_, _| finite(1, Duration::from_millis(1)));
    let explorers = Arc::clone(&factory.explorers);
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let results = scheduler
        .run_batch(["A", "A", "B"], Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(explorers.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_external_cancel_stops_early() {
    let factory = Factory::new(|_, _| endless(Duration::from_millis(10)));
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let results = scheduler
        .run_batch_with_cancel(["A", "B"], Duration::from_secs(10), cancel)
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));

    for (_, r) in results.iter() {
        assert_eq!(r.outcome, Outcome::Cancelled);
    }
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::ShutdownRequested), 1);
    assert_eq!(count(&events, EventKind::DeadlineExceeded), 0);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_token_starts_nothing() {
    let factory = Factory::new(|_, _| endless(Duration::from_millis(10)));
    let explorers = Arc::clone(&factory.explorers);
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let results = scheduler
        .run_batch_with_cancel(["A"], Duration::from_secs(1), cancel)
        .await
        .unwrap();

    assert_eq!(results.get("A").unwrap().outcome, Outcome::NotStarted);
    assert_eq!(explorers.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_forced_mock_taints_only_that_turn() {
    let factory = Factory::new(|id, params| {
        let signals = params.mock_signals.clone();
        let force = id.as_str() == "mocked";
        let mut done = false;
        StepFn::boxed(move || {
            let step = if done {
                Step::Exhausted
            } else {
                done = true;
                if force {
                    signals.force_mock_happened();
                }
                Step::success(7)
            };
            async move { Ok(step) }
        })
    });
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let results = scheduler
        .run_batch(["mocked", "clean"], Duration::from_secs(1))
        .await
        .unwrap();

    let mocked = &results.get("mocked").unwrap().executions;
    assert_eq!(mocked.len(), 1);
    assert!(mocked[0].tainted_by_forced_mocking);

    let clean = &results.get("clean").unwrap().executions;
    assert_eq!(clean.len(), 1);
    assert!(!clean[0].tainted_by_forced_mocking);
}

#[tokio::test(start_paused = true)]
async fn test_forced_mock_stays_with_a_step_that_overruns_its_slice() {
    // 2 tasks in 1000ms: slice = 125ms, the 200ms step runs into the other turn
    let factory = Factory::new(|id, params| {
        if id.as_str() != "mocked" {
            return endless(Duration::from_millis(10));
        }
        let signals = params.mock_signals.clone();
        let mut done = false;
        StepFn::boxed(move || {
            let first = !std::mem::replace(&mut done, true);
            let signals = signals.clone();
            async move {
                if !first {
                    return Ok(Step::Exhausted);
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                signals.force_mock_happened();
                Ok(Step::success(99))
            }
        })
    });
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let results = scheduler
        .run_batch(["mocked", "clean"], Duration::from_millis(1000))
        .await
        .unwrap();

    let mocked: Vec<_> = results
        .get("mocked")
        .unwrap()
        .executions
        .iter()
        .map(|e| (e.value, e.tainted_by_forced_mocking))
        .collect();
    assert_eq!(mocked, vec![(99, true)]);

    let clean = &results.get("clean").unwrap().executions;
    assert!(!clean.is_empty());
    assert!(clean.iter().all(|e| !e.tainted_by_forced_mocking));
}

#[tokio::test(start_paused = true)]
async fn test_task_exhausted_while_paused_gets_no_further_turn() {
    let factory = Factory::new(|id, _| {
        if id.as_str() != "A" {
            return endless(Duration::from_millis(10));
        }
        StepFn::boxed(|| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Step::Exhausted)
        })
    });
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let results = scheduler
        .run_batch(["A", "B"], Duration::from_millis(1000))
        .await
        .unwrap();

    let a = results.get("A").unwrap();
    assert_eq!(a.outcome, Outcome::Exhausted);
    assert_eq!(a.turns_granted, 1);
    assert!(results.get("B").unwrap().turns_granted > 1);

    let events = drain(&mut rx);
    let a_turns = events
        .iter()
        .filter(|e| e.kind == EventKind::TurnStarted && e.task.as_deref() == Some("A"))
        .count();
    assert_eq!(a_turns, 1);
    assert_eq!(count(&events, EventKind::TaskExhausted), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_reports_every_task_unstarted() {
    let factory = Factory::new(|_, _| endless(Duration::from_millis(1)));
    let explorers = Arc::clone(&factory.explorers);
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);

    let results = scheduler
        .run_batch(["A", "B"], Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for id in ["A", "B"] {
        let r = results.get(id).unwrap();
        assert_eq!(r.outcome, Outcome::NotStarted);
        assert_eq!(r.turns_granted, 0);
        assert!(r.executions.is_empty());
    }
    assert_eq!(explorers.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_producer_error_is_recorded_as_failure() {
    let factory = Factory::new(|_, _| {
        StepFn::boxed(|| async {
            Err(TaskError::Fatal {
                error: "engine crashed".into(),
            })
        })
    });
    let scheduler = SchedulerBuilder::new(Config::default()).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let results = scheduler
        .run_batch(["A"], Duration::from_secs(1))
        .await
        .unwrap();

    let r = results.get("A").unwrap();
    assert!(matches!(r.outcome, Outcome::Failed(_)));
    assert_eq!(r.failure_total(), 1);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TaskFailed), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stuck_task_is_aborted_after_grace() {
    let factory = Factory::new(|_, _| {
        StepFn::boxed(|| async {
            // blocks the worker: cancellation cannot interrupt it
            std::thread::sleep(Duration::from_millis(400));
            Ok(Step::success(1))
        })
    });
    let cfg = Config {
        grace: Duration::from_millis(50),
        ..Config::default()
    };
    let scheduler = SchedulerBuilder::new(cfg).build(factory);
    let mut rx = scheduler.bus().subscribe();

    let start = std::time::Instant::now();
    let results = scheduler
        .run_batch(["stuck"], Duration::from_millis(100))
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_millis(350), "{:?}", start.elapsed());
    assert_eq!(results.get("stuck").unwrap().outcome, Outcome::Cancelled);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::GraceExceeded), 1);
    let reason = events
        .iter()
        .find(|e| e.kind == EventKind::GraceExceeded)
        .and_then(|e| e.reason.as_deref().map(str::to_string))
        .unwrap();
    assert!(reason.contains("stuck"), "{reason}");
}

struct Recorder {
    seen: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.seen.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_the_whole_batch() {
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    let factory = Factory::new(|_, _| finite(2, Duration::from_millis(1)));
    let scheduler = SchedulerBuilder::new(Config::default())
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build(factory);

    scheduler
        .run_batch(["A"], Duration::from_secs(1))
        .await
        .unwrap();
    scheduler.shutdown().await;

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&EventKind::BudgetPlanned));
    assert_eq!(seen.last(), Some(&EventKind::BatchFinished));
    assert!(seen.contains(&EventKind::TaskExhausted));
}
