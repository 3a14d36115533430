//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for per-subroutine turn metrics.
//! - Stop a batch early with an external [`CancellationToken`].
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use genvisor::{
    Config, EngineFactory, Event, EventKind, ExploreParams, Producer, SchedulerBuilder, Step,
    StepFn, Subscribe, SubroutineId, TaskError,
};
use tokio_util::sync::CancellationToken;

/// Counts turns per subroutine and prints the lifecycle of the batch.
#[derive(Default)]
struct TurnCounter {
    turns: Mutex<HashMap<String, u32>>,
}

#[async_trait::async_trait]
impl Subscribe for TurnCounter {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::TurnStarted => {
                let task = ev.task.as_deref().unwrap_or("<unknown>").to_string();
                if let Ok(mut turns) = self.turns.lock() {
                    *turns.entry(task).or_insert(0) += 1;
                }
            }
            EventKind::DegradeRequested => {
                println!("[sub] degrade at {}ms", ev.elapsed_ms.unwrap_or(0));
            }
            EventKind::ShutdownRequested => {
                println!("[sub] stopped by caller at {}ms", ev.elapsed_ms.unwrap_or(0));
            }
            EventKind::FailureRecorded => {
                println!(
                    "[sub] new failure: task={} desc={}",
                    ev.task.as_deref().unwrap_or("<unknown>"),
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::BatchFinished => {
                println!("[sub] batch finished after {}ms", ev.elapsed_ms.unwrap_or(0));
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "turn-counter"
    }
}

/// Endless engine that fails every third step.
struct FlakyEngine;

impl EngineFactory for FlakyEngine {
    type Output = u64;

    fn explorer(&self, _id: &SubroutineId, _params: &ExploreParams) -> Box<dyn Producer<u64>> {
        let mut n = 0u64;
        StepFn::boxed(move || {
            n += 1;
            let step = if n % 3 == 0 {
                Step::failure("AssertionError: expected <3>")
            } else {
                Step::success(n)
            };
            async move {
                tokio::time::sleep(Duration::from_millis(25)).await;
                Ok::<_, TaskError>(step)
            }
        })
    }

    fn fallback(
        &self,
        _id: &SubroutineId,
        _params: &ExploreParams,
        explorer: Box<dyn Producer<u64>>,
    ) -> Box<dyn Producer<u64>> {
        explorer
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let counter = Arc::new(TurnCounter::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![counter.clone()];
    let scheduler = SchedulerBuilder::new(Config::default())
        .with_subscribers(subs)
        .build(FlakyEngine);

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(800)).await;
        stopper.cancel();
    });

    let results = scheduler
        .run_batch_with_cancel(["Parser.parse", "Parser.peek"], Duration::from_secs(5), cancel)
        .await?;
    scheduler.shutdown().await;

    for (id, r) in &results {
        println!(
            "{id}: {} executions, {} failures ({} distinct)",
            r.executions.len(),
            r.failure_total(),
            r.failure_counts.len()
        );
    }
    if let Ok(turns) = counter.turns.lock() {
        println!("turns: {turns:?}");
    }
    Ok(())
}
