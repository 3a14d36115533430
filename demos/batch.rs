//! # Example: batch
//!
//! Runs one batch of three subroutines with the built-in [`LogWriter`].
//!
//! Shows how to:
//! - Implement an [`EngineFactory`] from closures with [`StepFn`].
//! - Swap in a cheaper fallback producer when the batch degrades.
//! - Read [`BatchResult`] once the deadline has passed.
//!
//! ## Flow
//! ```text
//! run_batch(["Cart.add", "Cart.total", "Cart.clear"], 1500ms)
//!     ├─► BudgetPlanned  (exploration | fallback | slice)
//!     ├─► TurnStarted / TurnEnded  (Cart.add, Cart.total, Cart.clear, Cart.add, ...)
//!     ├─► TaskExhausted  (Cart.clear: small search space)
//!     ├─► DegradeRequested  (exploration over: fallback engines take over)
//!     └─► DeadlineExceeded ─► AllStoppedWithin ─► BatchFinished
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example batch --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use genvisor::{
    BatchResult, Config, EngineFactory, ExploreParams, LogWriter, Origin, Producer,
    SchedulerBuilder, Step, StepFn, Subscribe, SubroutineId, TaskError,
};

/// Pretends to explore a subroutine: every step finds a new input value.
struct DemoEngine;

impl EngineFactory for DemoEngine {
    type Output = i64;

    fn explorer(&self, id: &SubroutineId, params: &ExploreParams) -> Box<dyn Producer<i64>> {
        // small search space for one of them, so it leaves the rotation early
        let budget = if id.as_str() == "Cart.clear" { 3 } else { u32::MAX };
        let solver = params.solver_timeout;
        let mut found = 0u32;
        StepFn::boxed(move || {
            let step = if found == budget {
                Step::Exhausted
            } else {
                found += 1;
                if found % 7 == 0 {
                    Step::failure("NullPointerException at Cart.java:42")
                } else {
                    Step::success(i64::from(found) * 10)
                }
            };
            async move {
                // solving is slow compared to the slice
                tokio::time::sleep(solver.min(Duration::from_millis(40))).await;
                Ok::<_, TaskError>(step)
            }
        })
    }

    fn fallback(
        &self,
        _id: &SubroutineId,
        _params: &ExploreParams,
        _explorer: Box<dyn Producer<i64>>,
    ) -> Box<dyn Producer<i64>> {
        let mut value = -1i64;
        StepFn::boxed(move || {
            value -= 1;
            let step = Step::success(value);
            async move {
                tokio::time::sleep(Duration::from_millis(15)).await;
                Ok::<_, TaskError>(step)
            }
        })
    }
}

fn report(results: &BatchResult<i64>) {
    let mut ids: Vec<_> = results.iter().map(|(id, _)| id.clone()).collect();
    ids.sort();
    for id in ids {
        let Some(r) = results.get(id.as_str()) else {
            continue;
        };
        let explored = r
            .executions
            .iter()
            .filter(|e| e.origin == Origin::Explored)
            .count();
        println!(
            "{id}: outcome={} turns={} explored={} fallback={} failures={:?}",
            r.outcome.as_label(),
            r.turns_granted,
            explored,
            r.executions.len() - explored,
            r.failure_counts
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = Config {
        per_task_fallback_cap: Duration::from_millis(200),
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let scheduler = SchedulerBuilder::new(cfg)
        .with_subscribers(subs)
        .build(DemoEngine);

    let results = scheduler
        .run_batch(
            ["Cart.add", "Cart.total", "Cart.clear"],
            Duration::from_millis(1500),
        )
        .await?;

    scheduler.shutdown().await;
    report(&results);
    Ok(())
}
