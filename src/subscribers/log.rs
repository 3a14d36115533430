//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [budget] total=1000ms exploration=500ms fallback=500ms slice=125ms solver=250ms
//! [batch-started] tasks=2
//! [turn] task="Stack.push" turn=1 elapsed=0ms
//! [failure] task="Stack.push" desc="Concrete execution failed"
//! [turn-ended] task="Stack.push" turn=1 elapsed=125ms
//! [degrade] elapsed=501ms
//! [deadline] elapsed=1001ms
//! [exhausted] task="Stack.pop"
//! [cancelled] task="Stack.push"
//! [batch-finished] elapsed=1003ms
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let elapsed = e.elapsed_ms.unwrap_or(0);
        match e.kind {
            EventKind::BudgetPlanned => println!("[budget] {reason}"),
            EventKind::BatchStarted => println!("[batch-started] {reason}"),
            EventKind::BatchFinished => println!("[batch-finished] elapsed={elapsed}ms"),
            EventKind::TurnStarted => println!(
                "[turn] task={task:?} turn={} elapsed={elapsed}ms",
                e.turn.unwrap_or(0)
            ),
            EventKind::TurnEnded => println!(
                "[turn-ended] task={task:?} turn={} elapsed={elapsed}ms",
                e.turn.unwrap_or(0)
            ),
            EventKind::FailureRecorded => println!("[failure] task={task:?} desc={reason:?}"),
            EventKind::TaskExhausted => println!("[exhausted] task={task:?}"),
            EventKind::TaskCancelled => println!("[cancelled] task={task:?}"),
            EventKind::TaskFailed => println!("[task-failed] task={task:?} err={reason:?}"),
            EventKind::DegradeRequested => println!("[degrade] elapsed={elapsed}ms"),
            EventKind::DeadlineExceeded => println!("[deadline] elapsed={elapsed}ms"),
            EventKind::ShutdownRequested => println!("[shutdown-requested]"),
            EventKind::AllStoppedWithin => println!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => println!("[grace-exceeded] aborted={reason}"),
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={task} reason={reason}")
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={task} info={reason}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
