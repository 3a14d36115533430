//! # Watchdog: elapsed-time policy of a batch.
//!
//! Polled by the drive loop on every iteration inside a turn.
//!
//! ```text
//! elapsed = now - batch_start            (monotonic clock)
//!   ├─ elapsed > total            → cancel every controller, Stop(Deadline)
//!   ├─ interrupt token cancelled  → cancel every controller, Stop(Interrupted)
//!   ├─ elapsed > exploration      → degrade every controller (first time only), Degraded
//!   └─ otherwise                  → Continue
//! ```
//!
//! The degrade switch is latched: once reported it is never reported nor
//! undone again, whatever the clock says afterwards.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::budget::TimeBudget;
use crate::control::TaskController;

/// Why the drive loop must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    Deadline,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Continue,
    /// Degrade was requested during this step.
    Degraded,
    Stop(StopReason),
}

pub(crate) struct Watchdog {
    start: Instant,
    total: Duration,
    exploration: Duration,
    degraded: bool,
    interrupt: CancellationToken,
}

impl Watchdog {
    pub(crate) fn new(start: Instant, budget: &TimeBudget, interrupt: CancellationToken) -> Self {
        Self {
            start,
            total: budget.total(),
            exploration: budget.exploration(),
            degraded: false,
            interrupt,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.start)
    }

    pub(crate) fn step(&mut self, controllers: &[TaskController]) -> Verdict {
        let elapsed = self.elapsed();

        let stop = if elapsed > self.total {
            Some(StopReason::Deadline)
        } else if self.interrupt.is_cancelled() {
            Some(StopReason::Interrupted)
        } else {
            None
        };
        if let Some(reason) = stop {
            controllers.iter().for_each(TaskController::request_cancel);
            return Verdict::Stop(reason);
        }

        if !self.degraded && elapsed > self.exploration {
            self.degraded = true;
            controllers.iter().for_each(TaskController::request_degrade);
            return Verdict::Degraded;
        }
        Verdict::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::plan;

    fn controllers(n: usize) -> Vec<TaskController> {
        (0..n)
            .map(|_| TaskController::new(CancellationToken::new()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_degrade_then_deadline() {
        let budget = plan(1000, 2, 300, 1000).unwrap();
        let ctrls = controllers(2);
        let mut dog = Watchdog::new(Instant::now(), &budget, CancellationToken::new());

        assert_eq!(dog.step(&ctrls), Verdict::Continue);

        tokio::time::advance(Duration::from_millis(501)).await;
        assert_eq!(dog.step(&ctrls), Verdict::Degraded);
        assert!(ctrls.iter().all(TaskController::is_degraded));
        assert!(ctrls.iter().all(|c| !c.is_cancelled()));

        // latched: not reported twice
        assert_eq!(dog.step(&ctrls), Verdict::Continue);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(dog.step(&ctrls), Verdict::Stop(StopReason::Deadline));
        assert!(ctrls.iter().all(TaskController::is_cancelled));
        assert!(ctrls.iter().all(TaskController::is_degraded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundaries_are_exclusive() {
        let budget = plan(1000, 2, 300, 1000).unwrap();
        let ctrls = controllers(1);
        let mut dog = Watchdog::new(Instant::now(), &budget, CancellationToken::new());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(dog.step(&ctrls), Verdict::Continue);
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(dog.step(&ctrls), Verdict::Degraded);
        assert!(!ctrls[0].is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_before_deadline() {
        let budget = plan(1000, 1, 300, 1000).unwrap();
        let ctrls = controllers(1);
        let interrupt = CancellationToken::new();
        let mut dog = Watchdog::new(Instant::now(), &budget, interrupt.clone());

        interrupt.cancel();
        assert_eq!(dog.step(&ctrls), Verdict::Stop(StopReason::Interrupted));
        assert!(ctrls[0].is_cancelled());
        assert!(!ctrls[0].is_degraded());
    }
}
