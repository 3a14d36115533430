//! # Runtime events emitted by the scheduler.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Batch events**: planning, start and end of one `run_batch` call
//! - **Turn events**: round-robin scheduling (a task was resumed / paused again)
//! - **Task events**: terminal states and first-seen failures of one subroutine
//! - **Watchdog events**: degrade switch, hard deadline, teardown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! subroutine name, the turn number and the batch-relative elapsed time.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use genvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TurnStarted)
//!     .with_task("Calculator.divide")
//!     .with_turn(3)
//!     .with_elapsed(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::TurnStarted);
//! assert_eq!(ev.task.as_deref(), Some("Calculator.divide"));
//! assert_eq!(ev.turn, Some(3));
//! assert_eq!(ev.elapsed_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Batch events ===
    /// Budget computed for the batch.
    ///
    /// Sets:
    /// - `reason`: rendered budget (`total=.. exploration=.. fallback=.. slice=.. solver=..`)
    BudgetPlanned,

    /// Drive loop is about to start.
    ///
    /// Sets:
    /// - `reason`: `tasks=<n>`
    BatchStarted,

    /// Drive loop finished and results were collected.
    ///
    /// Sets:
    /// - `elapsed_ms`: time since batch start
    BatchFinished,

    // === Turn events ===
    /// A subroutine was resumed for one round-robin turn (all others paused).
    ///
    /// Sets:
    /// - `task`: subroutine name
    /// - `turn`: turn number for this subroutine (1-based)
    /// - `elapsed_ms`: time since batch start
    TurnStarted,

    /// The turn of a subroutine ended (slice spent, task finished or deadline).
    ///
    /// Sets:
    /// - `task`: subroutine name
    /// - `turn`: turn number for this subroutine
    /// - `elapsed_ms`: time since batch start
    TurnEnded,

    // === Task events ===
    /// A failure description was seen for the first time for this subroutine.
    ///
    /// Repeats of the same description only bump the histogram; they are not published.
    ///
    /// Sets:
    /// - `task`: subroutine name
    /// - `reason`: failure description
    FailureRecorded,

    /// The task finished its search space.
    ///
    /// Sets:
    /// - `task`: subroutine name
    TaskExhausted,

    /// The task stopped because its controller was cancelled.
    ///
    /// Sets:
    /// - `task`: subroutine name
    TaskCancelled,

    /// The task's producer returned an error or panicked.
    ///
    /// Sets:
    /// - `task`: subroutine name
    /// - `reason`: error message
    TaskFailed,

    // === Watchdog events ===
    /// Exploration budget spent; every controller was switched to fallback mode.
    ///
    /// Sets:
    /// - `elapsed_ms`: time since batch start
    DegradeRequested,

    /// Total budget spent; every controller was cancelled and the drive loop stopped.
    ///
    /// Sets:
    /// - `elapsed_ms`: time since batch start
    DeadlineExceeded,

    /// Caller cancellation or OS signal observed; every controller was cancelled.
    ///
    /// Sets:
    /// - `elapsed_ms`: time since batch start
    ShutdownRequested,

    /// All tasks stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; the remaining tasks were aborted.
    ///
    /// Sets:
    /// - `reason`: the teardown error (grace and aborted subroutines)
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Time since batch start in milliseconds.
    pub elapsed_ms: Option<u64>,
    /// Human-readable reason (failure descriptions, budget details, etc.).
    pub reason: Option<Arc<str>>,
    /// Turn number of the subroutine (starting from 1).
    pub turn: Option<u32>,
    /// Name of the subroutine (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            elapsed_ms: None,
            reason: None,
            turn: None,
            task: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a subroutine name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the batch-relative elapsed time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a turn number.
    #[inline]
    pub fn with_turn(mut self, n: u32) -> Self {
        self.turn = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
