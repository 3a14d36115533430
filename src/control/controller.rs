//! # Per-task control block.
//!
//! [`TaskController`] is owned by the scheduler (single writer); the task gets a
//! read-only [`ControlView`] of the same state (single reader).
//!
//! ```text
//!  Scheduler                           ExplorationTask
//!  TaskController ──(Arc<Shared>)──►   ControlView
//!   pause() / resume()                  wait_resumed().await   (blocks while paused)
//!   request_degrade()                   is_degraded()          (one-way)
//!   request_cancel()                    is_cancelled() / cancelled().await
//! ```
//!
//! ## Rules
//! - `degrade` and `cancel` are **monotonic**: once set, never cleared; requesting
//!   them again is a no-op.
//! - Resuming a cancelled controller is a programming error (debug assertion).
//! - Flag writes are atomic; no lock is taken on either side.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Shared {
    paused: AtomicBool,
    degraded: AtomicBool,
    resumes: AtomicU32,
    wake: Notify,
    cancel: CancellationToken,
}

/// Scheduler-side handle: the only writer of one task's control flags.
#[derive(Debug)]
pub struct TaskController {
    shared: Arc<Shared>,
}

impl TaskController {
    /// Creates a controller in the paused state.
    ///
    /// `cancel` is usually a child of the batch token so a global cancel reaches every task.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            shared: Arc::new(Shared {
                paused: AtomicBool::new(true),
                degraded: AtomicBool::new(false),
                resumes: AtomicU32::new(0),
                wake: Notify::new(),
                cancel,
            }),
        }
    }

    /// Returns the read-only view handed to the task.
    pub fn view(&self) -> ControlView {
        ControlView {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stops the task at its next checkpoint.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    /// Lets the task advance again and wakes it if it is parked.
    pub fn resume(&self) {
        debug_assert!(!self.is_cancelled(), "resume() on a cancelled controller");
        if self.is_cancelled() {
            return;
        }
        self.shared.resumes.fetch_add(1, Ordering::Relaxed);
        self.shared.paused.store(false, Ordering::Release);
        self.shared.wake.notify_waiters();
    }

    /// Switches the task to fallback mode for all its remaining turns.
    pub fn request_degrade(&self) {
        self.shared.degraded.store(true, Ordering::Release);
    }

    /// Terminal: the task stops at its next checkpoint or suspension point.
    pub fn request_cancel(&self) {
        self.shared.cancel.cancel();
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.shared.degraded.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Number of times this controller was resumed (one per granted turn).
    pub fn resumes(&self) -> u32 {
        self.shared.resumes.load(Ordering::Relaxed)
    }
}

/// Task-side, read-only view of a [`TaskController`].
#[derive(Debug, Clone)]
pub struct ControlView {
    shared: Arc<Shared>,
}

impl ControlView {
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.shared.degraded.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Completes once the controller is cancelled.
    pub async fn cancelled(&self) {
        self.shared.cancel.cancelled().await
    }

    /// Parks until the controller is resumed.
    ///
    /// Returns `false` if the controller was cancelled instead.
    pub async fn wait_resumed(&self) -> bool {
        loop {
            let notified = self.shared.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return false;
            }
            if !self.is_paused() {
                return true;
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = self.shared.cancel.cancelled() => return false,
            }
        }
    }
}
