//! # Forced-mocking side channel.
//!
//! Engines raise these flags when they had to mock something the configured
//! strategy did not allow. Every task owns its own pair. The scheduler lowers
//! them at the start of that task's turn and the task reads them when it emits,
//! tagging explored executions produced while a flag was up.
//!
//! The flags are level-triggered: raising one twice is the same as once, and
//! only [`MockSignals::reset`] lowers them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct Flags {
    generic: AtomicBool,
    statics: AtomicBool,
}

/// One task's pair of "forced mock happened" flags, shared with its engine.
#[derive(Debug, Clone, Default)]
pub struct MockSignals {
    flags: Arc<Flags>,
}

impl MockSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance mock was forced.
    pub fn force_mock_happened(&self) {
        self.flags.generic.store(true, Ordering::Release);
    }

    /// A static mock was forced.
    pub fn force_static_mock_happened(&self) {
        self.flags.statics.store(true, Ordering::Release);
    }

    pub fn generic_triggered(&self) -> bool {
        self.flags.generic.load(Ordering::Acquire)
    }

    pub fn static_triggered(&self) -> bool {
        self.flags.statics.load(Ordering::Acquire)
    }

    /// Either flag is up.
    pub fn triggered(&self) -> bool {
        self.generic_triggered() || self.static_triggered()
    }

    pub fn reset(&self) {
        self.flags.generic.store(false, Ordering::Release);
        self.flags.statics.store(false, Ordering::Release);
    }
}
