//! # Batch configuration.
//!
//! Provides [`Config`], the settings of a [`Scheduler`](crate::Scheduler) that
//! apply to every batch it runs.
//!
//! Config is used in two ways:
//! 1. **Budget planning**: fallback cap and solver cap feed [`plan`](crate::plan)
//! 2. **Engine parameters**: mock strategy and always-mocked classes are handed to
//!    the [`EngineFactory`](crate::EngineFactory) through [`ExploreParams`](crate::ExploreParams)
//!
//! ## Sentinel values
//! - `grace = 0s` → abort tasks immediately at teardown (no waiting)
//! - `watchdog_interval`, `event_queue_capacity`, `bus_capacity` are clamped to a minimum

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Which dependencies of a subroutine the engine is allowed to mock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MockStrategy {
    /// Never mock; use real objects everywhere.
    NoMocks,
    /// Mock everything outside the package of the class under test.
    #[default]
    OtherPackages,
    /// Mock everything except the class under test.
    OtherClasses,
}

/// Configuration for the batch scheduler.
///
/// ## Field semantics
/// - `per_task_fallback_cap`: fallback time reserved per task (the fallback phase is at most half the timeout)
/// - `global_solver_cap`: upper bound of each engine's constraint-solving sub-budget
/// - `mock_strategy` / `classes_always_mocked`: passed through to the engines
/// - `watchdog_interval`: how often the drive loop re-checks the clock while a task runs (min 1ms)
/// - `grace`: how long teardown waits for cancelled tasks before aborting them (`0s` = abort at once)
/// - `event_queue_capacity`: per-task result channel size (min 1)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `stop_on_signal`: treat SIGINT/SIGTERM/SIGQUIT (Ctrl-C on Windows) as a global cancel
#[derive(Clone, Debug)]
pub struct Config {
    pub per_task_fallback_cap: Duration,
    pub global_solver_cap: Duration,
    pub mock_strategy: MockStrategy,
    pub classes_always_mocked: Arc<BTreeSet<String>>,
    pub watchdog_interval: Duration,
    pub grace: Duration,
    pub event_queue_capacity: usize,
    pub bus_capacity: usize,
    pub stop_on_signal: bool,
}

/// Classes mocked regardless of the strategy: sources of nondeterminism.
pub const DEFAULT_ALWAYS_MOCKED: &[&str] = &[
    "java.util.Random",
    "java.security.SecureRandom",
    "java.time.Clock",
];

impl Config {
    #[inline]
    pub fn per_task_fallback_cap_ms(&self) -> u64 {
        millis(self.per_task_fallback_cap)
    }

    #[inline]
    pub fn global_solver_cap_ms(&self) -> u64 {
        millis(self.global_solver_cap)
    }

    /// Watchdog poll interval clamped to at least 1ms.
    #[inline]
    pub fn watchdog_interval_clamped(&self) -> Duration {
        self.watchdog_interval.max(Duration::from_millis(1))
    }

    #[inline]
    pub fn event_queue_capacity_clamped(&self) -> usize {
        self.event_queue_capacity.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the teardown grace as an `Option` (`None` = abort immediately).
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Replaces the always-mocked class set.
    pub fn with_classes_always_mocked<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes_always_mocked = Arc::new(classes.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `per_task_fallback_cap = 300ms`
    /// - `global_solver_cap = 1s`
    /// - `mock_strategy = OtherPackages`
    /// - `classes_always_mocked = DEFAULT_ALWAYS_MOCKED`
    /// - `watchdog_interval = 5ms`
    /// - `grace = 1s`
    /// - `event_queue_capacity = 256`
    /// - `bus_capacity = 1024`
    /// - `stop_on_signal = false`
    fn default() -> Self {
        Self {
            per_task_fallback_cap: Duration::from_millis(300),
            global_solver_cap: Duration::from_millis(1000),
            mock_strategy: MockStrategy::default(),
            classes_always_mocked: Arc::new(
                DEFAULT_ALWAYS_MOCKED.iter().map(|s| s.to_string()).collect(),
            ),
            watchdog_interval: Duration::from_millis(5),
            grace: Duration::from_secs(1),
            event_queue_capacity: 256,
            bus_capacity: 1024,
            stop_on_signal: false,
        }
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.per_task_fallback_cap_ms(), 300);
        assert_eq!(cfg.global_solver_cap_ms(), 1000);
        assert!(cfg.classes_always_mocked.contains("java.util.Random"));
        assert_eq!(cfg.grace_period(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_clamping() {
        let cfg = Config {
            watchdog_interval: Duration::ZERO,
            event_queue_capacity: 0,
            bus_capacity: 0,
            grace: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.watchdog_interval_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.event_queue_capacity_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.grace_period(), None);
    }

    #[test]
    fn test_with_classes_always_mocked() {
        let cfg = Config::default().with_classes_always_mocked(["a.B", "c.D"]);
        assert_eq!(cfg.classes_always_mocked.len(), 2);
        assert!(cfg.classes_always_mocked.contains("c.D"));
    }
}
