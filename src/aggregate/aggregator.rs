//! # Per-subroutine result sink.
//!
//! Successful executions are kept verbatim in discovery order; failures are
//! collapsed into a `description → count` histogram so that an engine
//! reporting the same failure thousands of times costs one entry.

use std::collections::HashMap;

use crate::tasks::{Execution, ResultEvent};

/// What [`ResultAggregator::record`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Execution,
    /// First occurrence of this failure description.
    NewFailure,
    /// Known description; only its count moved.
    RepeatedFailure,
}

/// Accumulates one subroutine's results.
#[derive(Debug)]
pub struct ResultAggregator<T> {
    executions: Vec<Execution<T>>,
    failure_counts: HashMap<String, u64>,
}

impl<T> Default for ResultAggregator<T> {
    fn default() -> Self {
        Self {
            executions: Vec::new(),
            failure_counts: HashMap::new(),
        }
    }
}

impl<T> ResultAggregator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one event.
    pub fn record(&mut self, event: ResultEvent<T>) -> Recorded {
        match event {
            ResultEvent::Success(exec) => {
                self.executions.push(exec);
                Recorded::Execution
            }
            ResultEvent::Failure(description) => {
                if self.record_failure(description) == 1 {
                    Recorded::NewFailure
                } else {
                    Recorded::RepeatedFailure
                }
            }
        }
    }

    /// Merge-increments the count of `description`; returns the new count.
    pub fn record_failure(&mut self, description: String) -> u64 {
        let count = self.failure_counts.entry(description).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Sets the count of `description` to 1 unless it is already present.
    pub fn seed_failure(&mut self, description: impl Into<String>) {
        self.failure_counts.entry(description.into()).or_insert(1);
    }

    pub fn executions(&self) -> &[Execution<T>] {
        &self.executions
    }

    /// Mutable access for consumers that tag executions after the fact.
    pub fn executions_mut(&mut self) -> &mut [Execution<T>] {
        &mut self.executions
    }

    pub fn failure_counts(&self) -> &HashMap<String, u64> {
        &self.failure_counts
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty() && self.failure_counts.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Execution<T>>, HashMap<String, u64>) {
        (self.executions, self.failure_counts)
    }
}
