use std::collections::HashMap;
use std::collections::hash_map;

use crate::aggregate::ResultAggregator;
use crate::tasks::{Execution, Outcome, SubroutineId};

/// Final results of one subroutine.
#[derive(Debug)]
pub struct SubroutineResult<T> {
    /// Successful executions in discovery order.
    pub executions: Vec<Execution<T>>,
    /// Failure description → number of occurrences.
    pub failure_counts: HashMap<String, u64>,
    /// Round-robin turns the subroutine received; `0` means it was starved.
    pub turns_granted: u32,
    pub outcome: Outcome,
    /// The task switched to its fallback producer.
    pub degraded: bool,
}

impl<T> SubroutineResult<T> {
    pub(crate) fn from_aggregator(
        agg: ResultAggregator<T>,
        turns_granted: u32,
        outcome: Outcome,
        degraded: bool,
    ) -> Self {
        let (executions, failure_counts) = agg.into_parts();
        Self {
            executions,
            failure_counts,
            turns_granted,
            outcome,
            degraded,
        }
    }

    /// Never scheduled before the batch ended.
    pub fn was_starved(&self) -> bool {
        self.turns_granted == 0
    }

    /// Total number of failures, repeats included.
    pub fn failure_total(&self) -> u64 {
        self.failure_counts.values().sum()
    }
}

/// Per-subroutine results of one batch. Immutable once returned.
#[derive(Debug)]
pub struct BatchResult<T> {
    results: HashMap<SubroutineId, SubroutineResult<T>>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            results: HashMap::new(),
        }
    }
}

impl<T> BatchResult<T> {
    pub(crate) fn from_map(results: HashMap<SubroutineId, SubroutineResult<T>>) -> Self {
        Self { results }
    }

    pub fn get(&self, id: &str) -> Option<&SubroutineResult<T>> {
        self.results.get(id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, SubroutineId, SubroutineResult<T>> {
        self.results.iter()
    }

    /// Subroutines that never got a turn, sorted.
    pub fn starved(&self) -> Vec<&SubroutineId> {
        let mut ids: Vec<_> = self
            .results
            .iter()
            .filter(|(_, r)| r.was_starved())
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn into_inner(self) -> HashMap<SubroutineId, SubroutineResult<T>> {
        self.results
    }
}

impl<T> IntoIterator for BatchResult<T> {
    type Item = (SubroutineId, SubroutineResult<T>);
    type IntoIter = hash_map::IntoIter<SubroutineId, SubroutineResult<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a BatchResult<T> {
    type Item = (&'a SubroutineId, &'a SubroutineResult<T>);
    type IntoIter = hash_map::Iter<'a, SubroutineId, SubroutineResult<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
