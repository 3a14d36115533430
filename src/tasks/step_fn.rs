//! # Function-backed producer (`StepFn`)
//!
//! [`StepFn`] wraps a closure `F: FnMut() -> Fut`, producing a fresh future per
//! step. State that must survive between steps lives in the closure's captures
//! (or behind an `Arc` the closure clones into each future).
//!
//! ## Example
//! ```rust
//! use genvisor::{Producer, Step, StepFn, TaskError};
//!
//! let mut left = 3u32;
//! let counter: Box<dyn Producer<u32>> = StepFn::boxed(move || {
//!     let step = if left == 0 {
//!         Step::Exhausted
//!     } else {
//!         left -= 1;
//!         Step::success(left)
//!     };
//!     async move { Ok::<_, TaskError>(step) }
//! });
//! # let _ = counter;
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::{Producer, Step};

/// Function-backed producer implementation.
#[derive(Debug)]
pub struct StepFn<F> {
    f: F,
}

impl<F> StepFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the producer and returns it boxed, ready for an [`EngineFactory`](crate::EngineFactory).
    pub fn boxed<T, Fut>(f: F) -> Box<dyn Producer<T>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Step<T>, TaskError>> + Send + 'static,
        T: Send + 'static,
    {
        Box::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut, T> Producer<T> for StepFn<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Step<T>, TaskError>> + Send + 'static,
    T: Send + 'static,
{
    async fn step(&mut self) -> Result<Step<T>, TaskError> {
        (self.f)().await
    }
}
