//! # Event subscribers for the scheduler.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] that
//! fans events out from the [`Bus`](crate::events::Bus) to every subscriber.
//!
//! ## Architecture
//! ```text
//!   Scheduler ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                          │
//!                                                 ┌────────┼─────────┐
//!                                                 ▼        ▼         ▼
//!                                             LogWriter  Metrics   Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
