//! Overload alert delivery.
//!
//! [`OverloadDispatcher`] accepts `(person, date)` pairs from load mutations,
//! re-checks each one against the store on a bounded worker pool and posts
//! an [`OverloadAlert`](loadcal_core::alert::OverloadAlert) to the
//! configured webhook when the person is over capacity on a future day.
//! Delivery is best effort: failures are logged and never retried.

mod dispatcher;

pub mod error;

pub use dispatcher::{AlertConfig, OverloadDispatcher};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
