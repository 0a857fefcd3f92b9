//! SQLite backend for the load calendar.
//!
//! Wraps [`tokio_rusqlite`] so every query runs on the connection's own
//! thread without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
