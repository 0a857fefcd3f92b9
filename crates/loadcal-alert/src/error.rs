//! Error type for `loadcal-alert`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build webhook client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("alert concurrency must be at least 1")]
  ZeroConcurrency,

  #[error("alert queue capacity must be at least 1")]
  ZeroQueue,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
