//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  #[error("missing or invalid API key")]
  Unauthorized,

  /// Details have already been logged; the client sees a generic message.
  #[error("internal server error")]
  Internal,
}

impl From<loadcal_core::Error> for ApiError {
  fn from(e: loadcal_core::Error) -> Self {
    if e.is_not_found() {
      ApiError::NotFound(e.to_string())
    } else if e.is_validation() {
      ApiError::BadRequest(e.to_string())
    } else if e.is_conflict() {
      ApiError::Conflict(e.to_string())
    } else {
      error!(error = %e, source = ?std::error::Error::source(&e), "request failed");
      ApiError::Internal
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use loadcal_core::Error;

  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("disk I/O error at /var/lib/loadcal.db")]
  struct DiskError;

  #[test]
  fn core_errors_map_to_statuses() {
    let cases = [
      (Error::EntityNotFound("x".into()), StatusCode::NOT_FOUND),
      (Error::LoadNotFound(4), StatusCode::NOT_FOUND),
      (Error::InvalidDate("nope".into()), StatusCode::BAD_REQUEST),
      (Error::NegativeCapacity(-1.0), StatusCode::BAD_REQUEST),
      (Error::UnknownAssignee("a@b.co".into()), StatusCode::BAD_REQUEST),
      (Error::EntityExists("x".into()), StatusCode::CONFLICT),
      (Error::store("reading", DiskError), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn store_failure_text_is_not_exposed() {
    let api = ApiError::from(Error::store("reading", DiskError));
    assert_eq!(api.to_string(), "internal server error");
  }
}
