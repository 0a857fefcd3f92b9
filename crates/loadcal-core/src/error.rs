//! Error types for `loadcal-core`.

use thiserror::Error;

use crate::entity::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  // ── Not found ───────────────────────────────────────────────────────────
  #[error("entity not found: {0}")]
  EntityNotFound(String),

  #[error("load not found: {0}")]
  LoadNotFound(i64),

  #[error("{person} is not assigned to load {load_id}")]
  AssignmentNotFound { load_id: i64, person: String },

  // ── Validation ──────────────────────────────────────────────────────────
  #[error("invalid date {0:?}: expected YYYY-MM-DD")]
  InvalidDate(String),

  #[error("capacity cannot be negative: {0}")]
  NegativeCapacity(f64),

  #[error("weight for {person} must be a non-negative number, got {weight}")]
  InvalidWeight { person: String, weight: f64 },

  #[error("assignee {0:?} is not a valid email address")]
  InvalidAssignee(String),

  #[error("assignee not found: {0}")]
  UnknownAssignee(String),

  #[error("assignee {0} is listed more than once")]
  DuplicateAssignee(String),

  #[error("entity {id} is a {actual}, expected a {expected}")]
  WrongEntityKind {
    id:       String,
    expected: EntityKind,
    actual:   EntityKind,
  },

  #[error("{0}")]
  Validation(String),

  // ── Conflict ────────────────────────────────────────────────────────────
  #[error("entity already exists: {0}")]
  EntityExists(String),

  #[error("employee id {0} is already in use")]
  EmployeeIdTaken(String),

  // ── Backend ─────────────────────────────────────────────────────────────
  /// A failure reported by the [`LoadStore`](crate::store::LoadStore)
  /// backend, tagged with the operation that was in progress.
  #[error("store error while {op}: {source}")]
  Store {
    op:     String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  /// Wrap a backend error with a description of the operation.
  pub fn store<E>(op: impl Into<String>, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store { op: op.into(), source: Box::new(source) }
  }

  /// Build a closure suitable for `map_err` that tags a backend error.
  pub fn store_op<E>(op: impl Into<String>) -> impl FnOnce(E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let op = op.into();
    move |e| Self::store(op, e)
  }

  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::EntityNotFound(_)
        | Self::LoadNotFound(_)
        | Self::AssignmentNotFound { .. }
    )
  }

  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::InvalidDate(_)
        | Self::NegativeCapacity(_)
        | Self::InvalidWeight { .. }
        | Self::InvalidAssignee(_)
        | Self::UnknownAssignee(_)
        | Self::DuplicateAssignee(_)
        | Self::WrongEntityKind { .. }
        | Self::Validation(_)
    )
  }

  pub fn is_conflict(&self) -> bool {
    matches!(self, Self::EntityExists(_) | Self::EmployeeIdTaken(_))
  }

  pub(crate) fn wrong_kind(
    id: &str,
    expected: EntityKind,
    actual: EntityKind,
  ) -> Self {
    Self::WrongEntityKind { id: id.to_owned(), expected, actual }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
