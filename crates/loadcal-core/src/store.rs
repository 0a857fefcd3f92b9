//! The `LoadStore` trait, the narrow contract the engine needs from a
//! relational backend.
//!
//! The trait is implemented by storage backends (e.g. `loadcal-store-sqlite`).
//! Everything above it (`capacity`, `aggregate`, `heatmap`, `assign`, the
//! alert dispatcher and the HTTP API) depends on this abstraction only.
//!
//! Lookups that can legitimately miss return `Option`/`bool`; the engine
//! turns those into domain errors. `Self::Error` is reserved for backend
//! failures.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  calendar::DateRange,
  capacity::CapacityOverride,
  entity::{Entity, EntityKind, EntityPatch, NewEntity},
  load::{AssignmentInput, LoadWithAssignments, NewLoad},
};

/// The uniqueness constraint that refused an entity write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityConflict {
  Id,
  EmployeeId,
}

/// Abstraction over the relational store backing the load calendar.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded runtime (axum handlers, detached alert workers).
pub trait LoadStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Entities ──────────────────────────────────────────────────────────

  /// Point lookup by id. `None` if no such entity.
  fn get_entity<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Entity>, Self::Error>> + Send + 'a;

  /// Lookup through the secondary `employee_id` key.
  fn find_by_employee_id<'a>(
    &'a self,
    employee_id: &'a str,
  ) -> impl Future<Output = Result<Option<Entity>, Self::Error>> + Send + 'a;

  /// All entities, optionally of one kind, ordered by kind then title.
  fn list_entities(
    &self,
    kind: Option<EntityKind>,
  ) -> impl Future<Output = Result<Vec<Entity>, Self::Error>> + Send + '_;

  /// Total number of entities; used to decide whether to seed.
  fn count_entities(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert a validated entity. A taken id or employee id is reported as
  /// an [`EntityConflict`], atomically with the write.
  fn create_entity(
    &self,
    input: NewEntity,
  ) -> impl Future<
    Output = Result<Result<Entity, EntityConflict>, Self::Error>,
  > + Send
  + '_;

  /// Apply a partial update. Returns the updated entity, `None` if it does
  /// not exist, or [`EntityConflict::EmployeeId`] if the new employee id
  /// belongs to someone else.
  fn update_entity<'a>(
    &'a self,
    id: &'a str,
    patch: EntityPatch,
  ) -> impl Future<
    Output = Result<Result<Option<Entity>, EntityConflict>, Self::Error>,
  > + Send
  + 'a;

  /// Delete an entity together with its memberships, overrides and
  /// assignments. Returns `false` if it did not exist.
  fn delete_entity<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Group membership ──────────────────────────────────────────────────

  /// Current member emails of a group.
  fn group_members<'a>(
    &'a self,
    group_id: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Ids of every group the person currently belongs to.
  fn groups_for_person<'a>(
    &'a self,
    person: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Idempotent: adding an existing member is a no-op.
  fn add_member<'a>(
    &'a self,
    group_id: &'a str,
    person: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Returns `false` if the person was not a member.
  fn remove_member<'a>(
    &'a self,
    group_id: &'a str,
    person: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Capacity overrides ────────────────────────────────────────────────

  /// The override for one entity and day, if any.
  fn get_override<'a>(
    &'a self,
    entity_id: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<f64>, Self::Error>> + Send + 'a;

  /// Overrides whose date falls in `range`, ordered by date.
  fn overrides_in_range<'a>(
    &'a self,
    entity_id: &'a str,
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<CapacityOverride>, Self::Error>> + Send + 'a;

  /// Insert or replace the override for `(entity_id, date)`.
  fn set_override(
    &self,
    value: CapacityOverride,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if there was no override to delete.
  fn delete_override<'a>(
    &'a self,
    entity_id: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Atomically set the default capacity (when given) and upsert every
  /// override. Returns `false` if the entity does not exist, in which case
  /// nothing is written.
  fn update_capacity<'a>(
    &'a self,
    entity_id: &'a str,
    default_capacity: Option<f64>,
    overrides: Vec<(NaiveDate, f64)>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Loads ─────────────────────────────────────────────────────────────

  /// A load with all of its assignments.
  fn get_load(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<LoadWithAssignments>, Self::Error>> + Send + '_;

  /// Every load dated within `range`, with all assignments, ordered by date
  /// then id.
  fn loads_in_range(
    &self,
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<LoadWithAssignments>, Self::Error>> + Send + '_;

  /// In a single transaction: insert each of `create` that does not already
  /// exist, insert the load or update the row sharing its `external_id`, and
  /// replace that load's assignment set with `assignments`. Returns the
  /// load id.
  fn upsert_load(
    &self,
    load: NewLoad,
    assignments: Vec<AssignmentInput>,
    create: Vec<NewEntity>,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// In a single transaction: insert each of `create` that does not already
  /// exist, then add each assignment to the load, replacing the weight of
  /// any person already assigned. Returns `false` (writing nothing) if the
  /// load does not exist.
  fn add_assignments(
    &self,
    load_id: i64,
    assignments: Vec<AssignmentInput>,
    create: Vec<NewEntity>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the person was not assigned to the load.
  fn remove_assignment<'a>(
    &'a self,
    load_id: i64,
    person: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete a load and its assignments. Returns `false` if it did not exist.
  fn delete_load(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Aggregates ────────────────────────────────────────────────────────

  /// Sum of the person's assignment weights per day in `range`. Days with no
  /// assignments are absent.
  fn person_load_by_day<'a>(
    &'a self,
    person: &'a str,
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<(NaiveDate, f64)>, Self::Error>> + Send + 'a;

  /// Sum of assignment weights per day over the group's current members,
  /// computed in one aggregated query. Days with no assignments are absent.
  fn group_load_by_day<'a>(
    &'a self,
    group_id: &'a str,
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<(NaiveDate, f64)>, Self::Error>> + Send + 'a;

  /// Sum of the person's assignment weights on one day; `0.0` when none.
  fn person_load_on<'a>(
    &'a self,
    person: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + 'a;

  /// Loads on `date` that the person is assigned to, each carrying only
  /// that person's assignment. Ordered by load id.
  fn person_loads_on<'a>(
    &'a self,
    person: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<LoadWithAssignments>, Self::Error>> + Send + 'a;

  /// Distinct loads on `date` assigned to any current group member, each
  /// carrying every member assignment it has. Ordered by load id.
  fn group_loads_on<'a>(
    &'a self,
    group_id: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<LoadWithAssignments>, Self::Error>> + Send + 'a;
}
