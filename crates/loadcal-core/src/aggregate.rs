//! Summing assignment weights per day for people and groups.
//!
//! A group's load is always computed over whoever is a member when the
//! query runs; nothing is snapshotted at assignment time.

use chrono::NaiveDate;
use tracing::debug;

use crate::{
  Error, Result,
  calendar::{DateRange, DaySeries},
  entity::{Entity, EntityKind},
  load::LoadWithAssignments,
  store::LoadStore,
};

/// Per-day load of one person over `range`; days without work are `0.0`.
pub async fn person_load_for_range<S: LoadStore>(
  store: &S,
  person: &str,
  range: DateRange,
) -> Result<DaySeries<f64>> {
  let sparse = store
    .person_load_by_day(person, range)
    .await
    .map_err(Error::store_op(format!("aggregating load for {person}")))?;
  Ok(DaySeries::from_sparse(range, 0.0, sparse))
}

/// Per-day load summed over the group's current members.
pub async fn group_load_for_range<S: LoadStore>(
  store: &S,
  group_id: &str,
  range: DateRange,
) -> Result<DaySeries<f64>> {
  let sparse = store
    .group_load_by_day(group_id, range)
    .await
    .map_err(Error::store_op(format!("aggregating load for group {group_id}")))?;
  debug!(group = %group_id, days = sparse.len(), "aggregated group load");
  Ok(DaySeries::from_sparse(range, 0.0, sparse))
}

/// Dispatch on the entity's kind.
pub async fn load_for_range<S: LoadStore>(
  store: &S,
  entity: &Entity,
  range: DateRange,
) -> Result<DaySeries<f64>> {
  match entity.kind {
    EntityKind::Person => person_load_for_range(store, &entity.id, range).await,
    EntityKind::Group => group_load_for_range(store, &entity.id, range).await,
  }
}

/// Loads touching `entity` on `date`.
///
/// For a person, each load carries only that person's assignment. For a
/// group, each load appears once and carries every current member's
/// assignment on it.
pub async fn loads_for_entity_on_date<S: LoadStore>(
  store: &S,
  entity: &Entity,
  date: NaiveDate,
) -> Result<Vec<LoadWithAssignments>> {
  let id = entity.id.as_str();
  match entity.kind {
    EntityKind::Person => store
      .person_loads_on(id, date)
      .await
      .map_err(Error::store_op(format!("listing loads of {id} on {date}"))),
    EntityKind::Group => store
      .group_loads_on(id, date)
      .await
      .map_err(Error::store_op(format!(
        "listing loads of group {id} on {date}"
      ))),
  }
}

/// One person's total on one day; `0.0` when unassigned.
pub async fn person_load_for_date<S: LoadStore>(
  store: &S,
  person: &str,
  date: NaiveDate,
) -> Result<f64> {
  store
    .person_load_on(person, date)
    .await
    .map_err(Error::store_op(format!("reading load of {person} on {date}")))
}
