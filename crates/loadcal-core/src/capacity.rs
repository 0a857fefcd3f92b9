//! Effective capacity: a per-day override if one exists, otherwise the
//! entity's default.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  calendar::{DateRange, DaySeries, parse_date},
  directory::{get_entity, update_entity},
  entity::{Entity, EntityPatch, validate_capacity},
  store::LoadStore,
};

/// How far ahead [`capacity_info`] lists overrides.
pub const OVERRIDE_HORIZON_DAYS: u64 = 90;

/// A per-date capacity replacing an entity's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityOverride {
  pub entity_id: String,
  pub date:      NaiveDate,
  pub capacity:  f64,
}

/// Effective capacity of `entity_id` on `date`.
pub async fn effective_capacity<S: LoadStore>(
  store: &S,
  entity_id: &str,
  date: NaiveDate,
) -> Result<f64> {
  let entity = get_entity(store, entity_id).await?;
  capacity_of(store, &entity, date).await
}

/// Effective capacity of an already-resolved entity on `date`.
pub async fn capacity_of<S: LoadStore>(
  store: &S,
  entity: &Entity,
  date: NaiveDate,
) -> Result<f64> {
  let value = store
    .get_override(&entity.id, date)
    .await
    .map_err(Error::store_op(format!(
      "reading capacity override for {} on {date}",
      entity.id
    )))?;
  Ok(value.unwrap_or(entity.default_capacity))
}

/// One capacity per day of `range`, defaults overlaid with overrides.
pub async fn capacities_for_range<S: LoadStore>(
  store: &S,
  entity_id: &str,
  range: DateRange,
) -> Result<DaySeries<f64>> {
  let entity = get_entity(store, entity_id).await?;
  capacities_of(store, &entity, range).await
}

pub async fn capacities_of<S: LoadStore>(
  store: &S,
  entity: &Entity,
  range: DateRange,
) -> Result<DaySeries<f64>> {
  let overrides = store
    .overrides_in_range(&entity.id, range)
    .await
    .map_err(Error::store_op(format!(
      "reading capacity overrides for {} in {}..={}",
      entity.id,
      range.start(),
      range.end()
    )))?;
  debug!(
    entity = %entity.id,
    overrides = overrides.len(),
    "resolved capacity range"
  );
  Ok(DaySeries::from_sparse(
    range,
    entity.default_capacity,
    overrides.into_iter().map(|o| (o.date, o.capacity)),
  ))
}

// ─── Management ──────────────────────────────────────────────────────────────

pub async fn set_default_capacity<S: LoadStore>(
  store: &S,
  entity_id: &str,
  capacity: f64,
) -> Result<Entity> {
  validate_capacity(capacity)?;
  let patch = EntityPatch {
    default_capacity: Some(capacity),
    ..Default::default()
  };
  let entity = update_entity(store, entity_id, patch).await?;
  info!(entity = %entity_id, capacity, "default capacity set");
  Ok(entity)
}

pub async fn set_override<S: LoadStore>(
  store: &S,
  entity_id: &str,
  date: NaiveDate,
  capacity: f64,
) -> Result<CapacityOverride> {
  validate_capacity(capacity)?;
  get_entity(store, entity_id).await?;

  let value = CapacityOverride {
    entity_id: entity_id.to_owned(),
    date,
    capacity,
  };
  store
    .set_override(value.clone())
    .await
    .map_err(Error::store_op(format!(
      "setting capacity override for {entity_id} on {date}"
    )))?;
  info!(entity = %entity_id, %date, capacity, "capacity override set");
  Ok(value)
}

/// Remove an override. Returns whether one existed.
pub async fn clear_override<S: LoadStore>(
  store: &S,
  entity_id: &str,
  date: NaiveDate,
) -> Result<bool> {
  get_entity(store, entity_id).await?;
  store
    .delete_override(entity_id, date)
    .await
    .map_err(Error::store_op(format!(
      "deleting capacity override for {entity_id} on {date}"
    )))
}

/// A batch change to one entity's capacity, as submitted by a form or API
/// client. Dates arrive as strings and are parsed before anything is
/// written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CapacityUpdate {
  #[serde(default)]
  pub default_capacity: Option<f64>,
  #[serde(default)]
  pub overrides:        Vec<OverrideInput>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverrideInput {
  pub date:     String,
  pub capacity: f64,
}

impl CapacityUpdate {
  fn validate(&self) -> Result<Vec<(NaiveDate, f64)>> {
    self.default_capacity.map(validate_capacity).transpose()?;
    self
      .overrides
      .iter()
      .map(|o| {
        let date = parse_date(&o.date)?;
        validate_capacity(o.capacity)?;
        Ok((date, o.capacity))
      })
      .collect()
  }
}

/// Validate the whole batch, then apply it in one store transaction.
pub async fn apply_capacity_update<S: LoadStore>(
  store: &S,
  entity_id: &str,
  update: CapacityUpdate,
) -> Result<()> {
  let overrides = update.validate()?;
  let count = overrides.len();
  let found = store
    .update_capacity(entity_id, update.default_capacity, overrides)
    .await
    .map_err(Error::store_op(format!("updating capacity of {entity_id}")))?;
  if !found {
    return Err(Error::EntityNotFound(entity_id.to_owned()));
  }
  info!(entity = %entity_id, overrides = count, "capacity updated");
  Ok(())
}

/// An entity's default capacity and its upcoming overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityInfo {
  pub entity:    Entity,
  pub overrides: Vec<CapacityOverride>,
}

/// The entity plus every override from `today` through
/// [`OVERRIDE_HORIZON_DAYS`] ahead.
pub async fn capacity_info<S: LoadStore>(
  store: &S,
  entity_id: &str,
  today: NaiveDate,
) -> Result<CapacityInfo> {
  let entity = get_entity(store, entity_id).await?;
  let end = today
    .checked_add_days(Days::new(OVERRIDE_HORIZON_DAYS))
    .ok_or_else(|| Error::Validation(format!("{today} is out of range")))?;
  let range = DateRange::new(today, end)?;
  let overrides = store
    .overrides_in_range(entity_id, range)
    .await
    .map_err(Error::store_op(format!(
      "listing capacity overrides for {entity_id}"
    )))?;
  Ok(CapacityInfo { entity, overrides })
}
