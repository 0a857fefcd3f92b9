//! The calendar heatmap and its single-day drill-down.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::{
  Result,
  aggregate::{load_for_range, loads_for_entity_on_date},
  calendar::DateRange,
  capacity::{capacities_of, capacity_of},
  directory::get_entity,
  entity::Entity,
  heat::HeatLevel,
  load::LoadWithAssignments,
  store::LoadStore,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapDay {
  pub date:     NaiveDate,
  pub load:     f64,
  pub capacity: f64,
  pub level:    HeatLevel,
  pub color:    &'static str,
}

impl HeatmapDay {
  pub fn new(date: NaiveDate, load: f64, capacity: f64) -> Self {
    let level = HeatLevel::classify(load, capacity);
    Self { date, load, capacity, level, color: level.hex() }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
  pub entity: Entity,
  pub days:   Vec<HeatmapDay>,
}

impl Heatmap {
  pub fn day(&self, date: NaiveDate) -> Option<&HeatmapDay> {
    self.days.iter().find(|d| d.date == date)
  }
}

/// Build the heatmap for the standard window around `today`.
pub async fn build_heatmap<S: LoadStore>(
  store: &S,
  entity_id: &str,
  today: NaiveDate,
) -> Result<Heatmap> {
  build_heatmap_for_range(store, entity_id, DateRange::heatmap_window(today)?)
    .await
}

/// Build a heatmap over an explicit range. An entity with no data yields a
/// fully populated series of idle days.
pub async fn build_heatmap_for_range<S: LoadStore>(
  store: &S,
  entity_id: &str,
  range: DateRange,
) -> Result<Heatmap> {
  let entity = get_entity(store, entity_id).await?;
  let capacities = capacities_of(store, &entity, range).await?;
  let loads = load_for_range(store, &entity, range).await?;

  let days = range
    .days()
    .map(|date| {
      let load = loads.get(date).copied().unwrap_or(0.0);
      let capacity = capacities.get(date).copied().unwrap_or(0.0);
      HeatmapDay::new(date, load, capacity)
    })
    .collect::<Vec<_>>();

  debug!(
    entity = %entity.id,
    start = %range.start(),
    end = %range.end(),
    overloaded = days.iter().filter(|d| d.level.is_overloaded()).count(),
    "built heatmap"
  );
  Ok(Heatmap { entity, days })
}

/// Everything behind one heatmap cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDetails {
  pub entity:     Entity,
  pub date:       NaiveDate,
  pub loads:      Vec<LoadWithAssignments>,
  /// Sum of every returned assignment. For a group a load with two member
  /// assignments contributes both.
  pub total_load: f64,
  pub capacity:   f64,
  pub level:      HeatLevel,
  pub color:      &'static str,
}

pub async fn day_details<S: LoadStore>(
  store: &S,
  entity_id: &str,
  date: NaiveDate,
) -> Result<DayDetails> {
  let entity = get_entity(store, entity_id).await?;
  let loads = loads_for_entity_on_date(store, &entity, date).await?;
  let total_load = loads.iter().map(LoadWithAssignments::total_weight).sum();
  let capacity = capacity_of(store, &entity, date).await?;
  let level = HeatLevel::classify(total_load, capacity);

  Ok(DayDetails {
    entity,
    date,
    loads,
    total_load,
    capacity,
    level,
    color: level.hex(),
  })
}
