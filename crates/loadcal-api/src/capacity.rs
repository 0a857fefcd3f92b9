//! Handlers for `/entities/{id}/capacity`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/entities/{id}/capacity` | Default plus overrides for the next 90 days |
//! | `PUT`    | `/entities/{id}/capacity` | Batch: `{"default_capacity":4,"overrides":[{"date":"2026-01-20","capacity":2}]}` |
//! | `GET`    | `/entities/{id}/capacity/{date}` | Effective capacity on one day |
//! | `PUT`    | `/entities/{id}/capacity/overrides/{date}` | Body: `{"capacity":2}` |
//! | `DELETE` | `/entities/{id}/capacity/overrides/{date}` | |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::NaiveDate;
use loadcal_core::{
  calendar::{parse_date, today_utc},
  capacity::{self, CapacityInfo, CapacityOverride, CapacityUpdate},
  store::LoadStore,
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, auth::RequireApiKey, error::ApiError};

/// `GET /entities/{id}/capacity`
pub async fn info<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<Json<CapacityInfo>, ApiError> {
  Ok(Json(
    capacity::capacity_info(&*state.store, &id, today_utc()).await?,
  ))
}

/// `PUT /entities/{id}/capacity`
pub async fn update<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
  Json(body): Json<CapacityUpdate>,
) -> Result<StatusCode, ApiError> {
  capacity::apply_capacity_update(&*state.store, &id, body).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct EffectiveCapacity {
  pub entity_id: String,
  pub date:      NaiveDate,
  pub capacity:  f64,
}

/// `GET /entities/{id}/capacity/{date}`
pub async fn effective<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path((id, date)): Path<(String, String)>,
) -> Result<Json<EffectiveCapacity>, ApiError> {
  let date = parse_date(&date)?;
  let capacity = capacity::effective_capacity(&*state.store, &id, date).await?;
  Ok(Json(EffectiveCapacity { entity_id: id, date, capacity }))
}

#[derive(Debug, Deserialize)]
pub struct OverrideBody {
  pub capacity: f64,
}

/// `PUT /entities/{id}/capacity/overrides/{date}`
pub async fn set_override<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path((id, date)): Path<(String, String)>,
  Json(body): Json<OverrideBody>,
) -> Result<Json<CapacityOverride>, ApiError> {
  let date = parse_date(&date)?;
  Ok(Json(
    capacity::set_override(&*state.store, &id, date, body.capacity).await?,
  ))
}

/// `DELETE /entities/{id}/capacity/overrides/{date}`
pub async fn clear_override<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path((id, date)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
  let date = parse_date(&date)?;
  capacity::clear_override(&*state.store, &id, date).await?;
  Ok(StatusCode::NO_CONTENT)
}
