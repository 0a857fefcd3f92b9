//! Handlers for `/heatmap` endpoints.

use axum::{
  Json,
  extract::{Path, State},
};
use loadcal_core::{
  calendar::{parse_date, today_utc},
  heatmap::{self, DayDetails, Heatmap},
  store::LoadStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /heatmap/{id}`: one month back through six months ahead of today
/// (UTC).
pub async fn window<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Heatmap>, ApiError> {
  Ok(Json(
    heatmap::build_heatmap(&*state.store, &id, today_utc()).await?,
  ))
}

/// `GET /heatmap/{id}/days/{date}`
pub async fn day<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path((id, date)): Path<(String, String)>,
) -> Result<Json<DayDetails>, ApiError> {
  let date = parse_date(&date)?;
  Ok(Json(heatmap::day_details(&*state.store, &id, date).await?))
}
