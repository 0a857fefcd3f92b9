//! Handlers for `/groups/{id}/members`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use loadcal_core::{directory, store::LoadStore};

use crate::{ApiState, auth::RequireApiKey, error::ApiError};

/// `GET /groups/{id}/members`
pub async fn members<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(group_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
  Ok(Json(directory::group_members(&*state.store, &group_id).await?))
}

/// `PUT /groups/{id}/members/{person}`; idempotent.
pub async fn add_member<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path((group_id, person)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
  directory::add_member(&*state.store, &group_id, &person).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /groups/{id}/members/{person}`
pub async fn remove_member<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path((group_id, person)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
  directory::remove_member(&*state.store, &group_id, &person).await?;
  Ok(StatusCode::NO_CONTENT)
}
