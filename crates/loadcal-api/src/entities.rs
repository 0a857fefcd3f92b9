//! Handlers for `/entities` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/entities` | Optional `?kind=person\|group` |
//! | `POST`   | `/entities` | 201; 409 if the id is taken |
//! | `GET`    | `/entities/{id}` | 404 if not found |
//! | `PATCH`  | `/entities/{id}` | Title, employee id, default capacity |
//! | `DELETE` | `/entities/{id}` | Cascades to memberships, overrides, assignments |
//! | `GET`    | `/entities/{id}/groups` | Groups the person belongs to |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use loadcal_core::{
  directory,
  entity::{Entity, EntityKind, EntityPatch, NewEntity},
  store::LoadStore,
};
use serde::Deserialize;

use crate::{ApiState, auth::RequireApiKey, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<EntityKind>,
}

/// `GET /entities[?kind=<kind>]`
pub async fn list<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Entity>>, ApiError> {
  Ok(Json(directory::list_entities(&*state.store, params.kind).await?))
}

/// `POST /entities`
pub async fn create<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Json(body): Json<NewEntity>,
) -> Result<impl IntoResponse, ApiError> {
  let entity = directory::create_entity(&*state.store, body).await?;
  Ok((StatusCode::CREATED, Json(entity)))
}

/// `GET /entities/{id}`
pub async fn get_one<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Entity>, ApiError> {
  Ok(Json(directory::get_entity(&*state.store, &id).await?))
}

/// `PATCH /entities/{id}`
pub async fn update<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
  Json(patch): Json<EntityPatch>,
) -> Result<Json<Entity>, ApiError> {
  Ok(Json(directory::update_entity(&*state.store, &id, patch).await?))
}

/// `DELETE /entities/{id}`
pub async fn delete<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  directory::delete_entity(&*state.store, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /entities/{id}/groups`
pub async fn groups<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
  Ok(Json(directory::groups_for_person(&*state.store, &id).await?))
}
