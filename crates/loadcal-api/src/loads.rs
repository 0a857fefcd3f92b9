//! Handlers for `/loads` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/loads?start=&end=` | Loads with assignments in an inclusive date range |
//! | `POST`   | `/loads/upsert` | Idempotent per `external_id`; returns `{"id":..}` |
//! | `POST`   | `/loads/upsert-by-employee-id` | Assignees by employee id; all must exist |
//! | `GET`    | `/loads/{id}` | |
//! | `DELETE` | `/loads/{id}` | |
//! | `POST`   | `/loads/{id}/assignees` | Body: `{"assignees":[{"person":..,"weight":..}]}` |
//! | `DELETE` | `/loads/{id}/assignees/{person}` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use loadcal_core::{
  assign::{self, EmployeeAssignee},
  calendar::{DateRange, parse_date},
  load::{Assignee, LoadWithAssignments, NewLoad},
  store::LoadStore,
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, auth::RequireApiKey, error::ApiError};

// ─── Reads ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub start: String,
  pub end:   String,
}

/// `GET /loads?start=YYYY-MM-DD&end=YYYY-MM-DD`
pub async fn list<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<LoadWithAssignments>>, ApiError> {
  let range = DateRange::new(parse_date(&params.start)?, parse_date(&params.end)?)?;
  Ok(Json(assign::loads_in_range(&*state.store, range).await?))
}

/// `GET /loads/{id}`
pub async fn get_one<S: LoadStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<LoadWithAssignments>, ApiError> {
  Ok(Json(assign::get_load(&*state.store, id).await?))
}

// ─── Upserts ─────────────────────────────────────────────────────────────────

/// Load fields shared by both upsert bodies. `date` is parsed by hand so a
/// malformed value is reported like every other validation failure.
#[derive(Debug, Deserialize)]
pub struct LoadFields {
  #[serde(default)]
  pub external_id: Option<String>,
  pub title:       String,
  #[serde(default)]
  pub source:      Option<String>,
  #[serde(default)]
  pub url:         Option<String>,
  pub date:        String,
}

impl LoadFields {
  fn into_new_load(self) -> Result<NewLoad, ApiError> {
    Ok(NewLoad {
      external_id: self.external_id,
      title:       self.title,
      source:      self.source,
      url:         self.url,
      date:        parse_date(&self.date)?,
    })
  }
}

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  #[serde(flatten)]
  pub load:      LoadFields,
  #[serde(default)]
  pub assignees: Vec<Assignee>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertByEmployeeBody {
  #[serde(flatten)]
  pub load:      LoadFields,
  #[serde(default)]
  pub assignees: Vec<EmployeeAssignee>,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
  pub id: i64,
}

/// `POST /loads/upsert`
pub async fn upsert<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Json(body): Json<UpsertBody>,
) -> Result<Json<UpsertResponse>, ApiError> {
  let load = body.load.into_new_load()?;
  let id = assign::upsert_load(
    &*state.store,
    state.policy,
    load,
    &body.assignees,
    &*state.alerts,
  )
  .await?;
  Ok(Json(UpsertResponse { id }))
}

/// `POST /loads/upsert-by-employee-id`
pub async fn upsert_by_employee_id<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Json(body): Json<UpsertByEmployeeBody>,
) -> Result<Json<UpsertResponse>, ApiError> {
  let load = body.load.into_new_load()?;
  let id = assign::upsert_load_by_employee_id(
    &*state.store,
    load,
    &body.assignees,
    &*state.alerts,
  )
  .await?;
  Ok(Json(UpsertResponse { id }))
}

// ─── Assignees ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssigneesBody {
  pub assignees: Vec<Assignee>,
}

/// `POST /loads/{id}/assignees`
pub async fn add_assignees<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<AssigneesBody>,
) -> Result<StatusCode, ApiError> {
  assign::add_assignees(
    &*state.store,
    state.policy,
    id,
    &body.assignees,
    &*state.alerts,
  )
  .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /loads/{id}/assignees/{person}`
pub async fn remove_assignee<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path((id, person)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
  assign::remove_assignee(&*state.store, id, &person).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /loads/{id}`
pub async fn delete<S: LoadStore + 'static>(
  _: RequireApiKey,
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  assign::delete_load(&*state.store, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
