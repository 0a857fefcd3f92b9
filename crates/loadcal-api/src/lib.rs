//! JSON REST API for the load calendar.
//!
//! Exposes an axum [`Router`] backed by any [`LoadStore`]. Reads are open;
//! mutations require the `x-api-key` header when a key is configured. TLS
//! and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", loadcal_api::api_router(ApiState::new(store.clone())))
//! ```

pub mod auth;
pub mod capacity;
pub mod entities;
pub mod error;
pub mod groups;
pub mod heatmap;
pub mod loads;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use loadcal_core::{
  alert::{AlertSink, DiscardAlerts},
  assign::AssignmentPolicy,
  store::LoadStore,
};

pub use auth::ApiKey;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:   Arc<S>,
  /// Receives the people touched by each load mutation.
  pub alerts:  Arc<dyn AlertSink>,
  pub policy:  AssignmentPolicy,
  pub api_key: Option<Arc<ApiKey>>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      alerts:  self.alerts.clone(),
      policy:  self.policy,
      api_key: self.api_key.clone(),
    }
  }
}

impl<S> ApiState<S> {
  /// Open access, default assignment policy, alerts discarded.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      alerts: Arc::new(DiscardAlerts),
      policy: AssignmentPolicy::default(),
      api_key: None,
    }
  }

  pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
    self.alerts = alerts;
    self
  }

  pub fn with_policy(mut self, policy: AssignmentPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_api_key(mut self, key: Option<&str>) -> Self {
    self.api_key = key.map(|k| Arc::new(ApiKey::new(k)));
    self
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: LoadStore + 'static,
{
  Router::new()
    // Entities
    .route(
      "/entities",
      get(entities::list::<S>).post(entities::create::<S>),
    )
    .route(
      "/entities/{id}",
      get(entities::get_one::<S>)
        .patch(entities::update::<S>)
        .delete(entities::delete::<S>),
    )
    .route("/entities/{id}/groups", get(entities::groups::<S>))
    // Groups
    .route("/groups/{id}/members", get(groups::members::<S>))
    .route(
      "/groups/{id}/members/{person}",
      put(groups::add_member::<S>).delete(groups::remove_member::<S>),
    )
    // Capacity
    .route(
      "/entities/{id}/capacity",
      get(capacity::info::<S>).put(capacity::update::<S>),
    )
    .route("/entities/{id}/capacity/{date}", get(capacity::effective::<S>))
    .route(
      "/entities/{id}/capacity/overrides/{date}",
      put(capacity::set_override::<S>).delete(capacity::clear_override::<S>),
    )
    // Loads
    .route("/loads", get(loads::list::<S>))
    .route("/loads/upsert", post(loads::upsert::<S>))
    .route(
      "/loads/upsert-by-employee-id",
      post(loads::upsert_by_employee_id::<S>),
    )
    .route(
      "/loads/{id}",
      get(loads::get_one::<S>).delete(loads::delete::<S>),
    )
    .route("/loads/{id}/assignees", post(loads::add_assignees::<S>))
    .route(
      "/loads/{id}/assignees/{person}",
      axum::routing::delete(loads::remove_assignee::<S>),
    )
    // Heatmap
    .route("/heatmap/{id}", get(heatmap::window::<S>))
    .route("/heatmap/{id}/days/{date}", get(heatmap::day::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
  };
  use chrono::{Days, NaiveDate};
  use loadcal_core::calendar::today_utc;
  use loadcal_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  #[derive(Default)]
  struct RecordingSink(Mutex<Vec<(String, NaiveDate)>>);

  impl AlertSink for RecordingSink {
    fn submit(&self, person: &str, date: NaiveDate) {
      self.0.lock().unwrap().push((person.to_owned(), date));
    }
  }

  async fn state() -> ApiState<SqliteStore> {
    ApiState::new(Arc::new(SqliteStore::open_in_memory().await.unwrap()))
  }

  async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    key: Option<&str>,
  ) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(k) = key {
      req = req.header(auth::API_KEY_HEADER, k);
    }
    let req = match body {
      Some(v) => req
        .header("content-type", "application/json")
        .body(Body::from(v.to_string())),
      None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri, None, None).await
  }

  async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, uri, Some(body), None).await
  }

  fn in_days(n: u64) -> NaiveDate {
    today_utc().checked_add_days(Days::new(n)).unwrap()
  }

  #[tokio::test]
  async fn entity_lifecycle() {
    let app = api_router(state().await);

    let (status, body) = post(
      &app,
      "/entities",
      json!({"id": "alice@example.com", "kind": "person", "title": "Alice"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["default_capacity"], 5.0);

    let (status, _) = post(
      &app,
      "/entities",
      json!({"id": "alice@example.com", "kind": "person", "title": "Alice"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
      &app,
      Method::PATCH,
      "/entities/alice@example.com",
      Some(json!({"default_capacity": 4.0})),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default_capacity"], 4.0);

    let (status, _) =
      call(&app, Method::DELETE, "/entities/alice@example.com", None, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get(&app, "/entities/alice@example.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("alice@example.com"));
  }

  #[tokio::test]
  async fn negative_capacity_is_bad_request() {
    let app = api_router(state().await);
    let (status, _) = post(
      &app,
      "/entities",
      json!({"id": "eng", "kind": "group", "title": "Eng", "default_capacity": -1}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn heatmap_and_day_details() {
    let app = api_router(state().await);
    let date = in_days(5);

    let (status, body) = post(
      &app,
      "/loads/upsert",
      json!({
        "external_id": "ext-1",
        "title": "Migration",
        "date": date.to_string(),
        "assignees": [{"person": "alice@example.com", "weight": 6.0}],
      }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].is_i64());

    let (status, body) = get(&app, "/heatmap/alice@example.com").await;
    assert_eq!(status, StatusCode::OK);
    let days = body["days"].as_array().unwrap();
    let day = days
      .iter()
      .find(|d| d["date"] == date.to_string())
      .unwrap();
    assert_eq!(day["load"], 6.0);
    assert_eq!(day["capacity"], 5.0);
    assert_eq!(day["level"], "overloaded");
    assert_eq!(day["color"], "#8B0000");

    let (status, body) =
      get(&app, &format!("/heatmap/alice@example.com/days/{date}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_load"], 6.0);
    assert_eq!(body["loads"].as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn missing_entity_heatmap_is_404() {
    let app = api_router(state().await);
    let (status, _) = get(&app, "/heatmap/ghost@example.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn malformed_dates_are_bad_requests() {
    let app = api_router(state().await);
    let (status, body) = post(
      &app,
      "/loads/upsert",
      json!({"title": "x", "date": "01/20/2026", "assignees": []}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("01/20/2026"));

    let (status, _) = get(&app, "/heatmap/a@example.com/days/tomorrow").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/loads?start=2026-02-01&end=2026-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn api_key_guards_mutations_only() {
    let app = api_router(state().await.with_api_key(Some("s3cret")));
    let body = json!({"id": "eng", "kind": "group", "title": "Eng"});

    let (status, _) = post(&app, "/entities", body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
      call(&app, Method::POST, "/entities", Some(body.clone()), Some("nope"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
      call(&app, Method::POST, "/entities", Some(body), Some("s3cret")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = get(&app, "/entities").await;
    assert_eq!(status, StatusCode::OK);
  }

  #[tokio::test]
  async fn mutations_notify_alert_sink() {
    let sink = Arc::new(RecordingSink::default());
    let app = api_router(state().await.with_alerts(sink.clone()));
    let date = in_days(3);

    let (_, body) = post(
      &app,
      "/loads/upsert",
      json!({
        "title": "x",
        "date": date.to_string(),
        "assignees": [{"person": "a@example.com"}],
      }),
    )
    .await;
    let id = body["id"].as_i64().unwrap();

    let (status, _) = post(
      &app,
      &format!("/loads/{id}/assignees"),
      json!({"assignees": [{"person": "b@example.com", "weight": 2}]}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
      &app,
      Method::DELETE,
      &format!("/loads/{id}/assignees/b@example.com"),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let seen = sink.0.lock().unwrap().clone();
    assert_eq!(seen, [
      ("a@example.com".to_owned(), date),
      ("b@example.com".to_owned(), date),
    ]);
  }

  #[tokio::test]
  async fn strict_policy_rejects_unknown_assignees() {
    let app = api_router(state().await.with_policy(AssignmentPolicy::strict()));
    let (status, body) = post(
      &app,
      "/loads/upsert",
      json!({
        "title": "x",
        "date": "2026-01-20",
        "assignees": [{"person": "ghost@example.com"}],
      }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "assignee not found: ghost@example.com");
  }

  #[tokio::test]
  async fn assignee_removal_errors() {
    let app = api_router(state().await);
    let (_, body) = post(
      &app,
      "/loads/upsert",
      json!({"title": "x", "date": "2026-01-20", "assignees": []}),
    )
    .await;
    let id = body["id"].as_i64().unwrap();

    let (status, _) = call(
      &app,
      Method::DELETE,
      &format!("/loads/{id}/assignees/nobody@example.com"),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
      &app,
      Method::DELETE,
      "/loads/9999/assignees/nobody@example.com",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn capacity_endpoints() {
    let app = api_router(state().await);
    post(
      &app,
      "/entities",
      json!({"id": "bob@example.com", "kind": "person", "title": "Bob"}),
    )
    .await;
    let date = in_days(10);

    let (status, _) = call(
      &app,
      Method::PUT,
      &format!("/entities/bob@example.com/capacity/overrides/{date}"),
      Some(json!({"capacity": 2.5})),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) =
      get(&app, &format!("/entities/bob@example.com/capacity/{date}")).await;
    assert_eq!(body["capacity"], 2.5);

    let (status, body) = get(&app, "/entities/bob@example.com/capacity").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overrides"].as_array().unwrap().len(), 1);

    let (status, _) = call(
      &app,
      Method::PUT,
      "/entities/bob@example.com/capacity",
      Some(json!({"default_capacity": 3.0, "overrides": [{"date": "bad", "capacity": 1}]})),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
      &app,
      Method::DELETE,
      &format!("/entities/bob@example.com/capacity/overrides/{date}"),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) =
      get(&app, &format!("/entities/bob@example.com/capacity/{date}")).await;
    assert_eq!(body["capacity"], 5.0);
  }

  #[tokio::test]
  async fn group_membership_endpoints() {
    let app = api_router(state().await);
    post(&app, "/entities", json!({"id": "eng", "kind": "group", "title": "Eng"}))
      .await;
    post(
      &app,
      "/entities",
      json!({"id": "carol@example.com", "kind": "person", "title": "Carol"}),
    )
    .await;

    let (status, _) = call(
      &app,
      Method::PUT,
      "/groups/eng/members/carol@example.com",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&app, "/groups/eng/members").await;
    assert_eq!(body, json!(["carol@example.com"]));

    let (_, body) = get(&app, "/entities/carol@example.com/groups").await;
    assert_eq!(body, json!(["eng"]));

    let (status, _) = call(
      &app,
      Method::PUT,
      "/groups/carol@example.com/members/eng",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn loads_range_listing() {
    let app = api_router(state().await);
    for (ext, date) in [("a", "2026-01-10"), ("b", "2026-01-20"), ("c", "2026-02-10")] {
      post(
        &app,
        "/loads/upsert",
        json!({"external_id": ext, "title": ext, "date": date}),
      )
      .await;
    }
    let (status, body) = get(&app, "/loads?start=2026-01-01&end=2026-01-31").await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = body
      .as_array()
      .unwrap()
      .iter()
      .map(|l| l["load"]["title"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(titles, ["a", "b"]);
  }
}
