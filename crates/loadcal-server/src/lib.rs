//! Server assembly for loadcal: configuration, sample data and the
//! top-level router.

pub mod seed;

use std::{path::PathBuf, time::Duration};

use axum::{Json, Router, routing::get};
use loadcal_alert::AlertConfig;
use loadcal_api::{ApiState, api_router};
use loadcal_core::{assign::AssignmentPolicy, store::LoadStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `loadcal.toml` and
/// `LOADCAL_*` environment variables. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                          String,
  pub port:                          u16,
  pub store_path:                    PathBuf,
  pub api_key:                       Option<String>,
  pub webhook_url:                   Option<String>,
  pub webhook_timeout_secs:          u64,
  pub alert_queue_capacity:          usize,
  pub alert_concurrency:             usize,
  pub shutdown_grace_secs:           u64,
  pub auto_create_missing_assignees: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                          "0.0.0.0".into(),
      port:                          8080,
      store_path:                    PathBuf::from("loadcal.db"),
      api_key:                       None,
      webhook_url:                   None,
      webhook_timeout_secs:          10,
      alert_queue_capacity:          1024,
      alert_concurrency:             8,
      shutdown_grace_secs:           5,
      auto_create_missing_assignees: true,
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path.into()).required(false))
      .add_source(config::Environment::with_prefix("LOADCAL"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn alert_config(&self) -> AlertConfig {
    AlertConfig {
      // An empty value from the environment means "off".
      webhook_url:    self.webhook_url.clone().filter(|u| !u.trim().is_empty()),
      timeout:        Duration::from_secs(self.webhook_timeout_secs),
      queue_capacity: self.alert_queue_capacity,
      concurrency:    self.alert_concurrency,
    }
  }

  pub fn policy(&self) -> AssignmentPolicy {
    AssignmentPolicy {
      auto_create_missing_assignees: self.auto_create_missing_assignees,
    }
  }

  pub fn shutdown_grace(&self) -> Duration {
    Duration::from_secs(self.shutdown_grace_secs)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: `/healthz` plus the API under `/api`.
pub fn app<S>(state: ApiState<S>) -> Router
where
  S: LoadStore + 'static,
{
  Router::new()
    .route("/healthz", get(healthz))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

async fn healthz() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use loadcal_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load("/nonexistent/loadcal.toml").unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.store_path, PathBuf::from("loadcal.db"));
    assert!(cfg.api_key.is_none());
    assert!(cfg.auto_create_missing_assignees);
    assert_eq!(cfg.shutdown_grace(), Duration::from_secs(5));
  }

  #[test]
  fn overrides_apply_over_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .set_override("port", 9090)
      .unwrap()
      .set_override("auto_create_missing_assignees", false)
      .unwrap()
      .set_override("webhook_url", "http://hooks.local/alerts")
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.address(), "0.0.0.0:9090");
    assert_eq!(cfg.policy(), AssignmentPolicy::strict());
    let alerts = cfg.alert_config();
    assert_eq!(alerts.webhook_url.as_deref(), Some("http://hooks.local/alerts"));
    assert_eq!(alerts.timeout, Duration::from_secs(10));
    assert_eq!(alerts.concurrency, 8);
  }

  #[test]
  fn blank_webhook_disables_alerts() {
    let cfg = ServerConfig {
      webhook_url: Some("  ".into()),
      ..ServerConfig::default()
    };
    assert!(cfg.alert_config().webhook_url.is_none());
  }

  #[tokio::test]
  async fn healthz_and_api_are_mounted() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let router = app(ApiState::new(store));

    let resp = router
      .clone()
      .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
      .oneshot(Request::get("/api/entities").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
