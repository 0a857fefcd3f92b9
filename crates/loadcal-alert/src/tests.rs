//! Dispatcher tests against a throwaway local webhook receiver.

use std::{
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::{Duration, Instant},
};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use chrono::{Days, NaiveDate};
use loadcal_core::{
  alert::AlertSink,
  assign::{AssignmentPolicy, upsert_load},
  calendar::today_utc,
  directory::create_entity,
  entity::NewEntity,
  load::{Assignee, NewLoad},
};
use loadcal_store_sqlite::SqliteStore;
use serde_json::Value;
use tokio::{net::TcpListener, sync::Mutex};

use crate::{AlertConfig, OverloadDispatcher};

type Seen = Arc<Mutex<Vec<Value>>>;

const GRACE: Duration = Duration::from_secs(5);

async fn record(State(seen): State<Seen>, Json(body): Json<Value>) -> StatusCode {
  seen.lock().await.push(body);
  StatusCode::OK
}

async fn reject(Json(_): Json<Value>) -> StatusCode {
  StatusCode::INTERNAL_SERVER_ERROR
}

/// Counts the request, then answers long after any sane client timeout.
async fn stall(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
  hits.fetch_add(1, Ordering::SeqCst);
  tokio::time::sleep(Duration::from_secs(1)).await;
  StatusCode::OK
}

/// Serve `app` on an ephemeral port and return the webhook URL.
async fn serve(app: Router) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  format!("http://{addr}/hook")
}

async fn receiver() -> (String, Seen) {
  let seen = Seen::default();
  let app = Router::new()
    .route("/hook", post(record))
    .with_state(seen.clone());
  (serve(app).await, seen)
}

fn days_from_today(n: u64) -> NaiveDate {
  today_utc().checked_add_days(Days::new(n)).unwrap()
}

/// A store with alice (capacity 2.0) carrying `weight` on `date`.
async fn store_with_load(date: NaiveDate, weight: f64) -> Arc<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let mut alice = NewEntity::person("alice@example.com");
  alice.default_capacity = Some(2.0);
  create_entity(&store, alice).await.unwrap();
  upsert_load(
    &store,
    AssignmentPolicy::default(),
    NewLoad::new("work", date).with_external_id("work"),
    &[Assignee::new("alice@example.com", weight)],
    &loadcal_core::alert::DiscardAlerts,
  )
  .await
  .unwrap();
  Arc::new(store)
}

fn config(url: &str) -> AlertConfig {
  AlertConfig {
    webhook_url: Some(url.to_owned()),
    timeout: Duration::from_secs(2),
    ..Default::default()
  }
}

#[tokio::test]
async fn future_overload_is_posted_once() {
  let (url, seen) = receiver().await;
  let date = days_from_today(7);
  let store = store_with_load(date, 3.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, config(&url)).unwrap();
  dispatcher.submit("alice@example.com", date);
  dispatcher.shutdown(GRACE).await;

  let seen = seen.lock().await;
  assert_eq!(seen.len(), 1);
  let body = &seen[0];
  assert_eq!(body["person"], "alice@example.com");
  assert_eq!(body["date"], date.to_string());
  assert_eq!(body["load"], 3.0);
  assert_eq!(body["capacity"], 2.0);
  assert_eq!(
    body["message"],
    format!("alice@example.com is overloaded on {date} (load: 3.0, capacity: 2.0)")
  );
}

#[tokio::test]
async fn repeated_submissions_are_not_deduplicated() {
  let (url, seen) = receiver().await;
  let date = days_from_today(3);
  let store = store_with_load(date, 3.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, config(&url)).unwrap();
  dispatcher.submit("alice@example.com", date);
  dispatcher.submit("alice@example.com", date);
  dispatcher.shutdown(GRACE).await;

  assert_eq!(seen.lock().await.len(), 2);
}

#[tokio::test]
async fn within_capacity_is_silent() {
  let (url, seen) = receiver().await;
  let date = days_from_today(7);
  let store = store_with_load(date, 2.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, config(&url)).unwrap();
  dispatcher.submit("alice@example.com", date);
  dispatcher.shutdown(GRACE).await;

  assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn today_and_past_are_silent() {
  let (url, seen) = receiver().await;
  let today = today_utc();
  let store = store_with_load(today, 9.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, config(&url)).unwrap();
  dispatcher.submit("alice@example.com", today);
  dispatcher.submit(
    "alice@example.com",
    today.checked_sub_days(Days::new(1)).unwrap(),
  );
  dispatcher.shutdown(GRACE).await;

  assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn no_webhook_means_disabled() {
  let date = days_from_today(7);
  let store = store_with_load(date, 3.0).await;

  let dispatcher =
    OverloadDispatcher::spawn(store, AlertConfig::default()).unwrap();
  assert!(!dispatcher.is_enabled());
  dispatcher.submit("alice@example.com", date);
  dispatcher.shutdown(GRACE).await;
}

#[tokio::test]
async fn delivery_failures_are_swallowed() {
  let url = serve(Router::new().route("/hook", post(reject))).await;
  let date = days_from_today(7);
  let store = store_with_load(date, 3.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, config(&url)).unwrap();
  dispatcher.submit("alice@example.com", date);
  dispatcher.shutdown(GRACE).await;
}

#[tokio::test]
async fn slow_webhook_times_out_without_retry() {
  let hits = Arc::new(AtomicUsize::new(0));
  let url = serve(
    Router::new()
      .route("/hook", post(stall))
      .with_state(hits.clone()),
  )
  .await;
  let date = days_from_today(7);
  let store = store_with_load(date, 3.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, AlertConfig {
    timeout: Duration::from_millis(50),
    ..config(&url)
  })
  .unwrap();
  let started = Instant::now();
  dispatcher.submit("alice@example.com", date);
  dispatcher.shutdown(GRACE).await;
  assert!(started.elapsed() < Duration::from_millis(800));

  tokio::time::sleep(Duration::from_millis(200)).await;
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_webhook_is_swallowed() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let date = days_from_today(7);
  let store = store_with_load(date, 3.0).await;
  let dispatcher =
    OverloadDispatcher::spawn(store, config(&format!("http://{addr}/hook")))
      .unwrap();
  dispatcher.submit("alice@example.com", date);
  dispatcher.shutdown(GRACE).await;
}

#[tokio::test]
async fn unknown_person_is_logged_not_posted() {
  let (url, seen) = receiver().await;
  let date = days_from_today(7);
  let store = store_with_load(date, 3.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, config(&url)).unwrap();
  dispatcher.submit("ghost@example.com", date);
  dispatcher.shutdown(GRACE).await;

  assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn submissions_after_shutdown_are_ignored() {
  let (url, seen) = receiver().await;
  let date = days_from_today(7);
  let store = store_with_load(date, 3.0).await;

  let dispatcher = OverloadDispatcher::spawn(store, config(&url)).unwrap();
  dispatcher.shutdown(GRACE).await;
  dispatcher.submit("alice@example.com", date);
  tokio::time::sleep(Duration::from_millis(50)).await;

  assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let result = OverloadDispatcher::spawn(store, AlertConfig {
    webhook_url: Some("http://127.0.0.1:9/hook".into()),
    concurrency: 0,
    ..Default::default()
  });
  assert!(matches!(result, Err(crate::Error::ZeroConcurrency)));
}
