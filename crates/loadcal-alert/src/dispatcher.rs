//! The queue, worker and delivery path behind [`OverloadDispatcher`].

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use loadcal_core::{
  alert::{AlertSink, check_overload},
  calendar::today_utc,
  store::LoadStore,
};
use tokio::{
  sync::{Mutex, Notify, Semaphore, mpsc, mpsc::error::TrySendError},
  task::{JoinHandle, JoinSet},
};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct AlertConfig {
  /// Destination for alert POSTs. `None` disables alerting entirely.
  pub webhook_url:    Option<String>,
  /// Bound on each webhook request, connect through response.
  pub timeout:        Duration,
  /// Pending checks held before new submissions are dropped.
  pub queue_capacity: usize,
  /// Checks and deliveries in flight at once.
  pub concurrency:    usize,
}

impl Default for AlertConfig {
  fn default() -> Self {
    Self {
      webhook_url:    None,
      timeout:        Duration::from_secs(10),
      queue_capacity: 1024,
      concurrency:    8,
    }
  }
}

#[derive(Debug)]
struct AlertJob {
  person: String,
  date:   NaiveDate,
}

/// Evaluates and delivers overload alerts off the request path.
///
/// Submissions go onto a bounded queue; a single worker task drains it and
/// runs each check on its own task, at most `concurrency` at a time. When the
/// queue is full the submission is dropped with a warning.
pub struct OverloadDispatcher {
  tx:     Option<mpsc::Sender<AlertJob>>,
  stop:   Arc<Notify>,
  worker: Mutex<Option<JoinHandle<()>>>,
}

impl OverloadDispatcher {
  /// A dispatcher that accepts and ignores every submission.
  pub fn disabled() -> Self {
    Self {
      tx:     None,
      stop:   Arc::new(Notify::new()),
      worker: Mutex::new(None),
    }
  }

  /// Start the worker. Returns a disabled dispatcher when no webhook URL is
  /// configured.
  pub fn spawn<S>(store: Arc<S>, config: AlertConfig) -> Result<Self>
  where
    S: LoadStore + 'static,
  {
    let Some(url) = config.webhook_url else {
      info!("no webhook configured; overload alerts disabled");
      return Ok(Self::disabled());
    };
    if config.concurrency == 0 {
      return Err(Error::ZeroConcurrency);
    }
    if config.queue_capacity == 0 {
      return Err(Error::ZeroQueue);
    }

    let client = reqwest::Client::builder().timeout(config.timeout).build()?;
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let stop = Arc::new(Notify::new());

    let worker = Worker {
      store,
      client,
      url: Arc::from(url.as_str()),
      permits: Arc::new(Semaphore::new(config.concurrency)),
    };
    let handle = tokio::spawn(worker.run(rx, stop.clone()));

    info!(
      %url,
      concurrency = config.concurrency,
      queue = config.queue_capacity,
      "overload alerts enabled"
    );
    Ok(Self {
      tx: Some(tx),
      stop,
      worker: Mutex::new(Some(handle)),
    })
  }

  pub fn is_enabled(&self) -> bool { self.tx.is_some() }

  /// Stop accepting work, let queued and in-flight alerts finish for up to
  /// `grace`, then abort whatever is left.
  pub async fn shutdown(&self, grace: Duration) {
    let Some(mut handle) = self.worker.lock().await.take() else {
      return;
    };
    self.stop.notify_one();

    match tokio::time::timeout(grace, &mut handle).await {
      Ok(_) => info!("overload alerts drained"),
      Err(_) => {
        warn!(?grace, "alert drain timed out; aborting pending deliveries");
        handle.abort();
      }
    }
  }
}

impl AlertSink for OverloadDispatcher {
  fn submit(&self, person: &str, date: NaiveDate) {
    let Some(tx) = &self.tx else { return };
    let job = AlertJob { person: person.to_owned(), date };
    match tx.try_send(job) {
      Ok(()) => {}
      Err(TrySendError::Full(job)) => {
        warn!(person = %job.person, date = %job.date, "alert queue full; dropping");
      }
      Err(TrySendError::Closed(job)) => {
        debug!(person = %job.person, date = %job.date, "alert queue closed");
      }
    }
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

struct Worker<S> {
  store:   Arc<S>,
  client:  reqwest::Client,
  url:     Arc<str>,
  permits: Arc<Semaphore>,
}

impl<S: LoadStore + 'static> Worker<S> {
  async fn run(self, mut rx: mpsc::Receiver<AlertJob>, stop: Arc<Notify>) {
    let mut tasks = JoinSet::new();
    loop {
      tokio::select! {
        job = rx.recv() => {
          let Some(job) = job else { break };
          let Ok(permit) = self.permits.clone().acquire_owned().await else {
            break;
          };
          let store = self.store.clone();
          let client = self.client.clone();
          let url = self.url.clone();
          tasks.spawn(async move {
            let _permit = permit;
            evaluate(&*store, &client, &url, job).await;
          });
          while tasks.try_join_next().is_some() {}
        }
        () = stop.notified() => {
          // Buffered jobs are still received after close.
          rx.close();
        }
      }
    }
    while tasks.join_next().await.is_some() {}
  }
}

async fn evaluate<S: LoadStore>(
  store: &S,
  client: &reqwest::Client,
  url: &str,
  job: AlertJob,
) {
  let AlertJob { person, date } = job;
  let alert = match check_overload(store, &person, date, today_utc()).await {
    Ok(Some(alert)) => alert,
    Ok(None) => {
      debug!(%person, %date, "no overload");
      return;
    }
    Err(e) => {
      warn!(%person, %date, error = %e, "overload check failed");
      return;
    }
  };

  let result = client
    .post(url)
    .json(&alert)
    .send()
    .await
    .and_then(reqwest::Response::error_for_status);
  match result {
    Ok(resp) => info!(
      %person,
      %date,
      load = alert.load,
      capacity = alert.capacity,
      status = %resp.status(),
      "overload alert delivered"
    ),
    Err(e) => warn!(%person, %date, error = %e, "overload alert delivery failed"),
  }
}
