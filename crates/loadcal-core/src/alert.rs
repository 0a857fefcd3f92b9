//! Overload detection for a single person and day.
//!
//! Delivery lives elsewhere; this module decides *whether* an alert is due
//! and what it says, and defines the [`AlertSink`] seam that mutation flows
//! report affected `(person, date)` pairs to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Result, aggregate::person_load_for_date, capacity::effective_capacity,
  store::LoadStore,
};

/// The JSON body posted to the alert webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadAlert {
  pub person:   String,
  pub date:     NaiveDate,
  pub load:     f64,
  pub capacity: f64,
  pub message:  String,
}

impl OverloadAlert {
  pub fn new(person: &str, date: NaiveDate, load: f64, capacity: f64) -> Self {
    Self {
      person: person.to_owned(),
      date,
      load,
      capacity,
      message: format!(
        "{person} is overloaded on {date} (load: {load:.1}, capacity: \
         {capacity:.1})"
      ),
    }
  }
}

/// Re-evaluate `person` on `date`. Returns an alert only when `date` is
/// strictly after `today` and the day's load exceeds effective capacity.
pub async fn check_overload<S: LoadStore>(
  store: &S,
  person: &str,
  date: NaiveDate,
  today: NaiveDate,
) -> Result<Option<OverloadAlert>> {
  if date <= today {
    return Ok(None);
  }
  let load = person_load_for_date(store, person, date).await?;
  let capacity = effective_capacity(store, person, date).await?;
  if load <= capacity {
    return Ok(None);
  }
  Ok(Some(OverloadAlert::new(person, date, load, capacity)))
}

/// Receives the people affected by a load mutation.
///
/// Implementations must return promptly; evaluation and delivery happen
/// off the caller's path and never report failure back.
pub trait AlertSink: Send + Sync {
  fn submit(&self, person: &str, date: NaiveDate);
}

/// A sink that ignores everything; used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardAlerts;

impl AlertSink for DiscardAlerts {
  fn submit(&self, _person: &str, _date: NaiveDate) {}
}
