//! Loads and their per-person assignments.
//!
//! A load is a single-day unit of work. Each assignment ties a weight (in
//! "days" of effort) to one person on the load's date.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, entity::is_email};

/// Weight used when an assignment omits one or gives zero.
pub const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
  pub id:          i64,
  /// Key from the upstream system; upserts with the same key replace the
  /// load instead of duplicating it.
  pub external_id: Option<String>,
  pub title:       String,
  /// Name of the originating system.
  pub source:      Option<String>,
  /// Link back to the item in the originating system.
  pub url:         Option<String>,
  pub date:        NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAssignment {
  pub load_id: i64,
  pub person:  String,
  pub weight:  f64,
}

/// A load together with the assignments relevant to the query that produced
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadWithAssignments {
  pub load:        Load,
  pub assignments: Vec<LoadAssignment>,
}

impl LoadWithAssignments {
  pub fn total_weight(&self) -> f64 {
    self.assignments.iter().map(|a| a.weight).sum()
  }

  pub fn people(&self) -> impl Iterator<Item = &str> {
    self.assignments.iter().map(|a| a.person.as_str())
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Load fields accepted by an upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoad {
  pub external_id: Option<String>,
  pub title:       String,
  pub source:      Option<String>,
  pub url:         Option<String>,
  pub date:        NaiveDate,
}

impl NewLoad {
  pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
    Self {
      external_id: None,
      title: title.into(),
      source: None,
      url: None,
      date,
    }
  }

  pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
    self.external_id = Some(external_id.into());
    self
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.url = Some(url.into());
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation("load title must not be empty".into()));
    }
    if let Some(ext) = &self.external_id
      && ext.trim().is_empty()
    {
      return Err(Error::Validation("external_id must not be empty".into()));
    }
    Ok(())
  }
}

/// One requested assignment, before weight defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
  pub person: String,
  #[serde(default)]
  pub weight: Option<f64>,
}

impl Assignee {
  pub fn new(person: impl Into<String>, weight: f64) -> Self {
    Self { person: person.into(), weight: Some(weight) }
  }

  /// The weight to store: omitted or zero becomes [`DEFAULT_WEIGHT`].
  pub fn effective_weight(&self) -> Result<f64> {
    match self.weight {
      None => Ok(DEFAULT_WEIGHT),
      Some(w) if !w.is_finite() || w < 0.0 => Err(Error::InvalidWeight {
        person: self.person.clone(),
        weight: w,
      }),
      Some(w) if w == 0.0 => Ok(DEFAULT_WEIGHT),
      Some(w) => Ok(w),
    }
  }
}

/// A validated assignment ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentInput {
  pub person: String,
  pub weight: f64,
}

/// Check emails, weights and duplicates; returns normalised inputs in the
/// original order.
pub fn normalize_assignees(assignees: &[Assignee]) -> Result<Vec<AssignmentInput>> {
  let mut seen = HashSet::with_capacity(assignees.len());
  assignees
    .iter()
    .map(|a| {
      let person = a.person.trim();
      if !is_email(person) {
        return Err(Error::InvalidAssignee(a.person.clone()));
      }
      if !seen.insert(person.to_owned()) {
        return Err(Error::DuplicateAssignee(person.to_owned()));
      }
      Ok(AssignmentInput {
        person: person.to_owned(),
        weight: a.effective_weight()?,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn weight_defaults_when_omitted_or_zero() {
    let omitted = Assignee { person: "a@example.com".into(), weight: None };
    let zero = Assignee::new("a@example.com", 0.0);
    let half = Assignee::new("a@example.com", 0.5);
    assert_eq!(omitted.effective_weight().unwrap(), 1.0);
    assert_eq!(zero.effective_weight().unwrap(), 1.0);
    assert_eq!(half.effective_weight().unwrap(), 0.5);
  }

  #[test]
  fn negative_weight_is_rejected() {
    let a = Assignee::new("a@example.com", -2.0);
    assert!(matches!(a.effective_weight(), Err(Error::InvalidWeight { .. })));
  }

  #[test]
  fn normalize_rejects_duplicates() {
    let err = normalize_assignees(&[
      Assignee::new("a@example.com", 1.0),
      Assignee::new("b@example.com", 1.0),
      Assignee::new(" a@example.com", 2.0),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateAssignee(p) if p == "a@example.com"));
  }

  #[test]
  fn normalize_rejects_non_email() {
    let err = normalize_assignees(&[Assignee::new("bob", 1.0)]).unwrap_err();
    assert!(matches!(err, Error::InvalidAssignee(_)));
  }

  #[test]
  fn normalize_preserves_order() {
    let out = normalize_assignees(&[
      Assignee::new("b@example.com", 2.0),
      Assignee { person: "a@example.com".into(), weight: None },
    ])
    .unwrap();
    assert_eq!(out, vec![
      AssignmentInput { person: "b@example.com".into(), weight: 2.0 },
      AssignmentInput { person: "a@example.com".into(), weight: 1.0 },
    ]);
  }

  #[test]
  fn total_weight_sums_assignments() {
    let lwa = LoadWithAssignments {
      load:        Load {
        id:          1,
        external_id: None,
        title:       "Review".into(),
        source:      None,
        url:         None,
        date:        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
      },
      assignments: vec![
        LoadAssignment { load_id: 1, person: "a@example.com".into(), weight: 1.5 },
        LoadAssignment { load_id: 1, person: "b@example.com".into(), weight: 2.0 },
      ],
    };
    assert_eq!(lwa.total_weight(), 3.5);
  }
}
