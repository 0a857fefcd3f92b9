//! Entities: the people and groups that carry capacity and receive load.
//!
//! A person is keyed by email address; a group by an arbitrary slug. The kind
//! is fixed at creation. Groups do not receive assignments directly: their
//! load is the sum over whoever is a member at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// Daily capacity given to entities created without an explicit value,
/// including persons auto-created by an assignment.
pub const DEFAULT_CAPACITY: f64 = 5.0;

/// Whether an entity is an individual or a collection of individuals.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Person,
  Group,
}

/// A person or group as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
  pub id:               String,
  pub kind:             EntityKind,
  pub title:            String,
  pub default_capacity: f64,
  /// Secondary identifier used by the employee-id upsert path.
  pub employee_id:      Option<String>,
  pub created_at:       DateTime<Utc>,
}

impl Entity {
  /// Fail with [`Error::WrongEntityKind`] unless this entity is `expected`.
  pub fn expect_kind(&self, expected: EntityKind) -> Result<&Self> {
    if self.kind == expected {
      Ok(self)
    } else {
      Err(Error::wrong_kind(&self.id, expected, self.kind))
    }
  }
}

/// Input to [`crate::store::LoadStore::create_entity`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewEntity {
  pub id:               String,
  pub kind:             EntityKind,
  pub title:            String,
  #[serde(default)]
  pub default_capacity: Option<f64>,
  #[serde(default)]
  pub employee_id:      Option<String>,
}

impl NewEntity {
  /// The record auto-created for an unknown assignee email.
  pub fn person(email: &str) -> Self {
    Self {
      id:               email.to_owned(),
      kind:             EntityKind::Person,
      title:            email.to_owned(),
      default_capacity: Some(DEFAULT_CAPACITY),
      employee_id:      None,
    }
  }

  pub fn capacity(&self) -> f64 {
    self.default_capacity.unwrap_or(DEFAULT_CAPACITY)
  }

  pub fn validate(&self) -> Result<()> {
    if self.id.trim().is_empty() {
      return Err(Error::Validation("entity id must not be empty".into()));
    }
    if self.title.trim().is_empty() {
      return Err(Error::Validation("entity title must not be empty".into()));
    }
    if self.kind == EntityKind::Person && !is_email(&self.id) {
      return Err(Error::InvalidAssignee(self.id.clone()));
    }
    validate_capacity(self.capacity())
  }
}

/// A partial update; `None` leaves the field untouched. The kind cannot be
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntityPatch {
  pub title:            Option<String>,
  pub employee_id:      Option<String>,
  pub default_capacity: Option<f64>,
}

impl EntityPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(title) = &self.title
      && title.trim().is_empty()
    {
      return Err(Error::Validation("entity title must not be empty".into()));
    }
    self.default_capacity.map(validate_capacity).transpose()?;
    Ok(())
  }
}

/// Capacities must be finite and non-negative.
pub fn validate_capacity(capacity: f64) -> Result<()> {
  if !capacity.is_finite() || capacity < 0.0 {
    return Err(Error::NegativeCapacity(capacity));
  }
  Ok(())
}

/// A deliberately loose shape check: one `@` with something on either side
/// and a dot in the domain.
pub fn is_email(s: &str) -> bool {
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
    }
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn kind_string_forms_agree() {
    assert_eq!(<&str>::from(EntityKind::Person), "person");
    assert_eq!(EntityKind::Group.to_string(), "group");
    assert_eq!(EntityKind::from_str("group").unwrap(), EntityKind::Group);
    assert_eq!(
      serde_json::to_string(&EntityKind::Person).unwrap(),
      "\"person\""
    );
  }

  #[test]
  fn email_shape() {
    assert!(is_email("alice@example.com"));
    assert!(!is_email("alice"));
    assert!(!is_email("@example.com"));
    assert!(!is_email("alice@localhost"));
    assert!(!is_email("a@b@example.com"));
    assert!(!is_email("al ice@example.com"));
  }

  #[test]
  fn new_entity_defaults_capacity() {
    let e = NewEntity {
      id:               "eng".into(),
      kind:             EntityKind::Group,
      title:            "Engineering".into(),
      default_capacity: None,
      employee_id:      None,
    };
    assert_eq!(e.capacity(), DEFAULT_CAPACITY);
    assert!(e.validate().is_ok());
  }

  #[test]
  fn new_entity_allows_zero_capacity() {
    let mut e = NewEntity::person("zero@example.com");
    e.default_capacity = Some(0.0);
    assert!(e.validate().is_ok());
  }

  #[test]
  fn new_entity_rejects_negative_capacity() {
    let mut e = NewEntity::person("neg@example.com");
    e.default_capacity = Some(-1.0);
    assert!(matches!(e.validate(), Err(Error::NegativeCapacity(_))));
  }

  #[test]
  fn person_ids_must_be_emails() {
    let mut e = NewEntity::person("bob@example.com");
    e.id = "bob".into();
    assert!(matches!(e.validate(), Err(Error::InvalidAssignee(_))));
  }

  #[test]
  fn patch_validation() {
    let ok = EntityPatch {
      default_capacity: Some(3.5),
      ..Default::default()
    };
    assert!(ok.validate().is_ok());

    let blank = EntityPatch {
      title: Some("  ".into()),
      ..Default::default()
    };
    assert!(matches!(blank.validate(), Err(Error::Validation(_))));

    let negative = EntityPatch {
      default_capacity: Some(-1.0),
      ..Default::default()
    };
    assert!(matches!(negative.validate(), Err(Error::NegativeCapacity(_))));
  }

  #[test]
  fn expect_kind_reports_mismatch() {
    let group = Entity {
      id:               "eng".into(),
      kind:             EntityKind::Group,
      title:            "Engineering".into(),
      default_capacity: 10.0,
      employee_id:      None,
      created_at:       Utc::now(),
    };
    assert!(group.expect_kind(EntityKind::Group).is_ok());
    assert!(matches!(
      group.expect_kind(EntityKind::Person),
      Err(Error::WrongEntityKind { expected: EntityKind::Person, .. })
    ));
  }
}
