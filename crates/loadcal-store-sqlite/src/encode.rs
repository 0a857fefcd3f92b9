//! Encoding and decoding between domain types and the plain values stored in
//! SQLite columns.
//!
//! Calendar days are stored as `YYYY-MM-DD`; timestamps as RFC 3339.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use loadcal_core::{
  calendar::DATE_FORMAT,
  capacity::CapacityOverride,
  entity::{Entity, EntityKind},
  load::{Load, LoadAssignment, LoadWithAssignments},
};

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| Error::Decode {
    column: "date",
    value:  s.to_owned(),
  })
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| Error::Decode {
      column: "created_at",
      value:  s.to_owned(),
    })
}

// ─── EntityKind ──────────────────────────────────────────────────────────────

pub fn encode_kind(kind: EntityKind) -> &'static str { kind.into() }

pub fn decode_kind(s: &str) -> Result<EntityKind> {
  EntityKind::from_str(s).map_err(|_| Error::Decode {
    column: "kind",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ENTITY_COLUMNS: &str =
  "id, kind, title, default_capacity, employee_id, created_at";

/// Raw values read directly from an `entities` row selected with
/// [`ENTITY_COLUMNS`].
pub struct RawEntity {
  pub id:               String,
  pub kind:             String,
  pub title:            String,
  pub default_capacity: f64,
  pub employee_id:      Option<String>,
  pub created_at:       String,
}

impl RawEntity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      kind:             row.get(1)?,
      title:            row.get(2)?,
      default_capacity: row.get(3)?,
      employee_id:      row.get(4)?,
      created_at:       row.get(5)?,
    })
  }

  pub fn into_entity(self) -> Result<Entity> {
    Ok(Entity {
      kind:             decode_kind(&self.kind)?,
      created_at:       decode_dt(&self.created_at)?,
      id:               self.id,
      title:            self.title,
      default_capacity: self.default_capacity,
      employee_id:      self.employee_id,
    })
  }
}

pub struct RawOverride {
  pub entity_id: String,
  pub date:      String,
  pub capacity:  f64,
}

impl RawOverride {
  pub fn into_override(self) -> Result<CapacityOverride> {
    Ok(CapacityOverride {
      date:      decode_date(&self.date)?,
      entity_id: self.entity_id,
      capacity:  self.capacity,
    })
  }
}

pub const LOAD_COLUMNS: &str = "l.id, l.external_id, l.title, l.source, l.url, \
                                l.date, la.person_id, la.weight";

/// One load joined with at most one of its assignments, selected with
/// [`LOAD_COLUMNS`]. The assignment columns are `NULL` for a load without
/// assignments under a `LEFT JOIN`.
pub struct RawLoadRow {
  pub id:          i64,
  pub external_id: Option<String>,
  pub title:       String,
  pub source:      Option<String>,
  pub url:         Option<String>,
  pub date:        String,
  pub person:      Option<String>,
  pub weight:      Option<f64>,
}

impl RawLoadRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      external_id: row.get(1)?,
      title:       row.get(2)?,
      source:      row.get(3)?,
      url:         row.get(4)?,
      date:        row.get(5)?,
      person:      row.get(6)?,
      weight:      row.get(7)?,
    })
  }
}

/// Fold rows ordered by load id into one [`LoadWithAssignments`] per load.
pub fn collect_loads(rows: Vec<RawLoadRow>) -> Result<Vec<LoadWithAssignments>> {
  let mut out: Vec<LoadWithAssignments> = Vec::new();
  for row in rows {
    let assignment = match (row.person, row.weight) {
      (Some(person), Some(weight)) => Some(LoadAssignment {
        load_id: row.id,
        person,
        weight,
      }),
      _ => None,
    };

    match out.last_mut() {
      Some(last) if last.load.id == row.id => {
        last.assignments.extend(assignment);
      }
      _ => out.push(LoadWithAssignments {
        load:        Load {
          id:          row.id,
          external_id: row.external_id,
          title:       row.title,
          source:      row.source,
          url:         row.url,
          date:        decode_date(&row.date)?,
        },
        assignments: assignment.into_iter().collect(),
      }),
    }
  }
  Ok(out)
}

/// Decode `(date, total)` rows from a per-day aggregation.
pub fn decode_day_totals(rows: Vec<(String, f64)>) -> Result<Vec<(NaiveDate, f64)>> {
  rows
    .into_iter()
    .map(|(date, total)| Ok((decode_date(&date)?, total)))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(id: i64, person: Option<&str>) -> RawLoadRow {
    RawLoadRow {
      id,
      external_id: None,
      title: format!("load {id}"),
      source: None,
      url: None,
      date: "2026-01-20".into(),
      person: person.map(str::to_owned),
      weight: person.map(|_| 1.0),
    }
  }

  #[test]
  fn collect_loads_groups_consecutive_rows() {
    let loads = collect_loads(vec![
      row(1, Some("a@example.com")),
      row(1, Some("b@example.com")),
      row(2, None),
      row(3, Some("a@example.com")),
    ])
    .unwrap();
    assert_eq!(loads.len(), 3);
    assert_eq!(loads[0].assignments.len(), 2);
    assert!(loads[1].assignments.is_empty());
    assert_eq!(loads[2].assignments[0].person, "a@example.com");
  }

  #[test]
  fn bad_stored_date_is_reported() {
    let mut bad = row(1, None);
    bad.date = "yesterday".into();
    assert!(matches!(
      collect_loads(vec![bad]),
      Err(Error::Decode { column: "date", .. })
    ));
  }

  #[test]
  fn kind_round_trips_through_text() {
    for kind in [EntityKind::Person, EntityKind::Group] {
      assert_eq!(decode_kind(encode_kind(kind)).unwrap(), kind);
    }
    assert!(decode_kind("team").is_err());
  }
}
