//! Sample data for an empty store: three people, two teams and a month of
//! loads starting tomorrow, with a few days pushed over capacity.

use chrono::{Days, NaiveDate};
use loadcal_core::{
  Error, Result,
  alert::DiscardAlerts,
  assign::{self, AssignmentPolicy},
  directory,
  entity::{EntityKind, NewEntity},
  load::{Assignee, NewLoad},
  store::LoadStore,
};
use tracing::info;

const PEOPLE: &[(&str, &str, &str, f64)] = &[
  ("alice@example.com", "Alice", "E001", 5.0),
  ("bob@example.com", "Bob", "E002", 6.0),
  ("charlie@example.com", "Charlie", "E003", 4.0),
];

const GROUPS: &[(&str, &str, &[&str])] = &[
  ("engineering", "Engineering", &["alice@example.com", "bob@example.com"]),
  ("design", "Design", &["charlie@example.com"]),
];

const GROUP_CAPACITY: f64 = 10.0;

/// (days from today, title, assignees with weights)
type SeedLoad = (u64, &'static str, &'static [(&'static str, f64)]);

const LOADS: &[SeedLoad] = &[
  (1, "Sprint planning", &[("alice@example.com", 2.0), ("bob@example.com", 2.0)]),
  (2, "API review", &[("alice@example.com", 3.0)]),
  (3, "Release prep", &[("alice@example.com", 4.0), ("bob@example.com", 3.0)]),
  (3, "Hotfix", &[("alice@example.com", 2.0)]),
  (5, "Design critique", &[("charlie@example.com", 3.0)]),
  (6, "Onboarding", &[("bob@example.com", 1.0)]),
  (8, "Incident review", &[
    ("alice@example.com", 1.0),
    ("bob@example.com", 1.0),
    ("charlie@example.com", 1.0),
  ]),
  (10, "Quarterly roadmap", &[
    ("alice@example.com", 3.0),
    ("charlie@example.com", 2.0),
  ]),
  (12, "Database migration", &[("bob@example.com", 7.0)]),
  (14, "User research", &[("charlie@example.com", 5.0)]),
  (15, "Code freeze", &[("alice@example.com", 2.0), ("bob@example.com", 2.0)]),
  (17, "Brand refresh", &[("charlie@example.com", 2.0)]),
  (19, "Performance tuning", &[("bob@example.com", 4.0)]),
  (21, "Security audit", &[("alice@example.com", 5.0)]),
  (23, "Retrospective", &[
    ("alice@example.com", 1.0),
    ("bob@example.com", 1.0),
    ("charlie@example.com", 1.0),
  ]),
  (26, "Launch", &[
    ("alice@example.com", 3.0),
    ("bob@example.com", 3.0),
    ("charlie@example.com", 3.0),
  ]),
  (30, "Planning offsite", &[
    ("alice@example.com", 2.0),
    ("bob@example.com", 2.0),
    ("charlie@example.com", 2.0),
  ]),
];

/// Populate the store relative to `today` unless it already holds any
/// entity. Returns whether anything was written.
pub async fn seed_if_empty<S: LoadStore>(
  store: &S,
  today: NaiveDate,
) -> Result<bool> {
  let count = store
    .count_entities()
    .await
    .map_err(Error::store_op("counting entities"))?;
  if count > 0 {
    info!(count, "store not empty; skipping seed");
    return Ok(false);
  }

  for &(id, title, employee_id, capacity) in PEOPLE {
    directory::create_entity(store, NewEntity {
      id:               id.into(),
      kind:             EntityKind::Person,
      title:            title.into(),
      default_capacity: Some(capacity),
      employee_id:      Some(employee_id.into()),
    })
    .await?;
  }

  for &(id, title, members) in GROUPS {
    directory::create_entity(store, NewEntity {
      id:               id.into(),
      kind:             EntityKind::Group,
      title:            title.into(),
      default_capacity: Some(GROUP_CAPACITY),
      employee_id:      None,
    })
    .await?;
    for person in members {
      directory::add_member(store, id, person).await?;
    }
  }

  for (n, &(offset, title, people)) in LOADS.iter().enumerate() {
    let date = today
      .checked_add_days(Days::new(offset))
      .ok_or_else(|| Error::Validation(format!("seed date out of range: +{offset}")))?;
    let load = NewLoad::new(title, date)
      .with_external_id(format!("seed-{}", n + 1))
      .with_source("seed");
    let assignees: Vec<Assignee> = people
      .iter()
      .map(|&(person, weight)| Assignee::new(person, weight))
      .collect();
    assign::upsert_load(
      store,
      AssignmentPolicy::default(),
      load,
      &assignees,
      &DiscardAlerts,
    )
    .await?;
  }

  info!(
    people = PEOPLE.len(),
    groups = GROUPS.len(),
    loads = LOADS.len(),
    "seeded sample data"
  );
  Ok(true)
}
