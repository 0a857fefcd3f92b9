//! Load mutations: upserts, assignee changes and deletes.
//!
//! Every mutation that adds or reweights an assignment reports the affected
//! people to an [`AlertSink`] once the write has committed.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::{
  Error, Result,
  alert::AlertSink,
  calendar::DateRange,
  entity::{EntityKind, NewEntity},
  load::{
    Assignee, AssignmentInput, LoadWithAssignments, NewLoad,
    normalize_assignees,
  },
  store::LoadStore,
};

/// What to do when an assignment names a person who does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AssignmentPolicy {
  /// Create the person with the default capacity, or reject the request.
  pub auto_create_missing_assignees: bool,
}

impl Default for AssignmentPolicy {
  fn default() -> Self { Self { auto_create_missing_assignees: true } }
}

impl AssignmentPolicy {
  pub fn strict() -> Self { Self { auto_create_missing_assignees: false } }
}

/// An assignee referenced by employee id instead of email.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmployeeAssignee {
  pub employee_id: String,
  #[serde(default)]
  pub weight:      Option<f64>,
}

/// Check every assignee against the directory. Returns the persons that
/// must be created alongside the write.
async fn resolve_assignees<S: LoadStore>(
  store: &S,
  policy: AssignmentPolicy,
  inputs: &[AssignmentInput],
) -> Result<Vec<NewEntity>> {
  let mut create = Vec::new();
  for input in inputs {
    let existing = store
      .get_entity(&input.person)
      .await
      .map_err(Error::store_op(format!("looking up assignee {}", input.person)))?;
    match existing {
      Some(entity) => {
        entity.expect_kind(EntityKind::Person)?;
      }
      None if policy.auto_create_missing_assignees => {
        create.push(NewEntity::person(&input.person));
      }
      None => return Err(Error::UnknownAssignee(input.person.clone())),
    }
  }
  Ok(create)
}

fn notify(alerts: &dyn AlertSink, inputs: &[AssignmentInput], date: NaiveDate) {
  for input in inputs {
    alerts.submit(&input.person, date);
  }
}

/// Insert a load, or replace the one sharing its `external_id`, together
/// with its full assignment set. Returns the load id.
pub async fn upsert_load<S: LoadStore>(
  store: &S,
  policy: AssignmentPolicy,
  load: NewLoad,
  assignees: &[Assignee],
  alerts: &dyn AlertSink,
) -> Result<i64> {
  load.validate()?;
  let inputs = normalize_assignees(assignees)?;
  let create = resolve_assignees(store, policy, &inputs).await?;
  write_upsert(store, load, inputs, create, alerts).await
}

/// [`upsert_load`] with assignees named by employee id. Every employee must
/// already exist as a person; nothing is auto-created on this path.
pub async fn upsert_load_by_employee_id<S: LoadStore>(
  store: &S,
  load: NewLoad,
  assignees: &[EmployeeAssignee],
  alerts: &dyn AlertSink,
) -> Result<i64> {
  load.validate()?;

  let mut resolved = Vec::with_capacity(assignees.len());
  for a in assignees {
    let employee_id = a.employee_id.trim();
    let entity = store
      .find_by_employee_id(employee_id)
      .await
      .map_err(Error::store_op(format!("looking up employee {employee_id}")))?
      .ok_or_else(|| Error::UnknownAssignee(employee_id.to_owned()))?;
    entity.expect_kind(EntityKind::Person)?;
    resolved.push(Assignee { person: entity.id, weight: a.weight });
  }

  let inputs = normalize_assignees(&resolved)?;
  write_upsert(store, load, inputs, Vec::new(), alerts).await
}

async fn write_upsert<S: LoadStore>(
  store: &S,
  load: NewLoad,
  inputs: Vec<AssignmentInput>,
  create: Vec<NewEntity>,
  alerts: &dyn AlertSink,
) -> Result<i64> {
  let date = load.date;
  let key = load.external_id.clone().unwrap_or_else(|| load.title.clone());
  let created = create.len();

  let id = store
    .upsert_load(load, inputs.clone(), create)
    .await
    .map_err(Error::store_op(format!("upserting load {key}")))?;

  info!(
    load_id = id,
    %date,
    assignees = inputs.len(),
    created_people = created,
    "load upserted"
  );
  notify(alerts, &inputs, date);
  Ok(id)
}

/// Add people to an existing load. A person already on the load has their
/// weight replaced.
pub async fn add_assignees<S: LoadStore>(
  store: &S,
  policy: AssignmentPolicy,
  load_id: i64,
  assignees: &[Assignee],
  alerts: &dyn AlertSink,
) -> Result<()> {
  if assignees.is_empty() {
    return Err(Error::Validation("at least one assignee is required".into()));
  }
  let inputs = normalize_assignees(assignees)?;
  let load = get_load(store, load_id).await?.load;
  let create = resolve_assignees(store, policy, &inputs).await?;

  let found = store
    .add_assignments(load_id, inputs.clone(), create)
    .await
    .map_err(Error::store_op(format!("adding assignees to load {load_id}")))?;
  if !found {
    return Err(Error::LoadNotFound(load_id));
  }

  info!(load_id, added = inputs.len(), "assignees added");
  notify(alerts, &inputs, load.date);
  Ok(())
}

pub async fn remove_assignee<S: LoadStore>(
  store: &S,
  load_id: i64,
  person: &str,
) -> Result<()> {
  get_load(store, load_id).await?;
  let removed = store
    .remove_assignment(load_id, person)
    .await
    .map_err(Error::store_op(format!(
      "removing {person} from load {load_id}"
    )))?;
  if !removed {
    return Err(Error::AssignmentNotFound {
      load_id,
      person: person.to_owned(),
    });
  }
  info!(load_id, %person, "assignee removed");
  Ok(())
}

pub async fn get_load<S: LoadStore>(
  store: &S,
  load_id: i64,
) -> Result<LoadWithAssignments> {
  store
    .get_load(load_id)
    .await
    .map_err(Error::store_op(format!("reading load {load_id}")))?
    .ok_or(Error::LoadNotFound(load_id))
}

pub async fn loads_in_range<S: LoadStore>(
  store: &S,
  range: DateRange,
) -> Result<Vec<LoadWithAssignments>> {
  store
    .loads_in_range(range)
    .await
    .map_err(Error::store_op(format!(
      "listing loads in {}..={}",
      range.start(),
      range.end()
    )))
}

pub async fn delete_load<S: LoadStore>(store: &S, load_id: i64) -> Result<()> {
  let deleted = store
    .delete_load(load_id)
    .await
    .map_err(Error::store_op(format!("deleting load {load_id}")))?;
  if !deleted {
    return Err(Error::LoadNotFound(load_id));
  }
  info!(load_id, "load deleted");
  Ok(())
}
