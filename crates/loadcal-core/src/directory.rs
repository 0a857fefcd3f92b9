//! Entity and group-membership operations.

use tracing::info;

use crate::{
  Error, Result,
  entity::{Entity, EntityKind, EntityPatch, NewEntity},
  store::{EntityConflict, LoadStore},
};

/// Resolve an entity, failing with [`Error::EntityNotFound`] if absent.
pub async fn get_entity<S: LoadStore>(store: &S, id: &str) -> Result<Entity> {
  store
    .get_entity(id)
    .await
    .map_err(Error::store_op(format!("looking up entity {id}")))?
    .ok_or_else(|| Error::EntityNotFound(id.to_owned()))
}

/// Resolve an entity and require it to be of `kind`.
pub async fn get_entity_of_kind<S: LoadStore>(
  store: &S,
  id: &str,
  kind: EntityKind,
) -> Result<Entity> {
  let entity = get_entity(store, id).await?;
  entity.expect_kind(kind)?;
  Ok(entity)
}

/// Turn a refused write into the matching domain error.
fn conflict_error(
  conflict: EntityConflict,
  id: &str,
  employee_id: Option<&str>,
) -> Error {
  match conflict {
    EntityConflict::Id => Error::EntityExists(id.to_owned()),
    EntityConflict::EmployeeId => {
      Error::EmployeeIdTaken(employee_id.unwrap_or_default().to_owned())
    }
  }
}

pub async fn list_entities<S: LoadStore>(
  store: &S,
  kind: Option<EntityKind>,
) -> Result<Vec<Entity>> {
  store
    .list_entities(kind)
    .await
    .map_err(Error::store_op("listing entities"))
}

/// Create an entity. Id and employee-id uniqueness are enforced by the
/// store in the same write, so concurrent creates cannot both succeed.
pub async fn create_entity<S: LoadStore>(
  store: &S,
  input: NewEntity,
) -> Result<Entity> {
  input.validate()?;

  let id = input.id.clone();
  let employee_id = input.employee_id.clone();
  let entity = store
    .create_entity(input)
    .await
    .map_err(Error::store_op(format!("creating entity {id}")))?
    .map_err(|c| conflict_error(c, &id, employee_id.as_deref()))?;
  info!(id = %entity.id, kind = %entity.kind, "entity created");
  Ok(entity)
}

pub async fn update_entity<S: LoadStore>(
  store: &S,
  id: &str,
  patch: EntityPatch,
) -> Result<Entity> {
  patch.validate()?;
  let employee_id = patch.employee_id.clone();
  store
    .update_entity(id, patch)
    .await
    .map_err(Error::store_op(format!("updating entity {id}")))?
    .map_err(|c| conflict_error(c, id, employee_id.as_deref()))?
    .ok_or_else(|| Error::EntityNotFound(id.to_owned()))
}

pub async fn delete_entity<S: LoadStore>(store: &S, id: &str) -> Result<()> {
  let deleted = store
    .delete_entity(id)
    .await
    .map_err(Error::store_op(format!("deleting entity {id}")))?;
  if !deleted {
    return Err(Error::EntityNotFound(id.to_owned()));
  }
  info!(%id, "entity deleted");
  Ok(())
}

// ─── Groups ──────────────────────────────────────────────────────────────────

pub async fn group_members<S: LoadStore>(
  store: &S,
  group_id: &str,
) -> Result<Vec<String>> {
  get_entity_of_kind(store, group_id, EntityKind::Group).await?;
  store
    .group_members(group_id)
    .await
    .map_err(Error::store_op(format!("listing members of {group_id}")))
}

pub async fn groups_for_person<S: LoadStore>(
  store: &S,
  person: &str,
) -> Result<Vec<String>> {
  get_entity_of_kind(store, person, EntityKind::Person).await?;
  store
    .groups_for_person(person)
    .await
    .map_err(Error::store_op(format!("listing groups of {person}")))
}

/// Add a person to a group. Both must exist with the right kinds.
pub async fn add_member<S: LoadStore>(
  store: &S,
  group_id: &str,
  person: &str,
) -> Result<()> {
  get_entity_of_kind(store, group_id, EntityKind::Group).await?;
  get_entity_of_kind(store, person, EntityKind::Person).await?;
  store
    .add_member(group_id, person)
    .await
    .map_err(Error::store_op(format!("adding {person} to {group_id}")))?;
  info!(group = %group_id, %person, "member added");
  Ok(())
}

/// Remove a person from a group. Removing a non-member is not an error.
pub async fn remove_member<S: LoadStore>(
  store: &S,
  group_id: &str,
  person: &str,
) -> Result<()> {
  let removed = store
    .remove_member(group_id, person)
    .await
    .map_err(Error::store_op(format!("removing {person} from {group_id}")))?;
  if removed {
    info!(group = %group_id, %person, "member removed");
  }
  Ok(())
}
