//! [`SqliteStore`]: the SQLite implementation of [`LoadStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, params};
use tracing::debug;

use loadcal_core::{
  calendar::DateRange,
  capacity::CapacityOverride,
  entity::{Entity, EntityKind, EntityPatch, NewEntity},
  load::{AssignmentInput, LoadWithAssignments, NewLoad},
  store::{EntityConflict, LoadStore},
};

use crate::{
  Error, Result,
  encode::{
    ENTITY_COLUMNS, LOAD_COLUMNS, RawEntity, RawLoadRow, RawOverride,
    collect_loads, decode_day_totals, encode_date, encode_dt, encode_kind,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A load calendar store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load rows matching `filter`, which may reference `l`, `la` and the
  /// positional parameters in `args`. Rows come back grouped per load.
  async fn query_loads(
    &self,
    from: &'static str,
    filter: &'static str,
    order: &'static str,
    args: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<LoadWithAssignments>> {
    let rows: Vec<RawLoadRow> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {LOAD_COLUMNS} {from} WHERE {filter} ORDER BY {order}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), RawLoadRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    collect_loads(rows)
  }

  async fn day_totals(
    &self,
    sql: &'static str,
    key: String,
    range: DateRange,
  ) -> Result<Vec<(NaiveDate, f64)>> {
    let start = encode_date(range.start());
    let end = encode_date(range.end());
    let rows: Vec<(String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(params![key, start, end], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    decode_day_totals(rows)
  }
}

/// Insert persons that do not exist yet. Runs inside the caller's
/// transaction.
fn insert_missing(
  tx: &rusqlite::Transaction<'_>,
  people: &[NewEntity],
  created_at: &str,
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "INSERT OR IGNORE INTO entities
       (id, kind, title, default_capacity, employee_id, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  for p in people {
    stmt.execute(params![
      p.id,
      encode_kind(p.kind),
      p.title,
      p.capacity(),
      p.employee_id,
      created_at,
    ])?;
  }
  Ok(())
}

fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  key: impl rusqlite::ToSql,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, [key], |_| Ok(())).optional()?.is_some())
}

/// Whether `err` is a UNIQUE violation on `column` (`table.column`).
fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, Some(msg))
      if e.code == rusqlite::ErrorCode::ConstraintViolation
        && msg.ends_with(column)
  )
}

// ─── LoadStore impl ──────────────────────────────────────────────────────────

impl LoadStore for SqliteStore {
  type Error = Error;

  // ── Entities ──────────────────────────────────────────────────────────────

  async fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
    let id = id.to_owned();
    let raw: Option<RawEntity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
              params![id],
              RawEntity::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawEntity::into_entity).transpose()
  }

  async fn find_by_employee_id(
    &self,
    employee_id: &str,
  ) -> Result<Option<Entity>> {
    let employee_id = employee_id.to_owned();
    let raw: Option<RawEntity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ENTITY_COLUMNS} FROM entities WHERE employee_id = ?1"
              ),
              params![employee_id],
              RawEntity::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawEntity::into_entity).transpose()
  }

  async fn list_entities(&self, kind: Option<EntityKind>) -> Result<Vec<Entity>> {
    let kind = kind.map(encode_kind);
    let raws: Vec<RawEntity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ENTITY_COLUMNS} FROM entities
           WHERE ?1 IS NULL OR kind = ?1
           ORDER BY kind, title, id"
        ))?;
        let rows = stmt
          .query_map(params![kind], RawEntity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawEntity::into_entity).collect()
  }

  async fn count_entities(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM entities", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n.max(0) as u64)
  }

  async fn create_entity(
    &self,
    input: NewEntity,
  ) -> Result<Result<Entity, EntityConflict>> {
    let entity = Entity {
      default_capacity: input.capacity(),
      id:               input.id,
      kind:             input.kind,
      title:            input.title,
      employee_id:      input.employee_id,
      created_at:       Utc::now(),
    };

    let id = entity.id.clone();
    let kind = encode_kind(entity.kind);
    let title = entity.title.clone();
    let capacity = entity.default_capacity;
    let employee_id = entity.employee_id.clone();
    let created_at = encode_dt(entity.created_at);

    let conflict = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO entities
             (id, kind, title, default_capacity, employee_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(id) DO NOTHING",
          params![id, kind, title, capacity, employee_id, created_at],
        );
        match inserted {
          Ok(0) => Ok(Some(EntityConflict::Id)),
          Ok(_) => Ok(None),
          Err(e) if is_unique_violation(&e, "entities.employee_id") => {
            Ok(Some(EntityConflict::EmployeeId))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(match conflict {
      Some(c) => {
        debug!(id = %entity.id, conflict = ?c, "entity insert refused");
        Err(c)
      }
      None => Ok(entity),
    })
  }

  async fn update_entity(
    &self,
    id: &str,
    patch: EntityPatch,
  ) -> Result<Result<Option<Entity>, EntityConflict>> {
    let id = id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        let updated = conn
          .query_row(
            &format!(
              "UPDATE entities SET
                 title            = COALESCE(?2, title),
                 employee_id      = COALESCE(?3, employee_id),
                 default_capacity = COALESCE(?4, default_capacity)
               WHERE id = ?1
               RETURNING {ENTITY_COLUMNS}"
            ),
            params![id, patch.title, patch.employee_id, patch.default_capacity],
            RawEntity::from_row,
          )
          .optional();
        match updated {
          Ok(raw) => Ok(Ok(raw)),
          Err(e) if is_unique_violation(&e, "entities.employee_id") => {
            Ok(Err(EntityConflict::EmployeeId))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    Ok(match raw {
      Ok(raw) => Ok(raw.map(RawEntity::into_entity).transpose()?),
      Err(c) => Err(c),
    })
  }

  async fn delete_entity(&self, id: &str) -> Result<bool> {
    let id = id.to_owned();
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?)
      })
      .await?;
    Ok(n > 0)
  }

  // ── Group membership ──────────────────────────────────────────────────────

  async fn group_members(&self, group_id: &str) -> Result<Vec<String>> {
    let group_id = group_id.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT person_id FROM group_members
             WHERE group_id = ?1 ORDER BY person_id",
          )?;
          let rows = stmt
            .query_map(params![group_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn groups_for_person(&self, person: &str) -> Result<Vec<String>> {
    let person = person.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT group_id FROM group_members
             WHERE person_id = ?1 ORDER BY group_id",
          )?;
          let rows = stmt
            .query_map(params![person], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn add_member(&self, group_id: &str, person: &str) -> Result<()> {
    let group_id = group_id.to_owned();
    let person = person.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO group_members (group_id, person_id)
           VALUES (?1, ?2)",
          params![group_id, person],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_member(&self, group_id: &str, person: &str) -> Result<bool> {
    let group_id = group_id.to_owned();
    let person = person.to_owned();
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM group_members WHERE group_id = ?1 AND person_id = ?2",
          params![group_id, person],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  // ── Capacity overrides ────────────────────────────────────────────────────

  async fn get_override(
    &self,
    entity_id: &str,
    date: NaiveDate,
  ) -> Result<Option<f64>> {
    let entity_id = entity_id.to_owned();
    let date = encode_date(date);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT capacity FROM capacity_overrides
                 WHERE entity_id = ?1 AND date = ?2",
                params![entity_id, date],
                |r| r.get(0),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn overrides_in_range(
    &self,
    entity_id: &str,
    range: DateRange,
  ) -> Result<Vec<CapacityOverride>> {
    let entity_id = entity_id.to_owned();
    let start = encode_date(range.start());
    let end = encode_date(range.end());
    let raws: Vec<RawOverride> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_id, date, capacity FROM capacity_overrides
           WHERE entity_id = ?1 AND date BETWEEN ?2 AND ?3
           ORDER BY date",
        )?;
        let rows = stmt
          .query_map(params![entity_id, start, end], |r| {
            Ok(RawOverride {
              entity_id: r.get(0)?,
              date:      r.get(1)?,
              capacity:  r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawOverride::into_override).collect()
  }

  async fn set_override(&self, value: CapacityOverride) -> Result<()> {
    let date = encode_date(value.date);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO capacity_overrides (entity_id, date, capacity)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (entity_id, date) DO UPDATE SET capacity = excluded.capacity",
          params![value.entity_id, date, value.capacity],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_override(&self, entity_id: &str, date: NaiveDate) -> Result<bool> {
    let entity_id = entity_id.to_owned();
    let date = encode_date(date);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM capacity_overrides WHERE entity_id = ?1 AND date = ?2",
          params![entity_id, date],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn update_capacity(
    &self,
    entity_id: &str,
    default_capacity: Option<f64>,
    overrides: Vec<(NaiveDate, f64)>,
  ) -> Result<bool> {
    let entity_id = entity_id.to_owned();
    let overrides: Vec<(String, f64)> = overrides
      .into_iter()
      .map(|(date, capacity)| (encode_date(date), capacity))
      .collect();

    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;

          let found = match default_capacity {
            Some(capacity) => {
              tx.execute(
                "UPDATE entities SET default_capacity = ?2 WHERE id = ?1",
                params![entity_id, capacity],
              )? > 0
            }
            None => {
              exists(&tx, "SELECT 1 FROM entities WHERE id = ?1", &entity_id)?
            }
          };
          if !found {
            return Ok(false);
          }

          {
            let mut stmt = tx.prepare(
              "INSERT INTO capacity_overrides (entity_id, date, capacity)
               VALUES (?1, ?2, ?3)
               ON CONFLICT (entity_id, date)
               DO UPDATE SET capacity = excluded.capacity",
            )?;
            for (date, capacity) in &overrides {
              stmt.execute(params![entity_id, date, capacity])?;
            }
          }

          tx.commit()?;
          Ok(true)
        })
        .await?,
    )
  }

  // ── Loads ─────────────────────────────────────────────────────────────────

  async fn get_load(&self, id: i64) -> Result<Option<LoadWithAssignments>> {
    let mut loads = self
      .query_loads(
        "FROM loads l LEFT JOIN load_assignments la ON la.load_id = l.id",
        "l.id = ?1",
        "la.person_id",
        vec![id.into()],
      )
      .await?;
    Ok(loads.pop())
  }

  async fn loads_in_range(
    &self,
    range: DateRange,
  ) -> Result<Vec<LoadWithAssignments>> {
    self
      .query_loads(
        "FROM loads l LEFT JOIN load_assignments la ON la.load_id = l.id",
        "l.date BETWEEN ?1 AND ?2",
        "l.date, l.id, la.person_id",
        vec![
          encode_date(range.start()).into(),
          encode_date(range.end()).into(),
        ],
      )
      .await
  }

  async fn upsert_load(
    &self,
    load: NewLoad,
    assignments: Vec<AssignmentInput>,
    create: Vec<NewEntity>,
  ) -> Result<i64> {
    let date = encode_date(load.date);
    let created_at = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_missing(&tx, &create, &created_at)?;

        let id: i64 = tx.query_row(
          "INSERT INTO loads (external_id, title, source, url, date)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (external_id) DO UPDATE SET
             title  = excluded.title,
             source = excluded.source,
             url    = excluded.url,
             date   = excluded.date
           RETURNING id",
          params![load.external_id, load.title, load.source, load.url, date],
          |r| r.get(0),
        )?;

        tx.execute("DELETE FROM load_assignments WHERE load_id = ?1", [id])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO load_assignments (load_id, person_id, weight)
             VALUES (?1, ?2, ?3)",
          )?;
          for a in &assignments {
            stmt.execute(params![id, a.person, a.weight])?;
          }
        }

        tx.commit()?;
        Ok(id)
      })
      .await?;

    debug!(load_id = id, "upsert committed");
    Ok(id)
  }

  async fn add_assignments(
    &self,
    load_id: i64,
    assignments: Vec<AssignmentInput>,
    create: Vec<NewEntity>,
  ) -> Result<bool> {
    let created_at = encode_dt(Utc::now());
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          if !exists(&tx, "SELECT 1 FROM loads WHERE id = ?1", load_id)? {
            return Ok(false);
          }
          insert_missing(&tx, &create, &created_at)?;
          {
            let mut stmt = tx.prepare(
              "INSERT INTO load_assignments (load_id, person_id, weight)
               VALUES (?1, ?2, ?3)
               ON CONFLICT (load_id, person_id)
               DO UPDATE SET weight = excluded.weight",
            )?;
            for a in &assignments {
              stmt.execute(params![load_id, a.person, a.weight])?;
            }
          }
          tx.commit()?;
          Ok(true)
        })
        .await?,
    )
  }

  async fn remove_assignment(&self, load_id: i64, person: &str) -> Result<bool> {
    let person = person.to_owned();
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM load_assignments WHERE load_id = ?1 AND person_id = ?2",
          params![load_id, person],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn delete_load(&self, id: i64) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM loads WHERE id = ?1", [id])?))
      .await?;
    Ok(n > 0)
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn person_load_by_day(
    &self,
    person: &str,
    range: DateRange,
  ) -> Result<Vec<(NaiveDate, f64)>> {
    self
      .day_totals(
        "SELECT l.date, SUM(la.weight)
         FROM loads l
         JOIN load_assignments la ON la.load_id = l.id
         WHERE la.person_id = ?1 AND l.date BETWEEN ?2 AND ?3
         GROUP BY l.date
         ORDER BY l.date",
        person.to_owned(),
        range,
      )
      .await
  }

  async fn group_load_by_day(
    &self,
    group_id: &str,
    range: DateRange,
  ) -> Result<Vec<(NaiveDate, f64)>> {
    self
      .day_totals(
        "SELECT l.date, SUM(la.weight)
         FROM loads l
         JOIN load_assignments la ON la.load_id   = l.id
         JOIN group_members    gm ON gm.person_id = la.person_id
         WHERE gm.group_id = ?1 AND l.date BETWEEN ?2 AND ?3
         GROUP BY l.date
         ORDER BY l.date",
        group_id.to_owned(),
        range,
      )
      .await
  }

  async fn person_load_on(&self, person: &str, date: NaiveDate) -> Result<f64> {
    let person = person.to_owned();
    let date = encode_date(date);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(
            "SELECT COALESCE(SUM(la.weight), 0.0)
             FROM loads l
             JOIN load_assignments la ON la.load_id = l.id
             WHERE la.person_id = ?1 AND l.date = ?2",
            params![person, date],
            |r| r.get(0),
          )?)
        })
        .await?,
    )
  }

  async fn person_loads_on(
    &self,
    person: &str,
    date: NaiveDate,
  ) -> Result<Vec<LoadWithAssignments>> {
    self
      .query_loads(
        "FROM loads l JOIN load_assignments la ON la.load_id = l.id",
        "la.person_id = ?1 AND l.date = ?2",
        "l.id",
        vec![person.to_owned().into(), encode_date(date).into()],
      )
      .await
  }

  async fn group_loads_on(
    &self,
    group_id: &str,
    date: NaiveDate,
  ) -> Result<Vec<LoadWithAssignments>> {
    self
      .query_loads(
        "FROM loads l
         JOIN load_assignments la ON la.load_id   = l.id
         JOIN group_members    gm ON gm.person_id = la.person_id",
        "gm.group_id = ?1 AND l.date = ?2",
        "l.id, la.person_id",
        vec![group_id.to_owned().into(), encode_date(date).into()],
      )
      .await
  }
}
