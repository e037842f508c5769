//! Participant repository.
//!
//! All methods borrow a caller-owned connection and run synchronously;
//! the caller decides transaction boundaries. Lookups return `Ok(None)`
//! for a missing row, never an error.

use roster_core::{
  participant::{
    NewParticipant, Participant, ParticipantPatch, ParticipantState,
    ParticipantType, SYSTEM_NAME,
  },
  relation::{ALL_RELATION_TYPES, NewRelation, Relation, RelationType},
};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{PARTICIPANT_COLUMNS, RawParticipant, encode_dt},
  relations::RelationRepository,
};

// ─── Lookup types ────────────────────────────────────────────────────────────

/// Which column identifies the participant in an [`exists`] probe.
///
/// [`exists`]: ParticipantRepository::exists
#[derive(Debug, Clone, Copy)]
pub enum Key<'a> {
  Id(i64),
  Name(&'a str),
  DisplayName(&'a str),
}

/// What to hydrate on a fetched participant beyond the bare row.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOpts {
  /// Populate `roles`, `org_units`, `proxy_of` and `effective_roles`.
  pub relations: bool,
  /// Populate `proxies` (incoming PROXY_OF edges).
  pub proxies:   bool,
}

impl FetchOpts {
  pub fn all() -> Self { Self { relations: true, proxies: true } }

  pub fn relations() -> Self { Self { relations: true, proxies: false } }
}

// ─── Repository ──────────────────────────────────────────────────────────────

pub struct ParticipantRepository<'c> {
  conn:   &'c Connection,
  prefix: String,
}

impl<'c> ParticipantRepository<'c> {
  pub fn new(conn: &'c Connection, prefix: impl Into<String>) -> Self {
    Self { conn, prefix: prefix.into() }
  }

  fn table(&self) -> String { format!("{}participants", self.prefix) }

  fn relations_repo(&self) -> RelationRepository<'c> {
    RelationRepository::new(self.conn, self.prefix.clone())
  }

  // ─── Fetching ──────────────────────────────────────────────────────────────

  pub fn get_by_id(
    &self,
    id: i64,
    opts: FetchOpts,
  ) -> Result<Option<Participant>> {
    self.fetch_one("id = ?1", params![id], opts)
  }

  /// Lookup by the uppercase natural key. The input is trimmed and
  /// uppercased before comparison.
  pub fn get_by_name(
    &self,
    name: &str,
    participant_type: ParticipantType,
    opts: FetchOpts,
  ) -> Result<Option<Participant>> {
    let name = name.trim().to_uppercase();
    self.fetch_one(
      "name = ?1 AND participant_type = ?2",
      params![name, participant_type.as_str()],
      opts,
    )
  }

  pub fn get_by_display_name(
    &self,
    display_name: &str,
    participant_type: ParticipantType,
    opts: FetchOpts,
  ) -> Result<Option<Participant>> {
    self.fetch_one(
      "display_name = ?1 AND participant_type = ?2",
      params![display_name.trim(), participant_type.as_str()],
      opts,
    )
  }

  fn fetch_one(
    &self,
    predicate: &str,
    params: impl rusqlite::Params,
    opts: FetchOpts,
  ) -> Result<Option<Participant>> {
    let sql = format!(
      "SELECT {PARTICIPANT_COLUMNS} FROM {} WHERE {predicate}",
      self.table()
    );
    let raw = self
      .conn
      .query_row(&sql, params, |row| RawParticipant::from_row(row, 0))
      .optional()?;

    let Some(raw) = raw else { return Ok(None) };
    let mut participant = raw.into_participant()?;
    self.hydrate(&mut participant, opts)?;
    Ok(Some(participant))
  }

  /// Cheap existence probe. Returns the participant's state when a row
  /// matches, `None` otherwise. An [`Key::Id`] probe ignores
  /// `participant_type`; the id is already unambiguous.
  pub fn exists(
    &self,
    key: Key<'_>,
    participant_type: ParticipantType,
  ) -> Result<Option<ParticipantState>> {
    let table = self.table();
    let state: Option<Option<String>> = match key {
      Key::Id(id) => self
        .conn
        .query_row(
          &format!("SELECT state FROM {table} WHERE id = ?1"),
          params![id],
          |row| row.get(0),
        )
        .optional()?,
      Key::Name(name) => self
        .conn
        .query_row(
          &format!(
            "SELECT state FROM {table} \
              WHERE name = ?1 AND participant_type = ?2"
          ),
          params![name.trim().to_uppercase(), participant_type.as_str()],
          |row| row.get(0),
        )
        .optional()?,
      Key::DisplayName(display_name) => self
        .conn
        .query_row(
          &format!(
            "SELECT state FROM {table} \
              WHERE display_name = ?1 AND participant_type = ?2"
          ),
          params![display_name.trim(), participant_type.as_str()],
          |row| row.get(0),
        )
        .optional()?,
    };

    match state {
      None => Ok(None),
      Some(None) => Ok(Some(ParticipantState::Active)),
      Some(Some(s)) => Ok(Some(
        ParticipantState::parse(&s).map_err(roster_core::Error::from)?,
      )),
    }
  }

  /// All participants of a type, ordered by display name. With
  /// `only_active`, terminated rows are filtered out (a NULL state counts
  /// as active).
  pub fn get_all(
    &self,
    participant_type: ParticipantType,
    opts: FetchOpts,
    only_active: bool,
  ) -> Result<Vec<Participant>> {
    let mut sql = format!(
      "SELECT {PARTICIPANT_COLUMNS} FROM {} WHERE participant_type = ?1",
      self.table()
    );
    if only_active {
      sql.push_str(" AND COALESCE(state, 'ACTIVE') = 'ACTIVE'");
    }
    sql.push_str(" ORDER BY display_name");

    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt.query_map(params![participant_type.as_str()], |row| {
      RawParticipant::from_row(row, 0)
    })?;

    let mut participants: Vec<Participant> = rows
      .map(|raw| raw.map_err(Error::from)?.into_participant())
      .collect::<Result<_>>()?;
    for participant in &mut participants {
      self.hydrate(participant, opts)?;
    }
    Ok(participants)
  }

  // ─── Hydration ─────────────────────────────────────────────────────────────

  fn hydrate(&self, p: &mut Participant, opts: FetchOpts) -> Result<()> {
    if opts.relations {
      self.set_relations(p)?;
      self.compute_effective_roles(p)?;
    }
    if opts.proxies {
      let relations = self.relations_repo();
      p.proxies = relations
        .get_reverse(p.id, &[RelationType::ProxyOf])?
        .into_iter()
        .map(|r| r.participant)
        .collect();
    }
    Ok(())
  }

  /// Populate the outgoing relationship lists from the current edges.
  /// Terminated far ends are excluded.
  pub fn set_relations(&self, p: &mut Participant) -> Result<()> {
    let relations = self.relations_repo();

    p.roles = Vec::new();
    p.org_units = Vec::new();
    p.proxy_of = Vec::new();
    for related in relations.get(p.id, &ALL_RELATION_TYPES)? {
      match related.relation_type {
        RelationType::Grant => p.roles.push(related.participant),
        RelationType::MemberOf => p.org_units.push(related.participant),
        RelationType::ProxyOf => p.proxy_of.push(related.participant),
      }
    }
    Ok(())
  }

  /// Effective roles: the union of directly granted roles, roles granted
  /// to each org unit the participant belongs to, and roles granted to
  /// each participant it proxies. One hop only; an org unit's org units
  /// contribute nothing.
  pub fn compute_effective_roles(&self, p: &mut Participant) -> Result<()> {
    if p.roles.is_empty() && p.org_units.is_empty() && p.proxy_of.is_empty() {
      self.set_relations(p)?;
    }

    let relations = self.relations_repo();
    let mut effective = p.role_names();
    for intermediate in p.org_units.iter().chain(&p.proxy_of) {
      for related in
        relations.get(intermediate.id, &[RelationType::Grant])?
      {
        effective.insert(related.participant.name);
      }
    }
    p.effective_roles = effective;
    Ok(())
  }

  // ─── Creation ──────────────────────────────────────────────────────────────

  /// Validate, insert and read back. Duplicate natural keys surface as
  /// the underlying constraint violation.
  pub fn create(&self, mut create: NewParticipant) -> Result<Participant> {
    create.validate()?;

    let now = encode_dt(chrono::Utc::now());
    self.conn.execute(
      &format!(
        "INSERT INTO {} \
           (name, display_name, participant_type, state, description, \
            email, external_reference, hashed_password, update_count, \
            created_by, created_timestamp) \
         VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
        self.table()
      ),
      params![
        create.name,
        create.display_name,
        create.participant_type.as_str(),
        create.description,
        create.email,
        create.external_reference,
        create.hashed_password,
        create.created_by,
        now,
      ],
    )?;

    let id = self.conn.last_insert_rowid();
    debug!(id, name = %create.name, "created participant");
    self
      .get_by_id(id, FetchOpts::default())?
      .ok_or(Error::ParticipantNotFound(id))
  }

  /// Shorthand for creating a HUMAN participant.
  pub fn add_user(
    &self,
    name: &str,
    display_name: &str,
    created_by: &str,
  ) -> Result<Participant> {
    self.create(NewParticipant::human(name, display_name, created_by))
  }

  /// Shorthand for creating a ROLE participant.
  pub fn add_role(
    &self,
    name: &str,
    display_name: &str,
    created_by: &str,
  ) -> Result<Participant> {
    self.create(NewParticipant::role(name, display_name, created_by))
  }

  /// Shorthand for creating an ORG_UNIT participant.
  pub fn add_org(
    &self,
    name: &str,
    display_name: &str,
    created_by: &str,
  ) -> Result<Participant> {
    self.create(NewParticipant::org_unit(name, display_name, created_by))
  }

  // ─── Updates ───────────────────────────────────────────────────────────────

  /// Apply a partial update. Every update stamps `updated_by` and
  /// `updated_timestamp` and increments `update_count`; when the patch
  /// carries `expected_update_count` the statement compare-and-swaps on
  /// it and a mismatch yields [`Error::StaleUpdate`].
  pub fn update(
    &self,
    id: i64,
    mut patch: ParticipantPatch,
  ) -> Result<Participant> {
    patch.validate()?;

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    let mut push =
      |sets: &mut Vec<String>, column: &str, v: Box<dyn rusqlite::ToSql>| {
        values.push(v);
        sets.push(format!("{column} = ?{}", values.len()));
      };

    if let Some(name) = patch.name {
      push(&mut sets, "name", Box::new(name));
    }
    if let Some(display_name) = patch.display_name {
      push(&mut sets, "display_name", Box::new(display_name));
    }
    if let Some(description) = patch.description {
      push(&mut sets, "description", Box::new(description));
    }
    if let Some(email) = patch.email {
      push(&mut sets, "email", Box::new(email));
    }
    if let Some(state) = patch.state {
      push(&mut sets, "state", Box::new(state.as_str()));
    }
    if let Some(external_reference) = patch.external_reference {
      push(&mut sets, "external_reference", Box::new(external_reference));
    }
    if let Some(hashed_password) = patch.hashed_password {
      push(&mut sets, "hashed_password", Box::new(hashed_password));
    }

    let updated_timestamp =
      patch.updated_timestamp.unwrap_or_else(chrono::Utc::now);
    push(&mut sets, "updated_by", Box::new(patch.updated_by));
    push(&mut sets, "updated_timestamp", Box::new(encode_dt(updated_timestamp)));
    sets.push("update_count = update_count + 1".to_owned());

    values.push(Box::new(id));
    let mut sql = format!(
      "UPDATE {} SET {} WHERE id = ?{}",
      self.table(),
      sets.join(", "),
      values.len()
    );
    if let Some(expected) = patch.expected_update_count {
      values.push(Box::new(expected));
      sql.push_str(&format!(" AND update_count = ?{}", values.len()));
    }

    let changed = self
      .conn
      .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
    if changed == 0 {
      // Distinguish a vanished row from a lost optimistic lock.
      let still_there =
        self.exists(Key::Id(id), ParticipantType::Human)?.is_some();
      return match patch.expected_update_count {
        Some(expected) if still_there => {
          Err(Error::StaleUpdate { id, expected })
        },
        _ => Err(Error::ParticipantNotFound(id)),
      };
    }

    self
      .get_by_id(id, FetchOpts::default())?
      .ok_or(Error::ParticipantNotFound(id))
  }

  /// Transition a participant's lifecycle state. The reserved system
  /// account never changes state; for it the call is a no-op returning
  /// the row as is, with nothing stamped.
  pub fn set_participant_state(
    &self,
    id: i64,
    state: ParticipantState,
    updated_by: &str,
  ) -> Result<Participant> {
    let current = self
      .get_by_id(id, FetchOpts::default())?
      .ok_or(Error::ParticipantNotFound(id))?;
    if current.name == SYSTEM_NAME {
      debug!(id, "ignoring state transition on the system account");
      return Ok(current);
    }

    let mut patch = ParticipantPatch::new(updated_by);
    patch.state = Some(state);
    self.update(id, patch)
  }

  pub fn terminate_participant(
    &self,
    id: i64,
    updated_by: &str,
  ) -> Result<Participant> {
    self.set_participant_state(id, ParticipantState::Terminated, updated_by)
  }

  pub fn activate_participant(
    &self,
    id: i64,
    updated_by: &str,
  ) -> Result<Participant> {
    self.set_participant_state(id, ParticipantState::Active, updated_by)
  }

  // ─── Relation convenience ──────────────────────────────────────────────────

  /// Create an outgoing edge from `id`. A duplicate is logged and
  /// swallowed; `Ok(None)` means the edge already existed.
  pub fn add_relation(
    &self,
    id: i64,
    target_id: i64,
    relation_type: RelationType,
    created_by: &str,
  ) -> Result<Option<Relation>> {
    self.relations_repo().create_if_absent(NewRelation::new(
      id,
      target_id,
      relation_type,
      created_by,
    ))
  }

  /// Create an incoming edge to `id`.
  pub fn add_reverse_relation(
    &self,
    id: i64,
    source_id: i64,
    relation_type: RelationType,
    created_by: &str,
  ) -> Result<Option<Relation>> {
    self.relations_repo().create_if_absent(NewRelation::new(
      source_id,
      id,
      relation_type,
      created_by,
    ))
  }

  /// Delete an outgoing edge. Errors with [`Error::RelationNotFound`]
  /// when no such edge exists.
  pub fn delete_relation(
    &self,
    id: i64,
    target_id: i64,
    relation_type: RelationType,
  ) -> Result<()> {
    self.relations_repo().delete(id, target_id, relation_type)
  }

  /// Delete an incoming edge.
  pub fn delete_reverse_relation(
    &self,
    id: i64,
    source_id: i64,
    relation_type: RelationType,
  ) -> Result<()> {
    self.relations_repo().delete(source_id, id, relation_type)
  }

  /// Remove every edge touching the participant, in either direction.
  pub fn delete_all_participant_relations(&self, id: i64) -> Result<usize> {
    self.relations_repo().delete_all(id)
  }
}
