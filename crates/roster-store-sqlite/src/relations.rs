//! Relation repository.
//!
//! Traversal queries join the far-end participant and hide terminated far
//! ends; the edge rows themselves are never filtered by state.

use roster_core::relation::{
  NewRelation, RelatedParticipant, Relation, RelationType,
};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::warn;

use crate::{
  Error, Result,
  encode::{RawParticipant, RawRelation, encode_dt},
};

const RELATION_COLUMNS: &str =
  "id, source_id, target_id, relation_type, created_by, created_timestamp";

/// One denormalized row of the relations view, both endpoints resolved.
#[derive(Debug, Clone)]
pub struct RelationViewRow {
  pub id:                  i64,
  pub source_id:           i64,
  pub source_name:         String,
  pub source_display_name: String,
  pub source_type:         String,
  pub source_state:        String,
  pub relation_type:       RelationType,
  pub target_id:           i64,
  pub target_name:         String,
  pub target_display_name: String,
  pub target_type:         String,
  pub target_state:        String,
  pub created_by:          String,
}

pub struct RelationRepository<'c> {
  conn:   &'c Connection,
  prefix: String,
}

impl<'c> RelationRepository<'c> {
  pub fn new(conn: &'c Connection, prefix: impl Into<String>) -> Self {
    Self { conn, prefix: prefix.into() }
  }

  fn table(&self) -> String {
    format!("{}participant_relations", self.prefix)
  }

  fn participants_table(&self) -> String {
    format!("{}participants", self.prefix)
  }

  /// `IN (?2, ?3, ...)` clause for a type filter starting at placeholder
  /// index `first`. An empty filter matches every relation type.
  fn type_clause(types: &[RelationType], first: usize) -> String {
    if types.is_empty() {
      return String::new();
    }
    let placeholders: Vec<String> =
      (0..types.len()).map(|i| format!("?{}", first + i)).collect();
    format!(" AND r.relation_type IN ({})", placeholders.join(", "))
  }

  // ─── Traversal ─────────────────────────────────────────────────────────────

  /// Outgoing edges of `source_id`, carrying the target participant.
  /// Edges to terminated targets are omitted.
  pub fn get(
    &self,
    source_id: i64,
    types: &[RelationType],
  ) -> Result<Vec<RelatedParticipant>> {
    self.traverse("r.source_id", "r.target_id", source_id, types)
  }

  /// Incoming edges of `target_id`, carrying the source participant.
  /// Edges from terminated sources are omitted.
  pub fn get_reverse(
    &self,
    target_id: i64,
    types: &[RelationType],
  ) -> Result<Vec<RelatedParticipant>> {
    self.traverse("r.target_id", "r.source_id", target_id, types)
  }

  fn traverse(
    &self,
    near: &str,
    far: &str,
    id: i64,
    types: &[RelationType],
  ) -> Result<Vec<RelatedParticipant>> {
    let sql = format!(
      "SELECT r.relation_type, \
              p.id, p.name, p.display_name, p.participant_type, p.state, \
              p.description, p.email, p.external_reference, \
              p.hashed_password, p.update_count, p.created_by, \
              p.created_timestamp, p.updated_by, p.updated_timestamp \
         FROM {relations} r \
         JOIN {participants} p ON {far} = p.id \
        WHERE {near} = ?1 \
          AND (p.state IS NULL OR p.state = 'ACTIVE'){type_clause} \
        ORDER BY p.display_name",
      relations = self.table(),
      participants = self.participants_table(),
      type_clause = Self::type_clause(types, 2),
    );

    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(id)];
    for t in types {
      params.push(Box::new(t.as_str()));
    }

    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt.query_map(
      params_from_iter(params.iter().map(|p| p.as_ref())),
      |row| {
        let relation_type: String = row.get(0)?;
        Ok((relation_type, RawParticipant::from_row(row, 1)?))
      },
    )?;

    rows
      .map(|row| {
        let (relation_type, raw) = row?;
        Ok(RelatedParticipant {
          relation_type: RelationType::parse(&relation_type)
            .map_err(roster_core::Error::from)?,
          participant:   raw.into_participant()?,
        })
      })
      .collect()
  }

  pub fn exists(
    &self,
    source_id: i64,
    target_id: i64,
    relation_type: RelationType,
  ) -> Result<bool> {
    let found: Option<i64> = self
      .conn
      .query_row(
        &format!(
          "SELECT id FROM {} \
            WHERE source_id = ?1 AND target_id = ?2 AND relation_type = ?3",
          self.table()
        ),
        params![source_id, target_id, relation_type.as_str()],
        |row| row.get(0),
      )
      .optional()?;
    Ok(found.is_some())
  }

  // ─── Mutation ──────────────────────────────────────────────────────────────

  /// Insert an edge. A duplicate `(source, target, type)` surfaces as the
  /// underlying constraint violation.
  pub fn create(&self, mut create: NewRelation) -> Result<Relation> {
    create.validate()?;

    let now = encode_dt(chrono::Utc::now());
    self.conn.execute(
      &format!(
        "INSERT INTO {} \
           (source_id, target_id, relation_type, created_by, \
            created_timestamp) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        self.table()
      ),
      params![
        create.source_id,
        create.target_id,
        create.relation_type.as_str(),
        create.created_by,
        now,
      ],
    )?;

    let id = self.conn.last_insert_rowid();
    self.get_by_id(id)?.ok_or(Error::RelationNotFound)
  }

  /// Like [`create`], but a duplicate edge is logged and swallowed.
  ///
  /// [`create`]: RelationRepository::create
  pub fn create_if_absent(
    &self,
    create: NewRelation,
  ) -> Result<Option<Relation>> {
    match self.create(create.clone()) {
      Ok(relation) => Ok(Some(relation)),
      Err(err) if err.is_constraint_violation() => {
        warn!(
          source_id = create.source_id,
          target_id = create.target_id,
          relation_type = create.relation_type.as_str(),
          "relation already exists"
        );
        Ok(None)
      },
      Err(err) => Err(err),
    }
  }

  fn get_by_id(&self, id: i64) -> Result<Option<Relation>> {
    let raw = self
      .conn
      .query_row(
        &format!(
          "SELECT {RELATION_COLUMNS} FROM {} WHERE id = ?1",
          self.table()
        ),
        params![id],
        RawRelation::from_row,
      )
      .optional()?;
    raw.map(RawRelation::into_relation).transpose()
  }

  /// Delete one edge. Errors with [`Error::RelationNotFound`] when no
  /// such edge exists.
  pub fn delete(
    &self,
    source_id: i64,
    target_id: i64,
    relation_type: RelationType,
  ) -> Result<()> {
    let deleted = self.conn.execute(
      &format!(
        "DELETE FROM {} \
          WHERE source_id = ?1 AND target_id = ?2 AND relation_type = ?3",
        self.table()
      ),
      params![source_id, target_id, relation_type.as_str()],
    )?;
    if deleted == 0 {
      return Err(Error::RelationNotFound);
    }
    Ok(())
  }

  /// Delete every edge touching `id`, in either direction. Returns the
  /// number of edges removed.
  pub fn delete_all(&self, id: i64) -> Result<usize> {
    let deleted = self.conn.execute(
      &format!(
        "DELETE FROM {} WHERE source_id = ?1 OR target_id = ?1",
        self.table()
      ),
      params![id],
    )?;
    Ok(deleted)
  }

  // ─── View ──────────────────────────────────────────────────────────────────

  /// Every edge with both endpoints resolved, straight from the
  /// relations view.
  pub fn snapshot(&self) -> Result<Vec<RelationViewRow>> {
    let mut stmt = self.conn.prepare(&format!(
      "SELECT id, source_id, source_name, source_display_name, \
              source_type, source_state, relation_type, target_id, \
              target_name, target_display_name, target_type, target_state, \
              created_by \
         FROM {}participant_relations_v \
        ORDER BY source_name, relation_type, target_name",
      self.prefix
    ))?;

    let rows = stmt.query_and_then([], |row| {
      Ok(RelationViewRow {
        id:                  row.get(0)?,
        source_id:           row.get(1)?,
        source_name:         row.get(2)?,
        source_display_name: row.get(3)?,
        source_type:         row.get(4)?,
        source_state:        row.get(5)?,
        relation_type:       RelationType::parse(
          &row.get::<_, String>(6)?,
        )
        .map_err(roster_core::Error::from)?,
        target_id:           row.get(7)?,
        target_name:         row.get(8)?,
        target_display_name: row.get(9)?,
        target_type:         row.get(10)?,
        target_state:        row.get(11)?,
        created_by:          row.get(12)?,
      })
    })?;

    rows.collect()
  }
}
