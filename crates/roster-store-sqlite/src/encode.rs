//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; type, state and relation
//! discriminants as their uppercase literals. A NULL `state` column
//! decodes to ACTIVE.

use chrono::{DateTime, Utc};
use roster_core::{
  participant::{Participant, ParticipantState, ParticipantType},
  relation::{Relation, RelationType},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// The column list every participant query selects, in `RawParticipant`
/// field order.
pub const PARTICIPANT_COLUMNS: &str = "id, name, display_name, \
   participant_type, state, description, email, external_reference, \
   hashed_password, update_count, created_by, created_timestamp, \
   updated_by, updated_timestamp";

/// Raw strings read directly from a `participants` row.
pub struct RawParticipant {
  pub id:                 i64,
  pub name:               String,
  pub display_name:       String,
  pub participant_type:   String,
  pub state:              Option<String>,
  pub description:        Option<String>,
  pub email:              Option<String>,
  pub external_reference: Option<String>,
  pub hashed_password:    Option<String>,
  pub update_count:       i64,
  pub created_by:         String,
  pub created_timestamp:  String,
  pub updated_by:         Option<String>,
  pub updated_timestamp:  Option<String>,
}

impl RawParticipant {
  /// Read the fourteen participant columns starting at `offset`.
  pub fn from_row(
    row: &rusqlite::Row<'_>,
    offset: usize,
  ) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(offset)?,
      name:               row.get(offset + 1)?,
      display_name:       row.get(offset + 2)?,
      participant_type:   row.get(offset + 3)?,
      state:              row.get(offset + 4)?,
      description:        row.get(offset + 5)?,
      email:              row.get(offset + 6)?,
      external_reference: row.get(offset + 7)?,
      hashed_password:    row.get(offset + 8)?,
      update_count:       row.get(offset + 9)?,
      created_by:         row.get(offset + 10)?,
      created_timestamp:  row.get(offset + 11)?,
      updated_by:         row.get(offset + 12)?,
      updated_timestamp:  row.get(offset + 13)?,
    })
  }

  pub fn into_participant(self) -> Result<Participant> {
    let state = match self.state.as_deref() {
      None => ParticipantState::Active,
      Some(s) => ParticipantState::parse(s).map_err(roster_core::Error::from)?,
    };

    Ok(Participant {
      id: self.id,
      name: self.name,
      display_name: self.display_name,
      participant_type: ParticipantType::parse(&self.participant_type)
        .map_err(roster_core::Error::from)?,
      state,
      description: self.description,
      email: self.email,
      external_reference: self.external_reference,
      hashed_password: self.hashed_password,
      update_count: self.update_count,
      created_by: self.created_by,
      created_timestamp: decode_dt(&self.created_timestamp)?,
      updated_by: self.updated_by,
      updated_timestamp: self
        .updated_timestamp
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      roles: Vec::new(),
      org_units: Vec::new(),
      proxy_of: Vec::new(),
      proxies: Vec::new(),
      effective_roles: Default::default(),
    })
  }
}

/// Raw strings read directly from a `participant_relations` row.
pub struct RawRelation {
  pub id:                i64,
  pub source_id:         i64,
  pub target_id:         i64,
  pub relation_type:     String,
  pub created_by:        String,
  pub created_timestamp: String,
}

impl RawRelation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      source_id:         row.get(1)?,
      target_id:         row.get(2)?,
      relation_type:     row.get(3)?,
      created_by:        row.get(4)?,
      created_timestamp: row.get(5)?,
    })
  }

  pub fn into_relation(self) -> Result<Relation> {
    Ok(Relation {
      id:                self.id,
      source_id:         self.source_id,
      target_id:         self.target_id,
      relation_type:     RelationType::parse(&self.relation_type)
        .map_err(roster_core::Error::from)?,
      created_by:        self.created_by,
      created_timestamp: decode_dt(&self.created_timestamp)?,
    })
  }
}
