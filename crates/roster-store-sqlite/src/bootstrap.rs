//! First-run seeding.
//!
//! An empty participants table gets the reserved SYSTEM account plus the
//! built-in roles every deployment expects. Seeding runs at most once;
//! a non-empty table is left alone.

use roster_core::participant::{NewParticipant, ParticipantType, SYSTEM_NAME};
use rusqlite::Connection;
use tracing::info;

use crate::{ParticipantRepository, Result, schema};

/// Built-in roles seeded alongside the system account, as
/// `(name, display_name, description)`.
const SEED_ROLES: [(&str, &str, &str); 3] = [
  ("PUBLIC", "Public", "Implicit role held by every participant"),
  ("ADMINISTRATOR", "Administrator", "Full administrative access"),
  (
    "USER_ADMINISTRATOR",
    "User Administrator",
    "Manage participants and their relations",
  ),
];

/// True when no participant rows exist yet.
pub fn is_empty(conn: &Connection, prefix: &str) -> Result<bool> {
  let count: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {prefix}participants"),
    [],
    |row| row.get(0),
  )?;
  Ok(count == 0)
}

/// Create the schema and, on a fresh database, seed the system account
/// and built-in roles. Returns whether seeding ran.
pub fn initialize(conn: &Connection, prefix: &str) -> Result<bool> {
  schema::init(conn, prefix)?;
  if !is_empty(conn, prefix)? {
    return Ok(false);
  }

  let participants = ParticipantRepository::new(conn, prefix);
  participants.create(
    NewParticipant::new(
      SYSTEM_NAME,
      "System",
      ParticipantType::System,
      SYSTEM_NAME,
    )
    .with_description("Reserved system account"),
  )?;
  for (name, display_name, description) in SEED_ROLES {
    participants.create(
      NewParticipant::role(name, display_name, SYSTEM_NAME)
        .with_description(description),
    )?;
  }

  info!("seeded system account and built-in roles");
  Ok(true)
}
