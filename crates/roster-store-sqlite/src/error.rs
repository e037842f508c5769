//! Error type for `roster-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),

  /// Integrity violations (duplicate natural key, duplicate edge) surface
  /// here untranslated.
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("participant not found: {0}")]
  ParticipantNotFound(i64),

  #[error("relation not found")]
  RelationNotFound,

  /// Optimistic-lock conflict: the stored `update_count` no longer
  /// matches the expected value.
  #[error("participant {id} was updated concurrently (expected update_count {expected})")]
  StaleUpdate { id: i64, expected: i64 },
}

impl Error {
  /// True when the wrapped database error is a UNIQUE/constraint
  /// violation.
  pub fn is_constraint_violation(&self) -> bool {
    matches!(
      self,
      Error::Database(rusqlite::Error::SqliteFailure(e, _))
        if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
