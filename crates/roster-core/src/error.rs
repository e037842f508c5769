//! Error types for `roster-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Name violates the `^[A-Za-z][A-Za-z0-9_-]*$` / 2–30 chars rule.
  #[error("invalid name: {0:?}")]
  InvalidName(String),

  #[error("invalid display name: {0:?}")]
  InvalidDisplayName(String),

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("field {field} exceeds {max} characters")]
  FieldTooLong { field: &'static str, max: usize },

  #[error("missing mandatory field: {0}")]
  MissingField(&'static str),

  #[error("unknown participant type: {0:?}")]
  UnknownParticipantType(String),

  #[error("unknown participant state: {0:?}")]
  UnknownParticipantState(String),

  #[error("unknown relation type: {0:?}")]
  UnknownRelationType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
