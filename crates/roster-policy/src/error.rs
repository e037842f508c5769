//! Error type for `roster-policy`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("policy engine error: {0}")]
  Casbin(#[from] casbin::Error),

  #[error("store error: {0}")]
  Store(#[from] roster_store_sqlite::Error),

  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
