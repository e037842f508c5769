//! SQLite repositories for the Roster participant directory.
//!
//! Both repositories borrow a caller-owned [`rusqlite::Connection`] (or a
//! transaction, which derefs to one) and never commit or roll back —
//! transaction scope belongs entirely to the caller.

mod encode;

pub mod bootstrap;
pub mod error;
pub mod participants;
pub mod relations;
pub mod schema;

pub use error::{Error, Result};
pub use participants::{FetchOpts, Key, ParticipantRepository};
pub use relations::{RelationRepository, RelationViewRow};

#[cfg(test)]
mod tests;
