//! RBAC policy adapter for the Roster participant directory.
//!
//! The heavy lifting is casbin's; this crate wires a casbin enforcer to
//! the participant graph: role grants flow from the store into the
//! enforcer's grouping policy, access checks flow back out through a
//! TTL-bounded decision cache.

pub mod access;
pub mod cache;
pub mod enforcer;
pub mod error;
pub mod roles;
pub mod session;

pub use access::{AccessControl, UserPermissions};
pub use cache::AccessCache;
pub use enforcer::PolicyEngine;
pub use error::{Error, Result};
pub use session::LoginOutcome;
