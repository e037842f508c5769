//! Core types and validation for the Roster participant directory.
//!
//! This crate is deliberately free of database and policy-engine
//! dependencies. The store and policy crates depend on it; it depends on
//! nothing heavier than serde and chrono.

pub mod config;
pub mod error;
pub mod participant;
pub mod principal;
pub mod relation;

pub use error::{Error, Result};
