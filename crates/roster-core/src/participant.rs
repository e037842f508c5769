//! Participant — the canonical representation of an actor in the system.
//!
//! A participant is a human user, a role, an organizational unit, or the
//! system account. All four kinds share one table and one struct; the
//! `participant_type` discriminant never changes after creation.

use std::{collections::BTreeSet, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The reserved name of the system account. State transitions on the
/// participant carrying this name are silently ignored.
pub const SYSTEM_NAME: &str = "SYSTEM";

pub const MAX_NAME_LEN: usize = 30;
pub const MAX_DISPLAY_NAME_LEN: usize = 60;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_EMAIL_LEN: usize = 200;
pub const MAX_EXTERNAL_REFERENCE_LEN: usize = 500;
pub const MAX_HASHED_PASSWORD_LEN: usize = 100;

// ─── Discriminants ───────────────────────────────────────────────────────────

/// The kind of actor a participant represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
  Human,
  Role,
  OrgUnit,
  System,
}

impl ParticipantType {
  /// The string stored in the `participant_type` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Human => "HUMAN",
      Self::Role => "ROLE",
      Self::OrgUnit => "ORG_UNIT",
      Self::System => "SYSTEM",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "HUMAN" => Ok(Self::Human),
      "ROLE" => Ok(Self::Role),
      "ORG_UNIT" => Ok(Self::OrgUnit),
      "SYSTEM" => Ok(Self::System),
      other => Err(Error::UnknownParticipantType(other.to_owned())),
    }
  }
}

/// Lifecycle state. A NULL column decodes to [`ParticipantState::Active`];
/// unset has always meant active.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantState {
  #[default]
  Active,
  Terminated,
}

impl ParticipantState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "ACTIVE",
      Self::Terminated => "TERMINATED",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "ACTIVE" => Ok(Self::Active),
      "TERMINATED" => Ok(Self::Terminated),
      other => Err(Error::UnknownParticipantState(other.to_owned())),
    }
  }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{1,29}$").expect("valid name pattern")
});

/// A valid name starts with a letter, continues with letters, digits,
/// underscores or hyphens, and is 2–30 characters long.
pub fn is_valid_name(name: &str) -> bool { NAME_PATTERN.is_match(name) }

/// Syntactic email check: one `@`, non-empty local part, dotted domain
/// with non-empty labels, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && domain.contains('.')
    && domain.split('.').all(|label| !label.is_empty())
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
  if value.chars().count() > max {
    return Err(Error::FieldTooLong { field, max });
  }
  Ok(())
}

fn check_optional_email(email: Option<&str>) -> Result<()> {
  if let Some(addr) = email {
    check_len("email", addr, MAX_EMAIL_LEN)?;
    if !is_valid_email(addr) {
      return Err(Error::InvalidEmail(addr.to_owned()));
    }
  }
  Ok(())
}

// ─── Participant ─────────────────────────────────────────────────────────────

/// A persisted participant row plus its hydrated relationship lists.
///
/// The relationship lists (`roles`, `org_units`, `proxy_of`, `proxies`) and
/// `effective_roles` are not stored on the row; they are populated by the
/// repository on request and default to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
  pub id:                 i64,
  pub name:               String,
  pub display_name:       String,
  pub participant_type:   ParticipantType,
  pub state:              ParticipantState,
  pub description:        Option<String>,
  pub email:              Option<String>,
  pub external_reference: Option<String>,
  pub hashed_password:    Option<String>,
  /// Optimistic-concurrency counter, incremented on every update.
  pub update_count:       i64,
  pub created_by:         String,
  pub created_timestamp:  DateTime<Utc>,
  pub updated_by:         Option<String>,
  pub updated_timestamp:  Option<DateTime<Utc>>,

  /// Roles granted directly to this participant (outgoing GRANT edges).
  #[serde(default)]
  pub roles:              Vec<Participant>,
  /// Org units this participant belongs to (outgoing MEMBER_OF edges).
  #[serde(default)]
  pub org_units:          Vec<Participant>,
  /// Participants this one acts on behalf of (outgoing PROXY_OF edges).
  #[serde(default)]
  pub proxy_of:           Vec<Participant>,
  /// Participants acting on behalf of this one (incoming PROXY_OF edges).
  #[serde(default)]
  pub proxies:            Vec<Participant>,
  /// Union of direct, org-unit and proxy-target role names; computed, one
  /// hop only.
  #[serde(default)]
  pub effective_roles:    BTreeSet<String>,
}

impl Participant {
  pub fn is_active(&self) -> bool { self.state == ParticipantState::Active }

  /// True for the reserved system account, whatever its type.
  pub fn is_system(&self) -> bool { self.name == SYSTEM_NAME }

  pub fn role_names(&self) -> BTreeSet<String> {
    self.roles.iter().map(|r| r.name.clone()).collect()
  }
}

// ─── NewParticipant ──────────────────────────────────────────────────────────

/// Input for creating a participant. `name` and `created_by` are uppercased
/// and the whole record validated by [`NewParticipant::validate`] before it
/// reaches the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
  pub name:               String,
  pub display_name:       String,
  pub participant_type:   ParticipantType,
  pub description:        Option<String>,
  pub email:              Option<String>,
  pub external_reference: Option<String>,
  pub hashed_password:    Option<String>,
  pub created_by:         String,
}

impl NewParticipant {
  pub fn new(
    name: impl Into<String>,
    display_name: impl Into<String>,
    participant_type: ParticipantType,
    created_by: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      display_name: display_name.into(),
      participant_type,
      description: None,
      email: None,
      external_reference: None,
      hashed_password: None,
      created_by: created_by.into(),
    }
  }

  /// A new HUMAN participant.
  pub fn human(
    name: impl Into<String>,
    display_name: impl Into<String>,
    created_by: impl Into<String>,
  ) -> Self {
    Self::new(name, display_name, ParticipantType::Human, created_by)
  }

  /// A new ROLE participant.
  pub fn role(
    name: impl Into<String>,
    display_name: impl Into<String>,
    created_by: impl Into<String>,
  ) -> Self {
    Self::new(name, display_name, ParticipantType::Role, created_by)
  }

  /// A new ORG_UNIT participant.
  pub fn org_unit(
    name: impl Into<String>,
    display_name: impl Into<String>,
    created_by: impl Into<String>,
  ) -> Self {
    Self::new(name, display_name, ParticipantType::OrgUnit, created_by)
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }

  pub fn with_external_reference(mut self, r: impl Into<String>) -> Self {
    self.external_reference = Some(r.into());
    self
  }

  pub fn with_hashed_password(mut self, hash: impl Into<String>) -> Self {
    self.hashed_password = Some(hash.into());
    self
  }

  /// Normalize and validate in place. Uppercasing of `name` and
  /// `created_by` is the only transform applied; everything else either
  /// passes or errors.
  pub fn validate(&mut self) -> Result<()> {
    self.name = self.name.trim().to_uppercase();
    self.display_name = self.display_name.trim().to_owned();
    self.created_by = self.created_by.trim().to_uppercase();

    if self.name.is_empty() {
      return Err(Error::MissingField("name"));
    }
    if self.display_name.is_empty() {
      return Err(Error::MissingField("display_name"));
    }
    if self.created_by.is_empty() {
      return Err(Error::MissingField("created_by"));
    }
    if !is_valid_name(&self.name) {
      return Err(Error::InvalidName(self.name.clone()));
    }
    check_len("display_name", &self.display_name, MAX_DISPLAY_NAME_LEN)?;
    check_len("created_by", &self.created_by, MAX_NAME_LEN)?;
    if let Some(d) = &self.description {
      check_len("description", d, MAX_DESCRIPTION_LEN)?;
    }
    if let Some(r) = &self.external_reference {
      check_len("external_reference", r, MAX_EXTERNAL_REFERENCE_LEN)?;
    }
    if let Some(h) = &self.hashed_password {
      check_len("hashed_password", h, MAX_HASHED_PASSWORD_LEN)?;
    }
    check_optional_email(self.email.as_deref())
  }
}

// ─── ParticipantPatch ────────────────────────────────────────────────────────

/// Partial update. `None` leaves a field untouched; for nullable columns
/// the double-Option distinguishes "untouched" (`None`) from "set to NULL"
/// (`Some(None)`).
///
/// `updated_by` is always required and `updated_timestamp` is stamped by
/// the repository (caller-supplied value wins) on every update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantPatch {
  pub name:                  Option<String>,
  pub display_name:          Option<String>,
  pub description:           Option<Option<String>>,
  pub email:                 Option<Option<String>>,
  pub state:                 Option<ParticipantState>,
  pub external_reference:    Option<Option<String>>,
  pub hashed_password:       Option<Option<String>>,
  pub updated_by:            String,
  pub updated_timestamp:     Option<DateTime<Utc>>,
  /// When set, the update only succeeds if the stored `update_count`
  /// still matches (compare-and-swap optimistic locking).
  pub expected_update_count: Option<i64>,
}

impl ParticipantPatch {
  pub fn new(updated_by: impl Into<String>) -> Self {
    Self { updated_by: updated_by.into(), ..Self::default() }
  }

  /// Normalize and validate the fields that are present.
  pub fn validate(&mut self) -> Result<()> {
    self.updated_by = self.updated_by.trim().to_uppercase();
    if self.updated_by.is_empty() {
      return Err(Error::MissingField("updated_by"));
    }
    check_len("updated_by", &self.updated_by, MAX_NAME_LEN)?;

    if let Some(name) = &mut self.name {
      *name = name.trim().to_uppercase();
      if !is_valid_name(name) {
        return Err(Error::InvalidName(name.clone()));
      }
    }
    if let Some(display_name) = &mut self.display_name {
      *display_name = display_name.trim().to_owned();
      if display_name.is_empty() {
        return Err(Error::InvalidDisplayName(display_name.clone()));
      }
      check_len("display_name", display_name, MAX_DISPLAY_NAME_LEN)?;
    }
    if let Some(Some(d)) = &self.description {
      check_len("description", d, MAX_DESCRIPTION_LEN)?;
    }
    if let Some(Some(r)) = &self.external_reference {
      check_len("external_reference", r, MAX_EXTERNAL_REFERENCE_LEN)?;
    }
    if let Some(Some(h)) = &self.hashed_password {
      check_len("hashed_password", h, MAX_HASHED_PASSWORD_LEN)?;
    }
    if let Some(email) = &self.email {
      check_optional_email(email.as_deref())?;
    }
    Ok(())
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
