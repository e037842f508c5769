//! Relation — a typed, directed edge between two participants.
//!
//! All three relation kinds share one table and one struct; the semantics
//! read from the perspective of the source participant:
//!
//! - GRANT: the source holds the role named by the target.
//! - MEMBER_OF: the source belongs to the org unit named by the target.
//! - PROXY_OF: the source acts on behalf of the target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  participant::{MAX_NAME_LEN, Participant},
};

// ─── RelationType ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
  Grant,
  MemberOf,
  ProxyOf,
}

/// All relation types, in the order traversals default to.
pub const ALL_RELATION_TYPES: [RelationType; 3] =
  [RelationType::Grant, RelationType::MemberOf, RelationType::ProxyOf];

impl RelationType {
  /// The string stored in the `relation_type` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Grant => "GRANT",
      Self::MemberOf => "MEMBER_OF",
      Self::ProxyOf => "PROXY_OF",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "GRANT" => Ok(Self::Grant),
      "MEMBER_OF" => Ok(Self::MemberOf),
      "PROXY_OF" => Ok(Self::ProxyOf),
      other => Err(Error::UnknownRelationType(other.to_owned())),
    }
  }
}

// ─── Relation ────────────────────────────────────────────────────────────────

/// A persisted edge. Edges are created and hard-deleted whole; there is no
/// soft delete and no update. `(source_id, target_id, relation_type)` is
/// unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
  pub id:                i64,
  pub source_id:         i64,
  pub target_id:         i64,
  pub relation_type:     RelationType,
  pub created_by:        String,
  pub created_timestamp: DateTime<Utc>,
}

// ─── NewRelation ─────────────────────────────────────────────────────────────

/// Input for creating an edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRelation {
  pub source_id:     i64,
  pub target_id:     i64,
  pub relation_type: RelationType,
  pub created_by:    String,
}

impl NewRelation {
  pub fn new(
    source_id: i64,
    target_id: i64,
    relation_type: RelationType,
    created_by: impl Into<String>,
  ) -> Self {
    Self {
      source_id,
      target_id,
      relation_type,
      created_by: created_by.into(),
    }
  }

  /// Uppercase `created_by` and reject an empty one.
  pub fn validate(&mut self) -> Result<()> {
    self.created_by = self.created_by.trim().to_uppercase();
    if self.created_by.is_empty() {
      return Err(Error::MissingField("created_by"));
    }
    if self.created_by.chars().count() > MAX_NAME_LEN {
      return Err(Error::FieldTooLong { field: "created_by", max: MAX_NAME_LEN });
    }
    Ok(())
  }
}

// ─── RelatedParticipant ──────────────────────────────────────────────────────

/// One traversal result: the edge type plus the participant on the far end
/// (the target for outgoing queries, the source for reverse queries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedParticipant {
  pub relation_type: RelationType,
  pub participant:   Participant,
}
