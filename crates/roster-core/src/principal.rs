//! The current-session principal and the external identity record.
//!
//! The principal is constructed once per interaction from the participant
//! graph and passed explicitly to whatever needs it — it is never mutated
//! in place from multiple code paths.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ─── IdentityRecord ──────────────────────────────────────────────────────────

/// What the external identity provider supplies per login. The core's only
/// obligation towards it is a case-insensitive participant lookup by `uid`
/// plus a drift update of the stored naming attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
  pub uid:          String,
  pub display_name: String,
  pub email:        String,
  pub title:        Option<String>,
}

impl IdentityRecord {
  /// The normalized participant name this identity maps to.
  pub fn username(&self) -> String { self.uid.trim().to_uppercase() }
}

// ─── SessionPrincipal ────────────────────────────────────────────────────────

/// The authenticated user of the current interaction.
///
/// `roles` holds the directly granted role names only; `effective_roles`
/// is the one-hop union expanded through the policy engine's role
/// hierarchy. Administrator capabilities key off `roles`, never off
/// `effective_roles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPrincipal {
  pub username:        String,
  pub display_name:    String,
  pub email:           Option<String>,
  pub title:           Option<String>,
  pub roles:           BTreeSet<String>,
  pub effective_roles: BTreeSet<String>,
  pub org_units:       BTreeSet<String>,
}

impl SessionPrincipal {
  /// Directly assigned administrator only; inherited ADMINISTRATOR does
  /// not count.
  pub fn is_administrator(&self) -> bool { self.roles.contains("ADMINISTRATOR") }
}

// ─── Manager heuristic ───────────────────────────────────────────────────────

const MANAGEMENT_KEYWORDS: [&str; 5] =
  ["manager", "director", "vp", "svp", "chief"];

/// Keyword heuristic over the job title, used to offer self-registration
/// to unknown users. Empty or missing titles never match.
pub fn is_manager_title(title: Option<&str>) -> bool {
  let Some(title) = title else { return false };
  let lower = title.to_lowercase();
  MANAGEMENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn manager_title_keywords() {
    assert!(is_manager_title(Some("Engineering Manager")));
    assert!(is_manager_title(Some("DIRECTOR of things")));
    assert!(is_manager_title(Some("SVP Operations")));
    assert!(!is_manager_title(Some("Nobel Price Winner")));
    assert!(!is_manager_title(Some("")));
    assert!(!is_manager_title(None));
  }

  #[test]
  fn administrator_is_direct_only() {
    let mut principal = SessionPrincipal {
      username: "EINSTEIN".into(),
      ..SessionPrincipal::default()
    };
    principal.effective_roles.insert("ADMINISTRATOR".into());
    assert!(!principal.is_administrator());

    principal.roles.insert("ADMINISTRATOR".into());
    assert!(principal.is_administrator());
  }
}
