//! Cached access checks and enforcer/store role synchronization.

use std::collections::BTreeSet;
use std::time::Duration;

use roster_core::{config::Settings, principal::SessionPrincipal};
use tracing::debug;

use crate::{PolicyEngine, Result, cache::AccessCache};

/// Answers to the nine standard resource/action probes a session needs
/// up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserPermissions {
  pub users_read:       bool,
  pub users_write:      bool,
  pub users_create:     bool,
  pub roles_read:       bool,
  pub roles_write:      bool,
  pub roles_create:     bool,
  pub org_units_read:   bool,
  pub org_units_write:  bool,
  pub org_units_create: bool,
}

/// A policy engine fronted by a TTL decision cache.
///
/// Role mutations route through [`AccessControl::sync_roles`], which
/// clears the cache so no stale decision outlives a grant change.
pub struct AccessControl {
  engine: PolicyEngine,
  cache:  AccessCache,
}

impl AccessControl {
  pub fn new(engine: PolicyEngine, cache_ttl: Duration) -> Self {
    Self { engine, cache: AccessCache::new(cache_ttl) }
  }

  /// Load the policy artifacts named by the settings.
  pub async fn from_settings(settings: &Settings) -> Result<Self> {
    let engine =
      PolicyEngine::from_files(&settings.policy_model, &settings.policy_rules)
        .await?;
    Ok(Self::new(engine, Duration::from_secs(settings.cache_ttl_secs)))
  }

  /// Cached `enforce`.
  pub fn check_access(
    &mut self,
    sub: &str,
    obj: &str,
    act: &str,
  ) -> Result<bool> {
    if let Some(decision) = self.cache.get(sub, obj, act) {
      return Ok(decision);
    }
    let decision = self.engine.enforce(sub, obj, act)?;
    self.cache.insert(sub, obj, act, decision);
    Ok(decision)
  }

  /// Bring the enforcer's grouping for `user` in line with `target`.
  /// Stale groupings are removed before new ones are added, then the
  /// decision cache is cleared.
  pub async fn sync_roles(
    &mut self,
    user: &str,
    target: &BTreeSet<String>,
  ) -> Result<()> {
    let current: BTreeSet<String> =
      self.engine.roles_for(user).into_iter().collect();

    for stale in current.difference(target) {
      self.engine.delete_role_for_user(user, stale).await?;
    }
    for missing in target.difference(&current) {
      self.engine.add_role_for_user(user, missing).await?;
    }

    debug!(user, roles = ?target, "synced enforcer roles");
    self.cache.clear();
    Ok(())
  }

  /// The standard permission probes for a session, all through the
  /// cache.
  pub fn user_permissions(&mut self, username: &str) -> Result<UserPermissions> {
    Ok(UserPermissions {
      users_read:       self.check_access(username, "users", "read")?,
      users_write:      self.check_access(username, "users", "write")?,
      users_create:     self.check_access(username, "users", "create")?,
      roles_read:       self.check_access(username, "roles", "read")?,
      roles_write:      self.check_access(username, "roles", "write")?,
      roles_create:     self.check_access(username, "roles", "create")?,
      org_units_read:   self.check_access(username, "org_units", "read")?,
      org_units_write:  self.check_access(username, "org_units", "write")?,
      org_units_create: self.check_access(username, "org_units", "create")?,
    })
  }

  /// Administrator capability keys off directly granted roles; an
  /// inherited ADMINISTRATOR in the enforcer never counts.
  pub fn is_administrator(&self, principal: &SessionPrincipal) -> bool {
    principal.is_administrator()
  }

  /// Closure of the role hierarchy from `seeds`, seeds included.
  pub fn expand_roles(&mut self, seeds: &BTreeSet<String>) -> BTreeSet<String> {
    self.engine.expand_roles(seeds)
  }

  /// Drop every cached decision.
  pub fn invalidate(&mut self) { self.cache.clear(); }

  #[cfg(test)]
  pub(crate) fn cached_decisions(&self) -> usize { self.cache.len() }
}
