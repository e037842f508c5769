//! Casbin enforcer wrapper.
//!
//! Production engines load the model and policy rules from files; tests
//! build in-memory engines from string fragments. Construction is the
//! only fallible setup step and a failure is fatal for the caller, so it
//! is logged here and propagated untouched.

use std::collections::BTreeSet;

use casbin::{
  CoreApi, DefaultModel, Enforcer, FileAdapter, MemoryAdapter, MgmtApi,
  RbacApi,
};
use tracing::{debug, error};

use crate::Result;

pub struct PolicyEngine {
  enforcer: Enforcer,
}

impl PolicyEngine {
  /// Load the model and policy rules from disk.
  pub async fn from_files(model_path: &str, rules_path: &str) -> Result<Self> {
    let model = DefaultModel::from_file(model_path).await.map_err(|err| {
      error!(model_path, %err, "failed to load policy model");
      err
    })?;
    let adapter = FileAdapter::new(rules_path.to_owned());
    let enforcer = Enforcer::new(model, adapter).await.map_err(|err| {
      error!(rules_path, %err, "failed to load policy rules");
      err
    })?;
    Ok(Self { enforcer })
  }

  /// Build an in-memory engine from a model string plus explicit
  /// `(subject, object, action)` policies and `(member, role)` groupings.
  pub async fn from_model_str(
    model: &str,
    policies: &[(&str, &str, &str)],
    groupings: &[(&str, &str)],
  ) -> Result<Self> {
    let model = DefaultModel::from_str(model).await?;
    let mut enforcer = Enforcer::new(model, MemoryAdapter::default()).await?;

    for (sub, obj, act) in policies {
      enforcer
        .add_policy(vec![sub.to_string(), obj.to_string(), act.to_string()])
        .await?;
    }
    for (member, role) in groupings {
      enforcer
        .add_grouping_policy(vec![member.to_string(), role.to_string()])
        .await?;
    }
    enforcer.build_role_links()?;
    Ok(Self { enforcer })
  }

  pub fn enforce(&self, sub: &str, obj: &str, act: &str) -> Result<bool> {
    Ok(self.enforcer.enforce((sub, obj, act))?)
  }

  /// Roles the enforcer currently groups `sub` into, one hop.
  pub fn roles_for(&mut self, sub: &str) -> Vec<String> {
    self.enforcer.get_roles_for_user(sub, None)
  }

  pub async fn add_role_for_user(
    &mut self,
    user: &str,
    role: &str,
  ) -> Result<()> {
    debug!(user, role, "adding enforcer role grouping");
    self.enforcer.add_role_for_user(user, role, None).await?;
    Ok(())
  }

  pub async fn delete_role_for_user(
    &mut self,
    user: &str,
    role: &str,
  ) -> Result<()> {
    debug!(user, role, "removing enforcer role grouping");
    self.enforcer.delete_role_for_user(user, role, None).await?;
    Ok(())
  }

  /// Depth-first closure of the role hierarchy starting from `seeds`.
  /// The seeds themselves are part of the result; a `seen` set guards
  /// against grouping cycles.
  pub fn expand_roles(&mut self, seeds: &BTreeSet<String>) -> BTreeSet<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut stack: Vec<String> = seeds.iter().cloned().collect();

    while let Some(role) = stack.pop() {
      if !seen.insert(role.clone()) {
        continue;
      }
      for parent in self.enforcer.get_roles_for_user(&role, None) {
        if !seen.contains(&parent) {
          stack.push(parent);
        }
      }
    }
    seen
  }
}
