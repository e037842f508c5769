//! The application-role catalog the policy rules are written against.

use std::collections::BTreeSet;

/// Implicit role held by every authenticated participant.
pub const PUBLIC_ROLE: &str = "PUBLIC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRole {
  Administrator,
  UserAdministrator,
  UserRead,
  UserWrite,
  RoleRead,
  RoleWrite,
  OrgUnitRead,
  OrgUnitWrite,
}

/// Every application role, for iteration.
pub const APP_ROLE_CATALOG: [AppRole; 8] = [
  AppRole::Administrator,
  AppRole::UserAdministrator,
  AppRole::UserRead,
  AppRole::UserWrite,
  AppRole::RoleRead,
  AppRole::RoleWrite,
  AppRole::OrgUnitRead,
  AppRole::OrgUnitWrite,
];

impl AppRole {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Administrator => "ADMINISTRATOR",
      Self::UserAdministrator => "USER_ADMINISTRATOR",
      Self::UserRead => "USER_READ",
      Self::UserWrite => "USER_WRITE",
      Self::RoleRead => "ROLE_READ",
      Self::RoleWrite => "ROLE_WRITE",
      Self::OrgUnitRead => "ORG_UNIT_READ",
      Self::OrgUnitWrite => "ORG_UNIT_WRITE",
    }
  }
}

/// The application roles a set of granted role names amounts to. PUBLIC
/// is always included, and a granted ADMINISTRATOR implies the whole
/// catalog.
pub fn effective_app_roles(roles: &BTreeSet<String>) -> BTreeSet<String> {
  let mut effective = roles.clone();
  effective.insert(PUBLIC_ROLE.to_owned());
  if roles.contains(AppRole::Administrator.as_str()) {
    for role in APP_ROLE_CATALOG {
      effective.insert(role.as_str().to_owned());
    }
  }
  effective
}
