//! Login resolution against the participant graph.
//!
//! An external identity provider has already authenticated the user; this
//! module decides what that identity amounts to inside the directory. The
//! flow is: look up the participant by uppercased uid, fold any naming
//! drift from the identity provider back into the row, expand the granted
//! roles through the policy hierarchy and sync them into the enforcer.

use roster_core::{
  participant::{
    NewParticipant, Participant, ParticipantPatch, ParticipantType,
    SYSTEM_NAME,
  },
  principal::{IdentityRecord, SessionPrincipal, is_manager_title},
  relation::RelationType,
};
use roster_store_sqlite::{FetchOpts, ParticipantRepository};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::{
  AccessControl, Result,
  roles::{PUBLIC_ROLE, effective_app_roles},
};

/// What a login attempt resolves to.
#[derive(Debug)]
pub enum LoginOutcome {
  /// Active participant found; the principal carries the synced roles.
  Authorized(SessionPrincipal),
  /// No participant, but the title suggests a manager; self-registration
  /// is offered. The principal holds only the PUBLIC effective role.
  PendingRegistration(SessionPrincipal),
  /// Terminated participant, or an unknown identity with no claim to
  /// registration.
  Denied,
}

/// Resolve an authenticated identity to a session.
pub async fn resolve_login(
  conn: &Connection,
  prefix: &str,
  access: &mut AccessControl,
  identity: &IdentityRecord,
) -> Result<LoginOutcome> {
  let username = identity.username();
  let participants = ParticipantRepository::new(conn, prefix);

  let found = participants.get_by_name(
    &username,
    ParticipantType::Human,
    FetchOpts::relations(),
  )?;
  let Some(participant) = found else {
    if is_manager_title(identity.title.as_deref()) {
      info!(%username, "unknown identity with management title, offering registration");
      let mut principal = principal_from_identity(identity);
      principal.effective_roles.insert(PUBLIC_ROLE.to_owned());
      return Ok(LoginOutcome::PendingRegistration(principal));
    }
    info!(%username, "unknown identity, denying login");
    return Ok(LoginOutcome::Denied);
  };

  if !participant.is_active() {
    info!(%username, "terminated participant, denying login");
    return Ok(LoginOutcome::Denied);
  }

  let participant =
    apply_identity_drift(&participants, participant, identity)?;

  let seeds = effective_app_roles(&participant.effective_roles);
  let expanded = access.expand_roles(&seeds);
  access.sync_roles(&username, &expanded).await?;

  Ok(LoginOutcome::Authorized(SessionPrincipal {
    username,
    display_name: participant.display_name.clone(),
    email: participant.email.clone(),
    title: identity.title.clone(),
    roles: participant.role_names(),
    effective_roles: expanded,
    org_units: participant
      .org_units
      .iter()
      .map(|org| org.name.clone())
      .collect(),
  }))
}

/// Fold changed naming attributes from the identity provider into the
/// stored participant. The update is stamped by the system account, not
/// by the user logging in.
fn apply_identity_drift(
  participants: &ParticipantRepository<'_>,
  participant: Participant,
  identity: &IdentityRecord,
) -> Result<Participant> {
  let mut patch = ParticipantPatch::new(SYSTEM_NAME);

  let display_name = identity.display_name.trim();
  if !display_name.is_empty() && display_name != participant.display_name {
    patch.display_name = Some(display_name.to_owned());
  }
  let email = identity.email.trim();
  if !email.is_empty() && participant.email.as_deref() != Some(email) {
    patch.email = Some(Some(email.to_owned()));
  }
  if patch.display_name.is_none() && patch.email.is_none() {
    return Ok(participant);
  }

  info!(name = %participant.name, "identity attributes drifted, updating participant");
  let id = participant.id;
  participants.update(id, patch)?;
  participants
    .get_by_id(id, FetchOpts::relations())?
    .ok_or(roster_store_sqlite::Error::ParticipantNotFound(id).into())
}

/// Finish self-registration: create the HUMAN participant and grant it
/// the PUBLIC role.
pub fn complete_registration(
  conn: &Connection,
  prefix: &str,
  identity: &IdentityRecord,
) -> Result<Participant> {
  let username = identity.username();
  let participants = ParticipantRepository::new(conn, prefix);

  let display_name = match identity.display_name.trim() {
    "" => username.as_str(),
    name => name,
  };
  let mut create =
    NewParticipant::human(&username, display_name, &username);
  if !identity.email.trim().is_empty() {
    create = create.with_email(identity.email.trim());
  }
  let participant = participants.create(create)?;

  match participants.get_by_name(
    PUBLIC_ROLE,
    ParticipantType::Role,
    FetchOpts::default(),
  )? {
    Some(public) => {
      participants.add_relation(
        participant.id,
        public.id,
        RelationType::Grant,
        &username,
      )?;
    },
    None => warn!("PUBLIC role does not exist, registering without it"),
  }

  info!(name = %participant.name, "registered new participant");
  participants
    .get_by_id(participant.id, FetchOpts::relations())?
    .ok_or(roster_store_sqlite::Error::ParticipantNotFound(participant.id).into())
}

fn principal_from_identity(identity: &IdentityRecord) -> SessionPrincipal {
  SessionPrincipal {
    username: identity.username(),
    display_name: identity.display_name.trim().to_owned(),
    email: match identity.email.trim() {
      "" => None,
      email => Some(email.to_owned()),
    },
    title: identity.title.clone(),
    ..SessionPrincipal::default()
  }
}
