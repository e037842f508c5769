//! Integration tests for the repositories against an in-memory database.

use roster_core::{
  participant::{
    Participant, ParticipantPatch, ParticipantState, ParticipantType,
  },
  relation::{NewRelation, RelationType},
};
use rusqlite::Connection;

use crate::{
  Error, FetchOpts, Key, ParticipantRepository, RelationRepository, bootstrap,
  schema,
};

fn conn() -> Connection {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
  let c = Connection::open_in_memory().expect("in-memory database");
  schema::init(&c, "").expect("schema");
  c
}

fn grant(
  relations: &RelationRepository<'_>,
  source: &Participant,
  target: &Participant,
) {
  relations
    .create(NewRelation::new(
      source.id,
      target.id,
      RelationType::Grant,
      "SYSTEM",
    ))
    .unwrap();
}

// ─── Participants ────────────────────────────────────────────────────────────

#[test]
fn create_uppercases_name_and_reads_back() {
  let c = conn();
  let repo = ParticipantRepository::new(&c, "");

  let p = repo.add_user("einstein", "Albert Einstein", "system").unwrap();
  assert_eq!(p.name, "EINSTEIN");
  assert_eq!(p.created_by, "SYSTEM");
  assert_eq!(p.state, ParticipantState::Active);
  assert_eq!(p.update_count, 0);
  assert!(p.updated_by.is_none());

  // Lookup is case-insensitive on the caller side.
  let fetched = repo
    .get_by_name("  einstein ", ParticipantType::Human, FetchOpts::default())
    .unwrap()
    .unwrap();
  assert_eq!(fetched.id, p.id);
}

#[test]
fn natural_keys_are_unique_per_type() {
  let c = conn();
  let repo = ParticipantRepository::new(&c, "");

  repo.add_user("EINSTEIN", "Albert Einstein", "SYSTEM").unwrap();
  let err =
    repo.add_user("einstein", "Someone Else", "SYSTEM").unwrap_err();
  assert!(err.is_constraint_violation());

  let err = repo
    .add_user("EINSTEIN2", "Albert Einstein", "SYSTEM")
    .unwrap_err();
  assert!(err.is_constraint_violation());

  // Same name under a different type is fine.
  repo.add_role("EINSTEIN", "Einstein Role", "SYSTEM").unwrap();
}

#[test]
fn null_state_reads_as_active() {
  let c = conn();
  let repo = ParticipantRepository::new(&c, "");
  let p = repo.add_user("BOHR", "Niels Bohr", "SYSTEM").unwrap();

  let stored: Option<String> = c
    .query_row("SELECT state FROM participants WHERE id = ?1", [p.id], |r| {
      r.get(0)
    })
    .unwrap();
  assert!(stored.is_none());
  assert!(p.is_active());
  assert_eq!(
    repo.exists(Key::Id(p.id), ParticipantType::Human).unwrap(),
    Some(ParticipantState::Active)
  );
}

#[test]
fn exists_probes_by_each_key() {
  let c = conn();
  let repo = ParticipantRepository::new(&c, "");
  let p = repo.add_user("CURIE", "Marie Curie", "SYSTEM").unwrap();

  assert!(
    repo
      .exists(Key::Name("curie"), ParticipantType::Human)
      .unwrap()
      .is_some()
  );
  assert!(
    repo
      .exists(Key::DisplayName("Marie Curie"), ParticipantType::Human)
      .unwrap()
      .is_some()
  );
  // Wrong type misses for name keys, id ignores the type.
  assert!(
    repo
      .exists(Key::Name("CURIE"), ParticipantType::Role)
      .unwrap()
      .is_none()
  );
  assert!(
    repo
      .exists(Key::Id(p.id), ParticipantType::Role)
      .unwrap()
      .is_some()
  );
}

#[test]
fn get_all_orders_by_display_name_and_filters_terminated() {
  let c = conn();
  let repo = ParticipantRepository::new(&c, "");

  let z = repo.add_user("ZWICKY", "Zwicky", "SYSTEM").unwrap();
  repo.add_user("ABEL", "Abel", "SYSTEM").unwrap();
  repo.add_user("NOETHER", "Noether", "SYSTEM").unwrap();
  repo.terminate_participant(z.id, "SYSTEM").unwrap();

  let all = repo
    .get_all(ParticipantType::Human, FetchOpts::default(), false)
    .unwrap();
  let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
  assert_eq!(names, ["ABEL", "NOETHER", "ZWICKY"]);

  let active = repo
    .get_all(ParticipantType::Human, FetchOpts::default(), true)
    .unwrap();
  assert_eq!(active.len(), 2);
  assert!(active.iter().all(Participant::is_active));
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[test]
fn update_stamps_audit_fields_and_bumps_update_count() {
  let c = conn();
  let repo = ParticipantRepository::new(&c, "");
  let p = repo.add_user("DIRAC", "Paul Dirac", "SYSTEM").unwrap();

  let mut patch = ParticipantPatch::new("editor");
  patch.email = Some(Some("paul.dirac@cam.ac.uk".into()));
  let updated = repo.update(p.id, patch).unwrap();

  assert_eq!(updated.email.as_deref(), Some("paul.dirac@cam.ac.uk"));
  // Untouched fields keep their values.
  assert_eq!(updated.display_name, "Paul Dirac");
  assert_eq!(updated.created_by, "SYSTEM");
  assert_eq!(updated.update_count, 1);
  assert_eq!(updated.updated_by.as_deref(), Some("EDITOR"));
  assert!(updated.updated_timestamp.is_some());

  // Clearing via the double Option.
  let mut patch = ParticipantPatch::new("EDITOR");
  patch.email = Some(None);
  let updated = repo.update(p.id, patch).unwrap();
  assert!(updated.email.is_none());
  assert_eq!(updated.update_count, 2);
}

#[test]
fn update_with_stale_count_is_rejected() {
  let c = conn();
  let repo = ParticipantRepository::new(&c, "");
  let p = repo.add_user("PAULI", "Wolfgang Pauli", "SYSTEM").unwrap();

  let mut patch = ParticipantPatch::new("EDITOR");
  patch.display_name = Some("W. Pauli".into());
  patch.expected_update_count = Some(0);
  repo.update(p.id, patch).unwrap();

  // Second writer still holds update_count 0.
  let mut stale = ParticipantPatch::new("EDITOR");
  stale.display_name = Some("Wolfgang E. Pauli".into());
  stale.expected_update_count = Some(0);
  let err = repo.update(p.id, stale).unwrap_err();
  assert!(matches!(err, Error::StaleUpdate { expected: 0, .. }));

  // The losing write changed nothing.
  let row = repo.get_by_id(p.id, FetchOpts::default()).unwrap().unwrap();
  assert_eq!(row.display_name, "W. Pauli");
  assert_eq!(row.update_count, 1);

  let err = repo
    .update(9999, ParticipantPatch::new("EDITOR"))
    .unwrap_err();
  assert!(matches!(err, Error::ParticipantNotFound(9999)));
}

#[test]
fn system_account_state_is_immutable() {
  let c = conn();
  bootstrap::initialize(&c, "").unwrap();
  let repo = ParticipantRepository::new(&c, "");

  let system = repo
    .get_by_name("SYSTEM", ParticipantType::System, FetchOpts::default())
    .unwrap()
    .unwrap();
  let after = repo.terminate_participant(system.id, "EDITOR").unwrap();
  assert!(after.is_active());
  assert_eq!(after.update_count, system.update_count);

  // Other participants do transition, both ways.
  let p = repo.add_user("FERMI", "Enrico Fermi", "SYSTEM").unwrap();
  let p = repo.terminate_participant(p.id, "EDITOR").unwrap();
  assert_eq!(p.state, ParticipantState::Terminated);
  let p = repo.activate_participant(p.id, "EDITOR").unwrap();
  assert!(p.is_active());
}

// ─── Relations ───────────────────────────────────────────────────────────────

#[test]
fn traversal_hides_terminated_far_ends() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let user = participants.add_user("LOVELACE", "Ada", "SYSTEM").unwrap();
  let live = participants.add_role("READER", "Reader", "SYSTEM").unwrap();
  let dead = participants.add_role("WRITER", "Writer", "SYSTEM").unwrap();
  grant(&relations, &user, &live);
  grant(&relations, &user, &dead);
  participants.terminate_participant(dead.id, "SYSTEM").unwrap();

  let outgoing = relations.get(user.id, &[RelationType::Grant]).unwrap();
  assert_eq!(outgoing.len(), 1);
  assert_eq!(outgoing[0].participant.name, "READER");
  // ...and the reverse direction carries the source.
  let incoming = relations.get_reverse(live.id, &[RelationType::Grant]).unwrap();
  assert_eq!(incoming.len(), 1);
  assert_eq!(incoming[0].participant.name, "LOVELACE");

  // Reactivation brings the hidden edge back.
  participants.activate_participant(dead.id, "SYSTEM").unwrap();
  assert_eq!(relations.get(user.id, &[RelationType::Grant]).unwrap().len(), 2);
  participants.terminate_participant(dead.id, "SYSTEM").unwrap();

  // Reverse: the edge from a terminated source disappears too.
  participants.terminate_participant(user.id, "SYSTEM").unwrap();
  assert!(relations.get_reverse(live.id, &[]).unwrap().is_empty());

  // The edge rows themselves survive termination.
  assert!(relations.exists(user.id, dead.id, RelationType::Grant).unwrap());
}

#[test]
fn duplicate_edges_error_or_are_swallowed() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let user = participants.add_user("HOPPER", "Grace", "SYSTEM").unwrap();
  let role = participants.add_role("ADMIN", "Admin", "SYSTEM").unwrap();
  let edge = NewRelation::new(user.id, role.id, RelationType::Grant, "SYSTEM");

  relations.create(edge.clone()).unwrap();
  assert!(relations.create(edge.clone()).unwrap_err().is_constraint_violation());
  assert!(relations.create_if_absent(edge).unwrap().is_none());
  assert_eq!(relations.get(user.id, &[RelationType::Grant]).unwrap().len(), 1);

  // Same endpoints under a different type is a distinct edge.
  relations
    .create(NewRelation::new(
      user.id,
      role.id,
      RelationType::MemberOf,
      "SYSTEM",
    ))
    .unwrap();
}

#[test]
fn delete_is_strict_and_delete_all_sweeps_both_directions() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let a = participants.add_user("TURING", "Alan", "SYSTEM").unwrap();
  let b = participants.add_role("ORACLE", "Oracle", "SYSTEM").unwrap();
  grant(&relations, &a, &b);

  relations.delete(a.id, b.id, RelationType::Grant).unwrap();
  let err = relations.delete(a.id, b.id, RelationType::Grant).unwrap_err();
  assert!(matches!(err, Error::RelationNotFound));

  grant(&relations, &a, &b);
  relations
    .create(NewRelation::new(b.id, a.id, RelationType::ProxyOf, "SYSTEM"))
    .unwrap();
  assert_eq!(relations.delete_all(a.id).unwrap(), 2);
  assert!(relations.get(a.id, &[]).unwrap().is_empty());
}

#[test]
fn deleting_a_participant_cascades_to_its_edges() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let user = participants.add_user("SHANNON", "Claude", "SYSTEM").unwrap();
  let role = participants.add_role("CODER", "Coder", "SYSTEM").unwrap();
  grant(&relations, &user, &role);

  c.execute("DELETE FROM participants WHERE id = ?1", [role.id])
    .unwrap();
  assert!(!relations.exists(user.id, role.id, RelationType::Grant).unwrap());
}

#[test]
fn view_resolves_both_endpoints() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let user = participants.add_user("KNUTH", "Donald", "SYSTEM").unwrap();
  let role = participants.add_role("AUTHOR", "Author", "SYSTEM").unwrap();
  grant(&relations, &user, &role);
  participants.terminate_participant(user.id, "SYSTEM").unwrap();

  let rows = relations.snapshot().unwrap();
  assert_eq!(rows.len(), 1);
  let row = &rows[0];
  assert_eq!(row.source_name, "KNUTH");
  assert_eq!(row.source_state, "TERMINATED");
  assert_eq!(row.target_name, "AUTHOR");
  assert_eq!(row.target_state, "ACTIVE");
  assert_eq!(row.relation_type, RelationType::Grant);
}

// ─── Effective roles ─────────────────────────────────────────────────────────

#[test]
fn effective_roles_union_one_hop() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let user = participants.add_user("GAUSS", "Carl Gauss", "SYSTEM").unwrap();
  let direct = participants.add_role("READER", "Reader", "SYSTEM").unwrap();
  let via_org = participants.add_role("MEMBER", "Member", "SYSTEM").unwrap();
  let via_proxy =
    participants.add_role("APPROVER", "Approver", "SYSTEM").unwrap();
  let org = participants.add_org("MATH", "Mathematics", "SYSTEM").unwrap();
  let boss = participants.add_user("EULER", "Leonhard", "SYSTEM").unwrap();

  grant(&relations, &user, &direct);
  relations
    .create(NewRelation::new(
      user.id,
      org.id,
      RelationType::MemberOf,
      "SYSTEM",
    ))
    .unwrap();
  grant(&relations, &org, &via_org);
  relations
    .create(NewRelation::new(
      user.id,
      boss.id,
      RelationType::ProxyOf,
      "SYSTEM",
    ))
    .unwrap();
  grant(&relations, &boss, &via_proxy);

  // A second hop that must NOT contribute: the org's own org unit.
  let parent_org =
    participants.add_org("SCIENCE", "Science", "SYSTEM").unwrap();
  let via_parent =
    participants.add_role("DEAN", "Dean", "SYSTEM").unwrap();
  relations
    .create(NewRelation::new(
      org.id,
      parent_org.id,
      RelationType::MemberOf,
      "SYSTEM",
    ))
    .unwrap();
  grant(&relations, &parent_org, &via_parent);

  let hydrated = participants
    .get_by_id(user.id, FetchOpts::relations())
    .unwrap()
    .unwrap();
  let effective: Vec<_> =
    hydrated.effective_roles.iter().map(String::as_str).collect();
  assert_eq!(effective, ["APPROVER", "MEMBER", "READER"]);
}

#[test]
fn effective_roles_drop_terminated_intermediaries() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let user = participants.add_user("PLANCK", "Max Planck", "SYSTEM").unwrap();
  let org = participants.add_org("PHYSICS", "Physics", "SYSTEM").unwrap();
  let role = participants.add_role("FELLOW", "Fellow", "SYSTEM").unwrap();
  relations
    .create(NewRelation::new(
      user.id,
      org.id,
      RelationType::MemberOf,
      "SYSTEM",
    ))
    .unwrap();
  grant(&relations, &org, &role);

  let hydrated = participants
    .get_by_id(user.id, FetchOpts::relations())
    .unwrap()
    .unwrap();
  assert!(hydrated.effective_roles.contains("FELLOW"));

  participants.terminate_participant(org.id, "SYSTEM").unwrap();
  let hydrated = participants
    .get_by_id(user.id, FetchOpts::relations())
    .unwrap()
    .unwrap();
  assert!(hydrated.effective_roles.is_empty());
}

#[test]
fn proxies_hydrate_the_reverse_direction() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");
  let relations = RelationRepository::new(&c, "");

  let boss = participants.add_user("BOSS", "The Boss", "SYSTEM").unwrap();
  let deputy = participants.add_user("DEPUTY", "Deputy", "SYSTEM").unwrap();
  relations
    .create(NewRelation::new(
      deputy.id,
      boss.id,
      RelationType::ProxyOf,
      "SYSTEM",
    ))
    .unwrap();

  let boss = participants
    .get_by_id(boss.id, FetchOpts::all())
    .unwrap()
    .unwrap();
  assert_eq!(boss.proxies.len(), 1);
  assert_eq!(boss.proxies[0].name, "DEPUTY");
  assert!(boss.proxy_of.is_empty());

  let deputy = participants
    .get_by_id(deputy.id, FetchOpts::all())
    .unwrap()
    .unwrap();
  assert_eq!(deputy.proxy_of.len(), 1);
  assert!(deputy.proxies.is_empty());
}

#[test]
fn grant_hydrates_roles_and_effective_roles() {
  let c = conn();
  let participants = ParticipantRepository::new(&c, "");

  let einstein = participants
    .add_user("EINSTEIN", "Einstein, Albert", "SYSTEM")
    .unwrap();
  let admin = participants
    .add_role("ADMINISTRATOR", "Administrator", "SYSTEM")
    .unwrap();
  participants
    .add_relation(einstein.id, admin.id, RelationType::Grant, "SYSTEM")
    .unwrap();

  let einstein = participants
    .get_by_name("EINSTEIN", ParticipantType::Human, FetchOpts::relations())
    .unwrap()
    .unwrap();
  assert_eq!(einstein.roles.len(), 1);
  assert_eq!(einstein.roles[0].name, "ADMINISTRATOR");
  let effective: Vec<_> =
    einstein.effective_roles.iter().map(String::as_str).collect();
  assert_eq!(effective, ["ADMINISTRATOR"]);
}

// ─── Bootstrap ───────────────────────────────────────────────────────────────

#[test]
fn bootstrap_seeds_once() {
  let c = Connection::open_in_memory().unwrap();
  assert!(bootstrap::initialize(&c, "").unwrap());
  assert!(!bootstrap::initialize(&c, "").unwrap());

  let repo = ParticipantRepository::new(&c, "");
  let system = repo
    .get_by_name("SYSTEM", ParticipantType::System, FetchOpts::default())
    .unwrap()
    .unwrap();
  assert!(system.is_system());

  let roles = repo
    .get_all(ParticipantType::Role, FetchOpts::default(), true)
    .unwrap();
  let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
  assert_eq!(names, ["ADMINISTRATOR", "PUBLIC", "USER_ADMINISTRATOR"]);
}

#[test]
fn prefixed_schema_namespaces_tables() {
  let c = Connection::open_in_memory().unwrap();
  bootstrap::initialize(&c, "rst_").unwrap();

  let repo = ParticipantRepository::new(&c, "rst_");
  assert!(
    repo
      .exists(Key::Name("PUBLIC"), ParticipantType::Role)
      .unwrap()
      .is_some()
  );
  // Unprefixed tables were never created.
  assert!(
    c.prepare("SELECT COUNT(*) FROM participants").is_err()
  );
}
