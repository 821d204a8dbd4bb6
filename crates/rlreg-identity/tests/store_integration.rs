//! Integration tests for the identity store — full round-trips across
//! users, roles, groups, and memberships without requiring a running
//! server.

use rlreg_domain::identity::{builtin_roles, GLOBAL_GROUP};
use rlreg_domain::rights::Right;
use rlreg_identity::IdentityStore;

fn store() -> (tempfile::TempDir, IdentityStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = IdentityStore::new(dir.path(), 8 * 1024).unwrap();
    (dir, store)
}

#[test]
fn creating_a_user_seeds_a_personal_group_and_global_guest_membership() {
    let (_dir, store) = store();
    let user = store.create_user("alice", "hunter2").unwrap();

    assert!(user.membership_in("alice").is_some());
    assert!(user.membership_in(GLOBAL_GROUP).is_some());

    let caller = store.build_caller("alice").unwrap();
    assert!(caller.rights_in_personal_group().contains(Right::BenchmarkCreate));
    assert!(caller.rights_in(GLOBAL_GROUP).contains(Right::BenchmarkRead));
    assert!(!caller.is_global_admin());
}

#[test]
fn duplicate_username_is_a_conflict() {
    let (_dir, store) = store();
    store.create_user("alice", "hunter2").unwrap();
    let err = store.create_user("alice", "different").unwrap_err();
    assert_eq!(err.kind(), rlreg_domain::error::ErrorKind::Conflict);
}

#[test]
fn authenticate_rejects_wrong_password_and_unknown_user() {
    let (_dir, store) = store();
    store.create_user("alice", "hunter2").unwrap();

    assert!(store.authenticate("alice", "hunter2").is_ok());
    assert!(store.authenticate("alice", "wrong").is_err());
    assert!(store.authenticate("bob", "whatever").is_err());
}

#[test]
fn deleting_a_role_strips_it_from_every_membership() {
    let (_dir, store) = store();
    store.create_user("alice", "hunter2").unwrap();
    store.create_user("bob", "password").unwrap();

    store
        .add_members(
            GLOBAL_GROUP,
            &[rlreg_domain::identity::MemberUpdate {
                user: "bob".into(),
                roles: std::collections::BTreeSet::from([builtin_roles::CONTRIBUTOR.to_string()]),
            }],
        )
        .unwrap();

    let bob = store.get_user("bob").unwrap();
    assert!(bob
        .membership_in(GLOBAL_GROUP)
        .unwrap()
        .roles
        .contains(builtin_roles::CONTRIBUTOR));

    store.delete_role(builtin_roles::CONTRIBUTOR).unwrap();

    let bob = store.get_user("bob").unwrap();
    assert!(!bob
        .membership_in(GLOBAL_GROUP)
        .unwrap()
        .roles
        .contains(builtin_roles::CONTRIBUTOR));
}

#[test]
fn deleting_a_group_removes_it_from_memberships_and_is_idempotent() {
    let (_dir, store) = store();
    store.create_user("alice", "hunter2").unwrap();
    store
        .create_group(
            rlreg_domain::identity::Group {
                name: "team-rl".into(),
                description: "shared scope".into(),
                created_by: "alice".into(),
            },
            "alice",
        )
        .unwrap();

    assert!(store.get_user("alice").unwrap().membership_in("team-rl").is_some());

    store.delete_group("team-rl").unwrap();
    assert!(store.get_user("alice").unwrap().membership_in("team-rl").is_none());

    // idempotent
    assert!(store.delete_group("team-rl").is_ok());
}

#[test]
fn global_group_cannot_be_deleted() {
    let (_dir, store) = store();
    let err = store.delete_group(GLOBAL_GROUP).unwrap_err();
    assert_eq!(err.kind(), rlreg_domain::error::ErrorKind::Forbidden);
}

#[test]
fn delete_user_is_idempotent() {
    let (_dir, store) = store();
    store.create_user("alice", "hunter2").unwrap();
    store.delete_user("alice").unwrap();
    assert!(store.delete_user("alice").is_ok());
    assert!(store.get_user("alice").is_err());
}

#[test]
fn grant_global_admin_unlocks_every_right() {
    let (_dir, store) = store();
    store.create_user("root", "hunter2").unwrap();
    store.grant_global_admin("root").unwrap();

    let caller = store.build_caller("root").unwrap();
    assert!(caller.is_global_admin());
}

#[test]
fn set_global_roles_rejects_unknown_role() {
    let (_dir, store) = store();
    store.create_user("alice", "hunter2").unwrap();
    let err = store
        .set_global_roles("alice", std::collections::BTreeSet::from(["not-a-role".to_string()]))
        .unwrap_err();
    assert_eq!(err.kind(), rlreg_domain::error::ErrorKind::NotFound);
}

#[test]
fn reopening_the_store_reloads_persisted_state() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = IdentityStore::new(dir.path(), 8 * 1024).unwrap();
        store.create_user("alice", "hunter2").unwrap();
    }
    let store = IdentityStore::new(dir.path(), 8 * 1024).unwrap();
    assert!(store.get_user("alice").is_ok());
}
