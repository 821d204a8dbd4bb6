//! Integration tests for the resource store — benchmarks, artifacts, and
//! episodes end-to-end, without a running server.

use std::collections::{BTreeSet, HashMap};

use rlreg_domain::identity::{builtin_roles, Caller, Membership, GLOBAL_GROUP};
use rlreg_domain::resource::{ArtifactMetadata, BenchmarkMetadata, BenchmarkQuery, Episode, RLTuple};
use rlreg_domain::rights::{Right, RightSet};
use rlreg_store::ResourceStore;

fn caller(username: &str, groups: &[(&str, &[Right])]) -> Caller {
    let mut rights_by_group = HashMap::new();
    let mut memberships = Vec::new();
    for (g, rights) in groups {
        rights_by_group.insert(g.to_string(), RightSet::from_rights(rights.iter().copied()));
        memberships.push(Membership { group_name: g.to_string(), roles: Default::default() });
    }
    Caller { username: username.to_string(), memberships, rights_by_group }
}

fn contributor(username: &str) -> Caller {
    caller(
        username,
        &[
            (username, &[Right::ArtifactRead, Right::ArtifactCreate, Right::ArtifactDelete,
                         Right::BenchmarkRead, Right::BenchmarkCreate, Right::BenchmarkDelete,
                         Right::EpisodeRead, Right::EpisodeCreate, Right::EpisodeDelete]),
            (GLOBAL_GROUP, &[Right::BenchmarkRead, Right::ArtifactRead, Right::EpisodeRead]),
        ],
    )
}

fn guest(username: &str) -> Caller {
    caller(username, &[(GLOBAL_GROUP, &[Right::BenchmarkRead, Right::ArtifactRead, Right::EpisodeRead])])
}

fn store() -> (tempfile::TempDir, ResourceStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::new(dir.path()).unwrap();
    (dir, store)
}

fn benchmark_query(hash: &str) -> BenchmarkQuery {
    BenchmarkQuery {
        hash: hash.to_string(),
        metadata: BenchmarkMetadata { name: "cartpole".into(), description: None, difficulty: Some("easy".into()), version: None },
        serialized: "opaque-blob".into(),
    }
}

#[test]
fn duplicate_benchmark_hash_published_elsewhere_is_a_conflict() {
    let (_dir, store) = store();
    let alice = contributor("alice");
    let bob = contributor("bob");

    let header = store.create_benchmark(Some(&alice), benchmark_query("H1")).unwrap();
    store.publish_benchmark(Some(&alice), &header.id, GLOBAL_GROUP).unwrap();

    let err = store.create_benchmark(Some(&bob), benchmark_query("H1")).unwrap_err();
    assert_eq!(err.kind(), rlreg_domain::error::ErrorKind::Conflict);
}

#[test]
fn guest_cannot_read_an_unpublished_benchmark() {
    let (_dir, store) = store();
    let admin = contributor("admin");
    let header = store.create_benchmark(Some(&admin), benchmark_query("H2")).unwrap();

    let bystander = guest("bystander");
    let err = store.load_benchmark(Some(&bystander), &header.id).unwrap_err();
    assert_eq!(err.kind(), rlreg_domain::error::ErrorKind::Forbidden);
}

#[test]
fn publish_then_list_makes_resource_visible_to_scoped_member() {
    let (_dir, store) = store();
    let admin = contributor("admin");
    let header = store.create_benchmark(Some(&admin), benchmark_query("H3")).unwrap();
    store.publish_benchmark(Some(&admin), &header.id, "team").unwrap();

    let alice = caller("alice", &[("team", &[Right::BenchmarkRead])]);
    let visible = store.list_benchmarks(Some(&alice), None).unwrap();
    assert!(visible.iter().any(|b| b.id == header.id));
}

#[test]
fn artifact_storage_is_content_addressed_and_idempotent() {
    let (_dir, store) = store();
    let alice = contributor("alice");
    let meta = ArtifactMetadata { name: "weights".into(), description: None };

    let first = store.store_artifact(Some(&alice), b"hello world", meta.clone()).unwrap();
    let second = store.store_artifact(Some(&alice), b"hello world", meta).unwrap();
    assert_eq!(first.id, second.id);

    let loaded = store.load_artifact(Some(&alice), &first.id).unwrap();
    assert_eq!(loaded.bytes, b"hello world");
}

fn sample_episode(benchmark_id: &str) -> Episode {
    Episode {
        benchmark_id: benchmark_id.to_string(),
        metadata: HashMap::new(),
        tuples: vec![
            RLTuple {
                state: serde_json::json!([0.0, 0.0]),
                action: serde_json::json!(1),
                reward: 1.0,
                info: HashMap::new(),
                terminal: false,
                timeout: false,
            },
            RLTuple {
                state: serde_json::json!([1.0, 0.0]),
                action: serde_json::json!(0),
                reward: 0.0,
                info: HashMap::new(),
                terminal: true,
                timeout: false,
            },
        ],
    }
}

#[test]
fn recording_an_episode_derives_terminated_and_n_tuples() {
    let (_dir, store) = store();
    let alice = contributor("alice");
    let benchmark = store.create_benchmark(Some(&alice), benchmark_query("H4")).unwrap();

    let header = store.record_episode(Some(&alice), sample_episode(&benchmark.id)).unwrap();
    assert_eq!(header.n_tuples, 2);
    assert!(header.terminated);
    assert!(!header.timeout);
}

#[test]
fn deleting_a_benchmark_cascades_to_its_episodes() {
    let (_dir, store) = store();
    let alice = contributor("alice");
    let benchmark = store.create_benchmark(Some(&alice), benchmark_query("H5")).unwrap();
    store.record_episode(Some(&alice), sample_episode(&benchmark.id)).unwrap();
    store.record_episode(Some(&alice), sample_episode(&benchmark.id)).unwrap();

    store.delete_benchmark(Some(&alice), &benchmark.id).unwrap();

    let remaining = store
        .list_episodes(Some(&alice), Some(rlreg_domain::filter::Filter::eq("benchmark_id", benchmark.id)), false)
        .unwrap();
    assert!(remaining.is_empty());
}

#[test]
fn episode_cannot_publish_beyond_its_benchmarks_publication() {
    let (_dir, store) = store();
    let alice = contributor("alice");
    let benchmark = store.create_benchmark(Some(&alice), benchmark_query("H6")).unwrap();
    let episode = store.record_episode(Some(&alice), sample_episode(&benchmark.id)).unwrap();

    let err = store.publish_episode(Some(&alice), &episode.id, "team").unwrap_err();
    assert_eq!(err.kind(), rlreg_domain::error::ErrorKind::Validation);

    store.publish_benchmark(Some(&alice), &benchmark.id, "team").unwrap();
    assert!(store.publish_episode(Some(&alice), &episode.id, "team").is_ok());
}

#[test]
fn delete_operations_are_idempotent_on_missing_ids() {
    let (_dir, store) = store();
    let alice = contributor("alice");
    assert!(store.delete_benchmark(Some(&alice), "does-not-exist").is_ok());
    assert!(store.delete_artifact(Some(&alice), "does-not-exist").is_ok());
    assert!(store.delete_episode(Some(&alice), "does-not-exist").is_ok());
}

#[test]
fn purge_private_resources_for_user_spares_published_content() {
    let (_dir, store) = store();
    let alice = contributor("alice");

    let private = store.create_benchmark(Some(&alice), benchmark_query("H7")).unwrap();
    let public = store.create_benchmark(Some(&alice), benchmark_query("H8")).unwrap();
    store.publish_benchmark(Some(&alice), &public.id, GLOBAL_GROUP).unwrap();

    store.purge_private_resources_for_user("alice").unwrap();

    assert!(store.load_benchmark(Some(&alice), &private.id).is_err());
    assert!(store.load_benchmark(Some(&alice), &public.id).is_ok());
}

#[test]
fn only_admin_content_admin_not_guest_defaults_can_create_content() {
    let (_dir, store) = store();
    let bystander = guest("bystander");
    let err = store.create_benchmark(Some(&bystander), benchmark_query("H9")).unwrap_err();
    assert_eq!(err.kind(), rlreg_domain::error::ErrorKind::Forbidden);
    let _ = builtin_roles::GUEST;
}
