use rlreg_client::{FsBackend, RegistryClient};
use rlreg_domain::filter::Filter;
use rlreg_domain::resource::{ArtifactMetadata, BenchmarkMetadata, BenchmarkQuery, Episode, RLTuple};

fn backend() -> (FsBackend, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsBackend::open(dir.path()).unwrap();
    (backend, dir)
}

#[tokio::test]
async fn creates_and_loads_benchmark() {
    let (backend, _dir) = backend();
    let header = backend
        .create_benchmark(BenchmarkQuery {
            hash: "abc123".into(),
            metadata: BenchmarkMetadata { name: "cartpole".into(), ..Default::default() },
            serialized: "{}".into(),
        })
        .await
        .unwrap();

    let loaded = backend.load_benchmark(&header.id).await.unwrap();
    assert_eq!(loaded.hash, "abc123");
    assert_eq!(loaded.metadata.name, "cartpole");
}

#[tokio::test]
async fn create_benchmark_is_idempotent_on_hash() {
    let (backend, _dir) = backend();
    let query = || BenchmarkQuery {
        hash: "dup".into(),
        metadata: BenchmarkMetadata { name: "a".into(), ..Default::default() },
        serialized: "{}".into(),
    };
    let first = backend.create_benchmark(query()).await.unwrap();
    let second = backend.create_benchmark(query()).await.unwrap();
    assert_eq!(first.id, second.id);

    let all = backend.list_benchmarks(None).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn publish_and_unpublish_round_trip() {
    let (backend, _dir) = backend();
    let header = backend
        .create_benchmark(BenchmarkQuery {
            hash: "h".into(),
            metadata: BenchmarkMetadata { name: "n".into(), ..Default::default() },
            serialized: "{}".into(),
        })
        .await
        .unwrap();

    backend.publish_benchmark(&header.id, "public").await.unwrap();
    let loaded = backend.load_benchmark(&header.id).await.unwrap();
    assert!(loaded.published_in.contains("public"));

    backend.unpublish_benchmark(&header.id, "public").await.unwrap();
    let loaded = backend.load_benchmark(&header.id).await.unwrap();
    assert!(!loaded.published_in.contains("public"));
}

#[tokio::test]
async fn upload_artifact_is_content_addressed() {
    let (backend, _dir) = backend();
    let meta = ArtifactMetadata { name: "weights".into(), description: None };
    let first = backend.upload_artifact(b"same bytes", meta.clone()).await.unwrap();
    let second = backend.upload_artifact(b"same bytes", meta).await.unwrap();
    assert_eq!(first.id, second.id);

    let fetched = backend.download_artifact(&first.id).await.unwrap();
    assert_eq!(fetched.bytes, b"same bytes");
}

#[tokio::test]
async fn records_and_lists_episodes_with_and_without_tuples() {
    let (backend, _dir) = backend();
    let benchmark = backend
        .create_benchmark(BenchmarkQuery {
            hash: "bh".into(),
            metadata: BenchmarkMetadata { name: "n".into(), ..Default::default() },
            serialized: "{}".into(),
        })
        .await
        .unwrap();

    let tuple = RLTuple {
        state: serde_json::json!({"x": 1}),
        action: serde_json::json!({"a": 0}),
        reward: 1.0,
        info: Default::default(),
        terminal: true,
        timeout: false,
    };
    let header = backend
        .record_episode(Episode { benchmark_id: benchmark.id.clone(), metadata: Default::default(), tuples: vec![tuple] })
        .await
        .unwrap();
    assert_eq!(header.n_tuples, 1);
    assert!(header.terminated);

    let with_tuples = backend.list_episodes(None, true).await.unwrap();
    assert_eq!(with_tuples[0].tuples.len(), 1);

    let without_tuples = backend.list_episodes(None, false).await.unwrap();
    assert_eq!(without_tuples[0].tuples.len(), 0);

    let filtered = backend
        .list_episodes(Some(Filter::eq("benchmark_id", benchmark.id.clone())), false)
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn delete_benchmark_cascades_to_its_episodes() {
    let (backend, _dir) = backend();
    let benchmark = backend
        .create_benchmark(BenchmarkQuery {
            hash: "bh2".into(),
            metadata: BenchmarkMetadata { name: "n".into(), ..Default::default() },
            serialized: "{}".into(),
        })
        .await
        .unwrap();
    backend
        .record_episode(Episode { benchmark_id: benchmark.id.clone(), metadata: Default::default(), tuples: vec![] })
        .await
        .unwrap();

    backend.delete_benchmark(&benchmark.id).await.unwrap();

    assert!(backend.load_benchmark(&benchmark.id).await.is_err());
    assert!(backend.list_episodes(None, false).await.unwrap().is_empty());
}
