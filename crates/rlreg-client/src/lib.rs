//! Client Library (C7) — the one component spec.md leaves
//! implementation-defined. Two backends share a common trait: [`HttpBackend`]
//! talks to a running `rlreg-server` over HTTP, [`FsBackend`] reads and
//! writes a local directory directly, bypassing the network and all
//! authorization (single-user, trusted-filesystem use only).

pub mod fs;
pub mod http;

use async_trait::async_trait;

use rlreg_domain::error::Result;
use rlreg_domain::filter::Filter;
use rlreg_domain::resource::{
    ArtifactMetadata, ArtifactMetadataItem, Benchmark, BenchmarkHeader, BenchmarkQuery, Episode,
    EpisodeHeader, EpisodeItem,
};

pub use fs::FsBackend;
pub use http::HttpBackend;

/// An artifact's metadata plus its raw bytes, mirroring
/// `rlreg_store::StoredArtifact` without depending on the server crate.
pub struct FetchedArtifact {
    pub meta: ArtifactMetadataItem,
    pub bytes: Vec<u8>,
}

/// The operation surface common to every backend. Matches spec.md §6's
/// endpoint catalogue one-to-one, except `delete_benchmark_cascade`, which
/// spec.md §4.5 explicitly leaves to the client: "the client is responsible
/// for extracting those ids; the server exposes no such cascade."
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn create_benchmark(&self, query: BenchmarkQuery) -> Result<BenchmarkHeader>;
    async fn load_benchmark(&self, id: &str) -> Result<Benchmark>;
    async fn list_benchmarks(&self, filter: Option<Filter>) -> Result<Vec<BenchmarkHeader>>;
    async fn publish_benchmark(&self, id: &str, scope: &str) -> Result<()>;
    async fn unpublish_benchmark(&self, id: &str, scope: &str) -> Result<()>;
    async fn delete_benchmark(&self, id: &str) -> Result<()>;

    async fn upload_artifact(&self, bytes: &[u8], metadata: ArtifactMetadata) -> Result<ArtifactMetadataItem>;
    async fn download_artifact(&self, id: &str) -> Result<FetchedArtifact>;
    async fn list_artifacts(&self, filter: Option<Filter>) -> Result<Vec<ArtifactMetadataItem>>;
    async fn publish_artifact(&self, id: &str, scope: &str) -> Result<()>;
    async fn unpublish_artifact(&self, id: &str, scope: &str) -> Result<()>;
    async fn delete_artifact(&self, id: &str) -> Result<()>;

    async fn record_episode(&self, episode: Episode) -> Result<EpisodeHeader>;
    async fn list_episodes(&self, filter: Option<Filter>, include_tuples: bool) -> Result<Vec<EpisodeItem>>;
    async fn publish_episode(&self, id: &str, scope: &str) -> Result<()>;
    async fn unpublish_episode(&self, id: &str, scope: &str) -> Result<()>;
    async fn delete_episode(&self, id: &str) -> Result<()>;

    /// Deletes a benchmark and, when `delete_artifacts` is set, every
    /// artifact referenced by its serialized form — the cascade spec.md
    /// §4.5 deliberately keeps out of the server ("the client is
    /// responsible for extracting those ids; the server exposes no such
    /// cascade"). The benchmark is loaded first so its `serialized` field
    /// is still available to scan, since `delete_benchmark` removes the
    /// row (and its episodes) in one step.
    async fn delete_benchmark_cascade(&self, id: &str, delete_artifacts: bool) -> Result<()> {
        let artifact_ids = if delete_artifacts {
            let benchmark = self.load_benchmark(id).await?;
            extract_artifact_ids(&benchmark.serialized)
        } else {
            Vec::new()
        };

        self.delete_benchmark(id).await?;

        for artifact_id in artifact_ids {
            self.delete_artifact(&artifact_id).await?;
        }
        Ok(())
    }
}

/// Scans a benchmark's opaque `serialized` string for artifact
/// references. The serialized form is caller-defined JSON (spec.md §9:
/// "do not reimplement the benchmark hash server-side" — likewise the
/// client never assumes more than JSON structure here); the convention
/// is any `"artifact_id": "<id>"` field at any depth.
fn extract_artifact_ids(serialized: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(serialized) else {
        return Vec::new();
    };
    let mut ids = std::collections::BTreeSet::new();
    collect_artifact_ids(&value, &mut ids);
    ids.into_iter().collect()
}

fn collect_artifact_ids(value: &serde_json::Value, ids: &mut std::collections::BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map {
                if key == "artifact_id" {
                    if let Some(s) = v.as_str() {
                        ids.insert(s.to_owned());
                    }
                } else {
                    collect_artifact_ids(v, ids);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_artifact_ids(item, ids);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_artifact_ids_finds_nested_references() {
        let serialized = serde_json::json!({
            "env": "cartpole",
            "datasets": [
                {"artifact_id": "a1"},
                {"nested": {"artifact_id": "a2"}}
            ]
        })
        .to_string();
        let mut ids = extract_artifact_ids(&serialized);
        ids.sort();
        assert_eq!(ids, vec!["a1".to_string(), "a2".to_string()]);
    }

    #[test]
    fn extract_artifact_ids_on_non_json_is_empty() {
        assert!(extract_artifact_ids("not json").is_empty());
    }
}
