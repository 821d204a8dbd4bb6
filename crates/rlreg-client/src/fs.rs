//! `FsBackend` — reads and writes a registry directory directly, without a
//! server or any authorization. Intended for single-user local workflows
//! (notebooks, offline dataset prep) where running a gateway is overkill.
//!
//! Layout mirrors `rlreg_store::ResourceStore`'s on-disk shape closely
//! enough that a directory written by one is readable by the other:
//! `<root>/benchmarks.json`, `<root>/artifacts_meta.json` +
//! `<root>/artifacts_blob/<id>.bin`, `<root>/episodes.json`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use rlreg_domain::error::{Error, Result};
use rlreg_domain::filter::Filter;
use rlreg_domain::resource::{
    ArtifactMetadata, ArtifactMetadataItem, Benchmark, BenchmarkHeader, BenchmarkQuery, Episode,
    EpisodeHeader, EpisodeItem,
};

use crate::{FetchedArtifact, RegistryClient};

const LOCAL_USER: &str = "local";

pub struct FsBackend {
    dir: PathBuf,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn load<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    } else {
        Ok(T::default())
    }
}

fn save<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

impl FsBackend {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        std::fs::create_dir_all(dir.join("artifacts_blob"))?;
        Ok(Self { dir })
    }

    fn benchmarks_path(&self) -> PathBuf {
        self.dir.join("benchmarks.json")
    }
    fn artifacts_meta_path(&self) -> PathBuf {
        self.dir.join("artifacts_meta.json")
    }
    fn episodes_path(&self) -> PathBuf {
        self.dir.join("episodes.json")
    }
    fn blob_path(&self, id: &str) -> PathBuf {
        self.dir.join("artifacts_blob").join(format!("{id}.bin"))
    }

    fn load_benchmarks(&self) -> Result<HashMap<String, Benchmark>> {
        load(&self.benchmarks_path())
    }
    fn load_artifacts(&self) -> Result<HashMap<String, ArtifactMetadataItem>> {
        load(&self.artifacts_meta_path())
    }
    fn load_episodes(&self) -> Result<HashMap<String, EpisodeItem>> {
        load(&self.episodes_path())
    }
}

fn matches(filter: &Option<Filter>, doc: &serde_json::Value) -> bool {
    match filter {
        Some(f) => rlreg_filter::evaluate(f, doc),
        None => true,
    }
}

#[async_trait]
impl RegistryClient for FsBackend {
    async fn create_benchmark(&self, query: BenchmarkQuery) -> Result<BenchmarkHeader> {
        let mut benchmarks = self.load_benchmarks()?;

        if let Some(existing) = benchmarks.values().find(|b| b.hash == query.hash) {
            return Ok(BenchmarkHeader::from(existing));
        }

        let benchmark = Benchmark {
            id: uuid::Uuid::new_v4().to_string(),
            hash: query.hash,
            created_by: LOCAL_USER.to_owned(),
            created_at: Utc::now(),
            metadata: query.metadata,
            serialized: query.serialized,
            published_in: BTreeSet::new(),
        };
        let header = BenchmarkHeader::from(&benchmark);
        benchmarks.insert(benchmark.id.clone(), benchmark);
        save(&self.benchmarks_path(), &benchmarks)?;
        Ok(header)
    }

    async fn load_benchmark(&self, id: &str) -> Result<Benchmark> {
        self.load_benchmarks()?
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("benchmark '{id}' not found")))
    }

    async fn list_benchmarks(&self, filter: Option<Filter>) -> Result<Vec<BenchmarkHeader>> {
        let benchmarks = self.load_benchmarks()?;
        let mut matched: Vec<BenchmarkHeader> = benchmarks
            .values()
            .filter(|b| matches(&filter, &serde_json::to_value(b).unwrap_or(serde_json::Value::Null)))
            .map(BenchmarkHeader::from)
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }

    async fn publish_benchmark(&self, id: &str, scope: &str) -> Result<()> {
        let mut benchmarks = self.load_benchmarks()?;
        let benchmark =
            benchmarks.get_mut(id).ok_or_else(|| Error::NotFound(format!("benchmark '{id}' not found")))?;
        benchmark.published_in.insert(scope.to_owned());
        save(&self.benchmarks_path(), &benchmarks)
    }

    async fn unpublish_benchmark(&self, id: &str, scope: &str) -> Result<()> {
        let mut benchmarks = self.load_benchmarks()?;
        let benchmark =
            benchmarks.get_mut(id).ok_or_else(|| Error::NotFound(format!("benchmark '{id}' not found")))?;
        benchmark.published_in.remove(scope);
        save(&self.benchmarks_path(), &benchmarks)
    }

    async fn delete_benchmark(&self, id: &str) -> Result<()> {
        let mut benchmarks = self.load_benchmarks()?;
        benchmarks.remove(id);
        save(&self.benchmarks_path(), &benchmarks)?;

        let mut episodes = self.load_episodes()?;
        episodes.retain(|_, e| e.header.benchmark_id != id);
        save(&self.episodes_path(), &episodes)
    }

    async fn upload_artifact(&self, bytes: &[u8], metadata: ArtifactMetadata) -> Result<ArtifactMetadataItem> {
        let mut artifacts = self.load_artifacts()?;
        let id = sha256_hex(bytes);

        if let Some(existing) = artifacts.get(&id) {
            return Ok(existing.clone());
        }

        let item = ArtifactMetadataItem {
            id: id.clone(),
            hash: id.clone(),
            created_by: LOCAL_USER.to_owned(),
            created_at: Utc::now(),
            metadata,
            published_in: BTreeSet::new(),
        };
        std::fs::write(self.blob_path(&id), bytes)?;
        artifacts.insert(id, item.clone());
        save(&self.artifacts_meta_path(), &artifacts)?;
        Ok(item)
    }

    async fn download_artifact(&self, id: &str) -> Result<FetchedArtifact> {
        let artifacts = self.load_artifacts()?;
        let meta = artifacts.get(id).cloned().ok_or_else(|| Error::NotFound(format!("artifact '{id}' not found")))?;
        let bytes = std::fs::read(self.blob_path(id))?;
        Ok(FetchedArtifact { meta, bytes })
    }

    async fn list_artifacts(&self, filter: Option<Filter>) -> Result<Vec<ArtifactMetadataItem>> {
        let artifacts = self.load_artifacts()?;
        let mut matched: Vec<ArtifactMetadataItem> = artifacts
            .values()
            .filter(|a| matches(&filter, &serde_json::to_value(a).unwrap_or(serde_json::Value::Null)))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }

    async fn publish_artifact(&self, id: &str, scope: &str) -> Result<()> {
        let mut artifacts = self.load_artifacts()?;
        let item = artifacts.get_mut(id).ok_or_else(|| Error::NotFound(format!("artifact '{id}' not found")))?;
        item.published_in.insert(scope.to_owned());
        save(&self.artifacts_meta_path(), &artifacts)
    }

    async fn unpublish_artifact(&self, id: &str, scope: &str) -> Result<()> {
        let mut artifacts = self.load_artifacts()?;
        let item = artifacts.get_mut(id).ok_or_else(|| Error::NotFound(format!("artifact '{id}' not found")))?;
        item.published_in.remove(scope);
        save(&self.artifacts_meta_path(), &artifacts)
    }

    async fn delete_artifact(&self, id: &str) -> Result<()> {
        let mut artifacts = self.load_artifacts()?;
        artifacts.remove(id);
        save(&self.artifacts_meta_path(), &artifacts)?;
        let _ = std::fs::remove_file(self.blob_path(id));
        Ok(())
    }

    async fn record_episode(&self, episode: Episode) -> Result<EpisodeHeader> {
        let mut episodes = self.load_episodes()?;
        let last_tuple = episode.tuples.last();
        let header = EpisodeHeader {
            id: uuid::Uuid::new_v4().to_string(),
            benchmark_id: episode.benchmark_id,
            created_by: LOCAL_USER.to_owned(),
            created_at: Utc::now(),
            metadata: episode.metadata,
            n_tuples: episode.tuples.len(),
            terminated: last_tuple.map(|t| t.terminal).unwrap_or(false),
            timeout: last_tuple.map(|t| t.timeout).unwrap_or(false),
            published_in: BTreeSet::new(),
        };
        let item = EpisodeItem { header: header.clone(), tuples: episode.tuples };
        episodes.insert(header.id.clone(), item);
        save(&self.episodes_path(), &episodes)?;
        Ok(header)
    }

    async fn list_episodes(&self, filter: Option<Filter>, include_tuples: bool) -> Result<Vec<EpisodeItem>> {
        let episodes = self.load_episodes()?;
        let mut matched: Vec<EpisodeItem> = episodes
            .values()
            .filter(|e| matches(&filter, &serde_json::to_value(&e.header).unwrap_or(serde_json::Value::Null)))
            .cloned()
            .map(|mut item| {
                if !include_tuples {
                    item.tuples.clear();
                }
                item
            })
            .collect();
        matched.sort_by(|a, b| a.header.id.cmp(&b.header.id));
        Ok(matched)
    }

    async fn publish_episode(&self, id: &str, scope: &str) -> Result<()> {
        let mut episodes = self.load_episodes()?;
        let item = episodes.get_mut(id).ok_or_else(|| Error::NotFound(format!("episode '{id}' not found")))?;
        item.header.published_in.insert(scope.to_owned());
        save(&self.episodes_path(), &episodes)
    }

    async fn unpublish_episode(&self, id: &str, scope: &str) -> Result<()> {
        let mut episodes = self.load_episodes()?;
        let item = episodes.get_mut(id).ok_or_else(|| Error::NotFound(format!("episode '{id}' not found")))?;
        item.header.published_in.remove(scope);
        save(&self.episodes_path(), &episodes)
    }

    async fn delete_episode(&self, id: &str) -> Result<()> {
        let mut episodes = self.load_episodes()?;
        episodes.remove(id);
        save(&self.episodes_path(), &episodes)
    }
}
