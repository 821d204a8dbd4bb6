//! Resource Store (C5) — owns Benchmark/Artifact/Episode rows exclusively.
//!
//! Each resource kind is an `RwLock<HashMap<id, T>>` collection flushed to
//! its own JSON file under the configured data directory, the same
//! load-on-open/flush-on-write shape as the teacher's `SessionStore`.
//! Authorization is delegated to `rlreg-rights`; list queries push the
//! authorization predicate into the Filter Engine rather than filtering
//! after the fact, so pagination stays correct.

mod artifacts;
mod benchmarks;
mod episodes;
mod listing;

pub use artifacts::StoredArtifact;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::info;

use rlreg_domain::error::Result;
use rlreg_domain::resource::{ArtifactMetadataItem, Benchmark, EpisodeItem};

pub struct ResourceStore {
    dir: PathBuf,
    benchmarks: RwLock<HashMap<String, Benchmark>>,
    artifacts_meta: RwLock<HashMap<String, ArtifactMetadataItem>>,
    episodes: RwLock<HashMap<String, EpisodeItem>>,
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    } else {
        Ok(T::default())
    }
}

fn flush<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

impl ResourceStore {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        std::fs::create_dir_all(dir.join("artifacts_blob"))?;

        let benchmarks: HashMap<String, Benchmark> = load_or_default(&dir.join("benchmarks.json"))?;
        let artifacts_meta: HashMap<String, ArtifactMetadataItem> =
            load_or_default(&dir.join("artifacts_meta.json"))?;
        let episodes: HashMap<String, EpisodeItem> = load_or_default(&dir.join("episodes.json"))?;

        info!(
            benchmarks = benchmarks.len(),
            artifacts = artifacts_meta.len(),
            episodes = episodes.len(),
            "resource store loaded"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            benchmarks: RwLock::new(benchmarks),
            artifacts_meta: RwLock::new(artifacts_meta),
            episodes: RwLock::new(episodes),
        })
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

    fn flush_benchmarks(&self) -> Result<()> {
        flush(&self.benchmarks_path(), &*self.benchmarks.read())
    }
    fn flush_artifacts_meta(&self) -> Result<()> {
        flush(&self.artifacts_meta_path(), &*self.artifacts_meta.read())
    }
    fn flush_episodes(&self) -> Result<()> {
        flush(&self.episodes_path(), &*self.episodes.read())
    }

    /// Deletion cascade for `delete_user`: removes every benchmark,
    /// artifact, and episode the user created whose `published_in` is
    /// empty or contains only their own personal group. Publicly
    /// published resources survive, still attributed to `username`.
    pub fn purge_private_resources_for_user(&self, username: &str) -> Result<()> {
        let is_private = |published_in: &std::collections::BTreeSet<String>| {
            published_in.is_empty() || published_in.iter().all(|g| g == username)
        };

        let mut benchmarks = self.benchmarks.write();
        let doomed_benchmarks: Vec<String> = benchmarks
            .values()
            .filter(|b| b.created_by == username && is_private(&b.published_in))
            .map(|b| b.id.clone())
            .collect();
        for id in &doomed_benchmarks {
            benchmarks.remove(id);
        }
        drop(benchmarks);

        let mut episodes = self.episodes.write();
        episodes.retain(|_, e| {
            let owned_by_user = e.header.created_by == username && is_private(&e.header.published_in);
            let orphaned_by_benchmark = doomed_benchmarks.contains(&e.header.benchmark_id);
            !(owned_by_user || orphaned_by_benchmark)
        });
        drop(episodes);

        let mut artifacts_meta = self.artifacts_meta.write();
        let doomed_artifacts: Vec<String> = artifacts_meta
            .values()
            .filter(|a| a.created_by == username && is_private(&a.published_in))
            .map(|a| a.id.clone())
            .collect();
        for id in &doomed_artifacts {
            artifacts_meta.remove(id);
        }
        drop(artifacts_meta);
        for id in &doomed_artifacts {
            let _ = std::fs::remove_file(self.blob_path(id));
        }

        self.flush_benchmarks()?;
        self.flush_episodes()?;
        self.flush_artifacts_meta()
    }

    /// Deleting a group removes it from every resource's `published_in`
    /// too — publications in that scope become invisible, equivalent to
    /// unpublishing (spec.md §4.1, `delete_group`). The identity store
    /// owns the group row itself; this just scrubs the now-dangling
    /// scope name out of the resource store's publication sets.
    pub fn unpublish_from_deleted_group(&self, group: &str) -> Result<()> {
        let mut benchmarks = self.benchmarks.write();
        for b in benchmarks.values_mut() {
            b.published_in.remove(group);
        }
        drop(benchmarks);

        let mut artifacts_meta = self.artifacts_meta.write();
        for a in artifacts_meta.values_mut() {
            a.published_in.remove(group);
        }
        drop(artifacts_meta);

        let mut episodes = self.episodes.write();
        for e in episodes.values_mut() {
            e.header.published_in.remove(group);
        }
        drop(episodes);

        self.flush_benchmarks()?;
        self.flush_artifacts_meta()?;
        self.flush_episodes()
    }
}
