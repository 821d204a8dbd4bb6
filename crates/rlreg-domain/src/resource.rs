//! Benchmark / Artifact / Episode types owned by the Resource Store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Anything a caller can submit for rights evaluation: either a concrete
/// resource (its owner + publication scope) or a bare publication scope
/// for publish/unpublish actions.
pub trait Publishable {
    fn created_by(&self) -> &str;
    fn published_in(&self) -> &BTreeSet<String>;
}

// ── Benchmarks ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchmarkMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Payload for `create_benchmark`: everything the caller supplies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkQuery {
    pub hash: String,
    pub metadata: BenchmarkMetadata,
    pub serialized: String,
}

/// A stored benchmark, as returned by `load_benchmark`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    pub id: String,
    pub hash: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub metadata: BenchmarkMetadata,
    pub serialized: String,
    pub published_in: BTreeSet<String>,
}

impl Publishable for Benchmark {
    fn created_by(&self) -> &str {
        &self.created_by
    }
    fn published_in(&self) -> &BTreeSet<String> {
        &self.published_in
    }
}

/// A benchmark without its (potentially large) serialized payload, as
/// returned by `create_benchmark`/`list_benchmarks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkHeader {
    pub id: String,
    pub hash: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub metadata: BenchmarkMetadata,
    pub published_in: BTreeSet<String>,
}

impl From<&Benchmark> for BenchmarkHeader {
    fn from(b: &Benchmark) -> Self {
        BenchmarkHeader {
            id: b.id.clone(),
            hash: b.hash.clone(),
            created_by: b.created_by.clone(),
            created_at: b.created_at,
            metadata: b.metadata.clone(),
            published_in: b.published_in.clone(),
        }
    }
}

// ── Artifacts ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArtifactMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadataItem {
    pub id: String,
    pub hash: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub metadata: ArtifactMetadata,
    pub published_in: BTreeSet<String>,
}

impl Publishable for ArtifactMetadataItem {
    fn created_by(&self) -> &str {
        &self.created_by
    }
    fn published_in(&self) -> &BTreeSet<String> {
        &self.published_in
    }
}

// ── Episodes ─────────────────────────────────────────────────────────

/// One environment step. `state`/`action`/`info` are opaque JSON — the
/// storage layer never introspects them; only `metadata.*` keys on the
/// episode itself are reachable by the filter engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RLTuple {
    pub state: serde_json::Value,
    pub action: serde_json::Value,
    pub reward: f64,
    #[serde(default)]
    pub info: HashMap<String, serde_json::Value>,
    pub terminal: bool,
    pub timeout: bool,
}

/// Payload for `record_episode`: everything the caller supplies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub benchmark_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub tuples: Vec<RLTuple>,
}

/// A stored episode header (no tuples), as returned by `list_episodes`
/// when `include_tuples` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeHeader {
    pub id: String,
    pub benchmark_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub n_tuples: usize,
    pub terminated: bool,
    pub timeout: bool,
    pub published_in: BTreeSet<String>,
}

/// A stored episode with its full tuple list, as returned by
/// `list_episodes` when `include_tuples` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeItem {
    #[serde(flatten)]
    pub header: EpisodeHeader,
    pub tuples: Vec<RLTuple>,
}

impl Publishable for EpisodeHeader {
    fn created_by(&self) -> &str {
        &self.created_by
    }
    fn published_in(&self) -> &BTreeSet<String> {
        &self.published_in
    }
}
