use chrono::Utc;
use uuid::Uuid;

use rlreg_domain::error::{Error, Result};
use rlreg_domain::filter::Filter;
use rlreg_domain::identity::Caller;
use rlreg_domain::resource::{Benchmark, BenchmarkHeader, BenchmarkQuery};
use rlreg_domain::rights::Right;
use rlreg_rights::{authorize, authorize_scope, list_authorization};

use crate::listing::authorized_filter;
use crate::ResourceStore;

impl ResourceStore {
    /// Dedup by hash within the caller's visibility: succeeds (and reuses
    /// the existing row) if the only colliding hash belongs to the caller
    /// themself and is still private; fails with `conflict` if any
    /// existing benchmark with this hash is published beyond its own
    /// creator's personal group (someone else's public content, or the
    /// caller's own content already made public).
    pub fn create_benchmark(&self, caller: Option<&Caller>, query: BenchmarkQuery) -> Result<BenchmarkHeader> {
        let caller = rlreg_rights::require_caller(caller)?;
        authorize_scope(Some(caller), Right::BenchmarkCreate, &caller.username)?;

        let benchmarks = self.benchmarks.read();
        if let Some(existing) = benchmarks.values().find(|b| b.hash == query.hash) {
            let published_beyond_owner = existing.published_in.iter().any(|g| g != &existing.created_by);
            if published_beyond_owner {
                return Err(Error::Conflict(format!(
                    "benchmark with hash '{}' already published",
                    query.hash
                )));
            }
            if existing.created_by == caller.username {
                return Ok(BenchmarkHeader::from(existing));
            }
        }
        drop(benchmarks);

        let benchmark = Benchmark {
            id: Uuid::new_v4().to_string(),
            hash: query.hash,
            created_by: caller.username.clone(),
            created_at: Utc::now(),
            metadata: query.metadata,
            serialized: query.serialized,
            published_in: std::collections::BTreeSet::from([caller.username.clone()]),
        };
        let header = BenchmarkHeader::from(&benchmark);

        self.benchmarks.write().insert(benchmark.id.clone(), benchmark);
        self.flush_benchmarks()?;
        Ok(header)
    }

    pub fn load_benchmark(&self, caller: Option<&Caller>, id: &str) -> Result<Benchmark> {
        let benchmark = self
            .benchmarks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("benchmark '{id}' not found")))?;
        authorize(caller, Right::BenchmarkRead, &benchmark)?;
        Ok(benchmark)
    }

    pub fn list_benchmarks(&self, caller: Option<&Caller>, filter: Option<Filter>) -> Result<Vec<BenchmarkHeader>> {
        let caller = rlreg_rights::require_caller(caller)?;
        let auth = list_authorization(caller, Right::BenchmarkRead);
        let combined = authorized_filter(caller, auth, filter);

        let benchmarks = self.benchmarks.read();
        let mut matches: Vec<BenchmarkHeader> = benchmarks
            .values()
            .filter(|b| {
                let doc = serde_json::to_value(b).unwrap_or(serde_json::Value::Null);
                rlreg_filter::evaluate(&combined, &doc)
            })
            .map(BenchmarkHeader::from)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    /// Idempotent: a missing id is treated as an already-satisfied
    /// delete. Deleting a benchmark a caller can delete in every current
    /// publication scope (or owns) cascades to all of its episodes.
    pub fn delete_benchmark(&self, caller: Option<&Caller>, id: &str) -> Result<()> {
        let caller = rlreg_rights::require_caller(caller)?;
        let benchmark = match self.benchmarks.read().get(id).cloned() {
            Some(b) => b,
            None => return Ok(()),
        };

        if !can_delete(caller, &benchmark, Right::BenchmarkDelete) {
            return Err(Error::Forbidden(format!(
                "caller '{}' lacks BENCHMARK_DELETE in every scope benchmark '{id}' is published in",
                caller.username
            )));
        }

        self.benchmarks.write().remove(id);
        self.episodes.write().retain(|_, e| e.header.benchmark_id != id);

        self.flush_benchmarks()?;
        self.flush_episodes()
    }

    pub fn publish_benchmark(&self, caller: Option<&Caller>, id: &str, group: &str) -> Result<()> {
        authorize_scope(caller, Right::BenchmarkCreate, group)?;
        let mut benchmarks = self.benchmarks.write();
        let benchmark = benchmarks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("benchmark '{id}' not found")))?;
        benchmark.published_in.insert(group.to_string());
        drop(benchmarks);
        self.flush_benchmarks()
    }

    pub fn unpublish_benchmark(&self, caller: Option<&Caller>, id: &str, group: &str) -> Result<()> {
        authorize_scope(caller, Right::BenchmarkDelete, group)?;
        let mut benchmarks = self.benchmarks.write();
        let benchmark = benchmarks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("benchmark '{id}' not found")))?;
        benchmark.published_in.remove(group);
        drop(benchmarks);
        self.flush_benchmarks()
    }
}

/// Deletion requires the owner path or `right` in *every* current
/// publication scope, stricter than the single-scope-suffices rule for
/// reads/writes elsewhere in the rights evaluator.
pub(crate) fn can_delete(caller: &Caller, resource: &impl rlreg_domain::resource::Publishable, right: Right) -> bool {
    if caller.is_global_admin() {
        return true;
    }
    if resource.created_by() == caller.username && caller.rights_in_personal_group().contains(right) {
        return true;
    }
    let scopes = resource.published_in();
    !scopes.is_empty()
        && scopes
            .iter()
            .all(|g| caller.groups().any(|cg| cg == g) && caller.rights_in(g).contains(right))
}
