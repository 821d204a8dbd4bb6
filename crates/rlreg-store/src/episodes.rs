use chrono::Utc;
use uuid::Uuid;

use rlreg_domain::error::{Error, Result};
use rlreg_domain::filter::Filter;
use rlreg_domain::identity::Caller;
use rlreg_domain::resource::{Episode, EpisodeHeader, EpisodeItem};
use rlreg_domain::rights::Right;
use rlreg_rights::{authorize, authorize_scope, list_authorization};

use crate::benchmarks::can_delete;
use crate::listing::authorized_filter;
use crate::ResourceStore;

impl ResourceStore {
    /// Validates `benchmark_id` references an existing benchmark the
    /// caller can read, then derives `n_tuples`/`terminated`/`timeout`
    /// from the tuple list (tuple order is preserved as submitted).
    pub fn record_episode(&self, caller: Option<&Caller>, episode: Episode) -> Result<EpisodeHeader> {
        let caller = rlreg_rights::require_caller(caller)?;
        authorize_scope(Some(caller), Right::EpisodeCreate, &caller.username)?;

        let benchmark = self
            .benchmarks
            .read()
            .get(&episode.benchmark_id)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("benchmark '{}' does not exist", episode.benchmark_id)))?;
        authorize(Some(caller), Right::BenchmarkRead, &benchmark)?;

        let last = episode
            .tuples
            .last()
            .ok_or_else(|| Error::Validation("episode must contain at least one tuple".into()))?;
        let terminated = last.terminal;
        let timeout = last.timeout;

        let header = EpisodeHeader {
            id: Uuid::new_v4().to_string(),
            benchmark_id: episode.benchmark_id,
            created_by: caller.username.clone(),
            created_at: Utc::now(),
            metadata: episode.metadata,
            n_tuples: episode.tuples.len(),
            terminated,
            timeout,
            published_in: std::collections::BTreeSet::from([caller.username.clone()]),
        };

        let item = EpisodeItem { header: header.clone(), tuples: episode.tuples };
        self.episodes.write().insert(header.id.clone(), item);
        self.flush_episodes()?;
        Ok(header)
    }

    pub fn list_episodes(
        &self,
        caller: Option<&Caller>,
        filter: Option<Filter>,
        include_tuples: bool,
    ) -> Result<Vec<EpisodeItem>> {
        let caller = rlreg_rights::require_caller(caller)?;
        let auth = list_authorization(caller, Right::EpisodeRead);
        let combined = authorized_filter(caller, auth, filter);

        let episodes = self.episodes.read();
        let mut matches: Vec<EpisodeItem> = episodes
            .values()
            .filter(|e| {
                let doc = serde_json::to_value(&e.header).unwrap_or(serde_json::Value::Null);
                rlreg_filter::evaluate(&combined, &doc)
            })
            .map(|e| {
                if include_tuples {
                    e.clone()
                } else {
                    EpisodeItem { header: e.header.clone(), tuples: Vec::new() }
                }
            })
            .collect();
        matches.sort_by(|a, b| a.header.id.cmp(&b.header.id));
        Ok(matches)
    }

    pub fn delete_episode(&self, caller: Option<&Caller>, id: &str) -> Result<()> {
        let caller = rlreg_rights::require_caller(caller)?;
        let episode = match self.episodes.read().get(id).cloned() {
            Some(e) => e,
            None => return Ok(()),
        };

        if !can_delete(caller, &episode.header, Right::EpisodeDelete) {
            return Err(Error::Forbidden(format!(
                "caller '{}' lacks EPISODE_DELETE in every scope episode '{id}' is published in",
                caller.username
            )));
        }

        self.episodes.write().remove(id);
        self.flush_episodes()
    }

    /// An episode may only be published in a scope where its parent
    /// benchmark is also published.
    pub fn publish_episode(&self, caller: Option<&Caller>, id: &str, group: &str) -> Result<()> {
        authorize_scope(caller, Right::EpisodeCreate, group)?;

        let benchmark_id = self
            .episodes
            .read()
            .get(id)
            .map(|e| e.header.benchmark_id.clone())
            .ok_or_else(|| Error::NotFound(format!("episode '{id}' not found")))?;
        let benchmark_published = self
            .benchmarks
            .read()
            .get(&benchmark_id)
            .map(|b| b.published_in.contains(group))
            .unwrap_or(false);
        if !benchmark_published {
            return Err(Error::Validation(format!(
                "benchmark '{benchmark_id}' is not published in '{group}'"
            )));
        }

        let mut episodes = self.episodes.write();
        let episode = episodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("episode '{id}' not found")))?;
        episode.header.published_in.insert(group.to_string());
        drop(episodes);
        self.flush_episodes()
    }

    pub fn unpublish_episode(&self, caller: Option<&Caller>, id: &str, group: &str) -> Result<()> {
        authorize_scope(caller, Right::EpisodeDelete, group)?;
        let mut episodes = self.episodes.write();
        let episode = episodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("episode '{id}' not found")))?;
        episode.header.published_in.remove(group);
        drop(episodes);
        self.flush_episodes()
    }
}
