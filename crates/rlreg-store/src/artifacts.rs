use chrono::Utc;
use sha2::{Digest, Sha256};

use rlreg_domain::error::{Error, Result};
use rlreg_domain::filter::Filter;
use rlreg_domain::identity::Caller;
use rlreg_domain::resource::{ArtifactMetadata, ArtifactMetadataItem};
use rlreg_domain::rights::Right;
use rlreg_rights::{authorize, authorize_scope, list_authorization};

use crate::benchmarks::can_delete;
use crate::listing::authorized_filter;
use crate::ResourceStore;

/// An artifact's metadata plus its blob, as returned by `load_artifact`.
pub struct StoredArtifact {
    pub meta: ArtifactMetadataItem,
    pub bytes: Vec<u8>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl ResourceStore {
    /// Content-addressed: `id = hash = SHA-256(bytes)`. Storing identical
    /// bytes twice succeeds idempotently and returns the existing row.
    pub fn store_artifact(
        &self,
        caller: Option<&Caller>,
        bytes: &[u8],
        metadata: ArtifactMetadata,
    ) -> Result<ArtifactMetadataItem> {
        let caller = rlreg_rights::require_caller(caller)?;
        authorize_scope(Some(caller), Right::ArtifactCreate, &caller.username)?;

        let id = sha256_hex(bytes);
        if let Some(existing) = self.artifacts_meta.read().get(&id).cloned() {
            return Ok(existing);
        }

        let item = ArtifactMetadataItem {
            id: id.clone(),
            hash: id.clone(),
            created_by: caller.username.clone(),
            created_at: Utc::now(),
            metadata,
            published_in: std::collections::BTreeSet::from([caller.username.clone()]),
        };

        std::fs::write(self.blob_path(&id), bytes)?;
        self.artifacts_meta.write().insert(id, item.clone());
        self.flush_artifacts_meta()?;
        Ok(item)
    }

    pub fn load_artifact(&self, caller: Option<&Caller>, id: &str) -> Result<StoredArtifact> {
        let meta = self
            .artifacts_meta
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("artifact '{id}' not found")))?;
        authorize(caller, Right::ArtifactRead, &meta)?;

        let bytes = std::fs::read(self.blob_path(id))
            .map_err(|e| Error::Storage(format!("reading artifact blob '{id}': {e}")))?;
        Ok(StoredArtifact { meta, bytes })
    }

    pub fn list_artifacts(&self, caller: Option<&Caller>, filter: Option<Filter>) -> Result<Vec<ArtifactMetadataItem>> {
        let caller = rlreg_rights::require_caller(caller)?;
        let auth = list_authorization(caller, Right::ArtifactRead);
        let combined = authorized_filter(caller, auth, filter);

        let artifacts = self.artifacts_meta.read();
        let mut matches: Vec<ArtifactMetadataItem> = artifacts
            .values()
            .filter(|a| {
                let doc = serde_json::to_value(a).unwrap_or(serde_json::Value::Null);
                rlreg_filter::evaluate(&combined, &doc)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    pub fn delete_artifact(&self, caller: Option<&Caller>, id: &str) -> Result<()> {
        let caller = rlreg_rights::require_caller(caller)?;
        let meta = match self.artifacts_meta.read().get(id).cloned() {
            Some(m) => m,
            None => return Ok(()),
        };

        if !can_delete(caller, &meta, Right::ArtifactDelete) {
            return Err(Error::Forbidden(format!(
                "caller '{}' lacks ARTIFACT_DELETE in every scope artifact '{id}' is published in",
                caller.username
            )));
        }

        self.artifacts_meta.write().remove(id);
        let _ = std::fs::remove_file(self.blob_path(id));
        self.flush_artifacts_meta()
    }

    pub fn publish_artifact(&self, caller: Option<&Caller>, id: &str, group: &str) -> Result<()> {
        authorize_scope(caller, Right::ArtifactCreate, group)?;
        let mut artifacts = self.artifacts_meta.write();
        let meta = artifacts
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("artifact '{id}' not found")))?;
        meta.published_in.insert(group.to_string());
        drop(artifacts);
        self.flush_artifacts_meta()
    }

    pub fn unpublish_artifact(&self, caller: Option<&Caller>, id: &str, group: &str) -> Result<()> {
        authorize_scope(caller, Right::ArtifactDelete, group)?;
        let mut artifacts = self.artifacts_meta.write();
        let meta = artifacts
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("artifact '{id}' not found")))?;
        meta.published_in.remove(group);
        drop(artifacts);
        self.flush_artifacts_meta()
    }
}
