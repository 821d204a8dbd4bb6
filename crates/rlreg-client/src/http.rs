//! `HttpBackend` — talks to a running `rlreg-server` over HTTP.
//!
//! Credentials persist in the OS keychain via `keyring`, the same
//! `keyring::Entry::new(service, account)` pattern the teacher's provider
//! adapters use to resolve API keys, applied here to the access/refresh
//! token pair instead of a static key. On a 401 the backend refreshes once
//! and retries the call transparently; a second 401 is returned to the
//! caller as-is.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use rlreg_domain::error::{Error, Result};
use rlreg_domain::filter::Filter;
use rlreg_domain::resource::{
    ArtifactMetadata, ArtifactMetadataItem, Benchmark, BenchmarkHeader, BenchmarkQuery, Episode,
    EpisodeHeader, EpisodeItem,
};

use crate::{FetchedArtifact, RegistryClient};

const KEYRING_SERVICE: &str = "rlreg";

fn keyring_entry(account: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, account)
        .map_err(|e| Error::Storage(format!("keyring entry creation failed: {e}")))
}

fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Storage(format!("request timed out: {e}"))
    } else {
        Error::Storage(format!("HTTP request failed: {e}"))
    }
}

struct Tokens {
    access: String,
    refresh: String,
}

/// Reqwest-based [`RegistryClient`]. Holds the current token pair in memory
/// (mirrored to the keychain on every change) plus the base URL the tokens
/// were issued against.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    tokens: RwLock<Option<Tokens>>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into(), tokens: RwLock::new(None) }
    }

    /// Restores a previously persisted session from the keychain, if any.
    pub fn load_from_keyring(base_url: impl Into<String>) -> Result<Self> {
        let backend = Self::new(base_url);
        let access = keyring_entry("access_token")?.get_password().ok();
        let refresh = keyring_entry("refresh_token")?.get_password().ok();
        if let (Some(access), Some(refresh)) = (access, refresh) {
            *backend.tokens.write().unwrap() = Some(Tokens { access, refresh });
        }
        Ok(backend)
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/access/signup", self.base_url))
            .json(&Credentials { username, password })
            .send()
            .await
            .map_err(from_reqwest)?;
        check_status(resp).await?;
        Ok(())
    }

    /// Logs in, persisting both tokens to the OS keychain for future
    /// `load_from_keyring` sessions.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/access/users/token", self.base_url))
            .json(&Credentials { username, password })
            .send()
            .await
            .map_err(from_reqwest)?;
        let pair: rlreg_tokens::TokenPair = check_status(resp).await?.json().await.map_err(from_reqwest)?;
        self.store_tokens(pair.access_token.token, pair.refresh_token.token)?;
        Ok(())
    }

    fn store_tokens(&self, access: String, refresh: String) -> Result<()> {
        keyring_entry("access_token")?
            .set_password(&access)
            .map_err(|e| Error::Storage(format!("keyring set_password failed: {e}")))?;
        keyring_entry("refresh_token")?
            .set_password(&refresh)
            .map_err(|e| Error::Storage(format!("keyring set_password failed: {e}")))?;
        *self.tokens.write().unwrap() = Some(Tokens { access, refresh });
        Ok(())
    }

    fn access_token(&self) -> Result<String> {
        self.tokens
            .read()
            .unwrap()
            .as_ref()
            .map(|t| t.access.clone())
            .ok_or_else(|| Error::Unauthorized("not logged in".into()))
    }

    async fn refresh(&self) -> Result<()> {
        let refresh_token = self
            .tokens
            .read()
            .unwrap()
            .as_ref()
            .map(|t| t.refresh.clone())
            .ok_or_else(|| Error::Unauthorized("not logged in".into()))?;

        let resp = self
            .client
            .post(format!("{}/access/users/refresh-token", self.base_url))
            .bearer_auth(refresh_token.clone())
            .send()
            .await
            .map_err(from_reqwest)?;
        let issued: rlreg_tokens::IssuedToken = check_status(resp).await?.json().await.map_err(from_reqwest)?;
        self.store_tokens(issued.token, refresh_token)
    }

    /// Runs `make_request` once; on a 401 it refreshes the access token and
    /// retries exactly once before giving up.
    async fn with_auth_retry<F, Fut>(&self, make_request: F) -> Result<reqwest::Response>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
    {
        let token = self.access_token()?;
        let resp = make_request(token).await.map_err(from_reqwest)?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return check_status(resp).await;
        }

        self.refresh().await?;
        let token = self.access_token()?;
        let resp = make_request(token).await.map_err(from_reqwest)?;
        check_status(resp).await
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let detail = resp.json::<ErrorBody>().await.map(|b| b.detail).unwrap_or_else(|_| status.to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized(detail),
        StatusCode::FORBIDDEN => Error::Forbidden(detail),
        StatusCode::NOT_FOUND => Error::NotFound(detail),
        StatusCode::CONFLICT => Error::Conflict(detail),
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => Error::Validation(detail),
        _ => Error::Storage(detail),
    })
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: String,
}

fn filter_body(filter: Option<Filter>) -> serde_json::Value {
    match filter {
        Some(f) => serde_json::to_value(f).unwrap_or(serde_json::Value::Object(Default::default())),
        None => serde_json::Value::Object(Default::default()),
    }
}

#[async_trait]
impl RegistryClient for HttpBackend {
    async fn create_benchmark(&self, query: BenchmarkQuery) -> Result<BenchmarkHeader> {
        let resp = self
            .with_auth_retry(|token| {
                self.client.post(format!("{}/benchmarks/create", self.base_url)).bearer_auth(token).json(&query).send()
            })
            .await?;
        resp.json().await.map_err(from_reqwest)
    }

    async fn load_benchmark(&self, id: &str) -> Result<Benchmark> {
        let resp = self
            .with_auth_retry(|token| {
                self.client
                    .get(format!("{}/benchmarks/load", self.base_url))
                    .bearer_auth(token)
                    .query(&[("benchmark_id", id)])
                    .send()
            })
            .await?;
        resp.json().await.map_err(from_reqwest)
    }

    async fn list_benchmarks(&self, filter: Option<Filter>) -> Result<Vec<BenchmarkHeader>> {
        let body = filter_body(filter);
        let resp = self
            .with_auth_retry(|token| {
                self.client.post(format!("{}/benchmarks/list", self.base_url)).bearer_auth(token).json(&body).send()
            })
            .await?;
        resp.json().await.map_err(from_reqwest)
    }

    async fn publish_benchmark(&self, id: &str, scope: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .put(format!("{}/benchmarks/publish", self.base_url))
                .bearer_auth(token)
                .query(&[("benchmark_id", id), ("publish_in", scope)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn unpublish_benchmark(&self, id: &str, scope: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .put(format!("{}/benchmarks/unpublish", self.base_url))
                .bearer_auth(token)
                .query(&[("benchmark_id", id), ("unpublish_from", scope)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn delete_benchmark(&self, id: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .delete(format!("{}/benchmarks/delete", self.base_url))
                .bearer_auth(token)
                .query(&[("benchmark_id", id)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn upload_artifact(&self, bytes: &[u8], metadata: ArtifactMetadata) -> Result<ArtifactMetadataItem> {
        let token = self.access_token()?;
        let form = reqwest::multipart::Form::new()
            .part("data", reqwest::multipart::Part::bytes(bytes.to_vec()))
            .text("metadata", serde_json::to_string(&metadata).map_err(Error::Json)?);
        let resp = self
            .client
            .post(format!("{}/artifacts/upload", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(from_reqwest)?;
        let created: serde_json::Value = check_status(resp).await?.json().await.map_err(from_reqwest)?;
        let id = created
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Storage("upload response missing 'id'".into()))?;

        let artifacts = self.list_artifacts(Some(Filter::eq("id", id))).await?;
        artifacts.into_iter().next().ok_or_else(|| Error::NotFound(format!("artifact '{id}' not found after upload")))
    }

    async fn download_artifact(&self, id: &str) -> Result<FetchedArtifact> {
        let resp = self
            .with_auth_retry(|token| {
                self.client
                    .get(format!("{}/artifacts/download", self.base_url))
                    .bearer_auth(token)
                    .query(&[("artifact_id", id)])
                    .send()
            })
            .await?;

        let meta_header = resp
            .headers()
            .get("X-Metadata")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Storage("download response missing X-Metadata header".into()))?
            .to_owned();
        let meta: ArtifactMetadataItem = serde_json::from_str(&meta_header).map_err(Error::Json)?;
        let bytes = resp.bytes().await.map_err(from_reqwest)?.to_vec();
        Ok(FetchedArtifact { meta, bytes })
    }

    async fn list_artifacts(&self, filter: Option<Filter>) -> Result<Vec<ArtifactMetadataItem>> {
        let body = filter_body(filter);
        let resp = self
            .with_auth_retry(|token| {
                self.client.post(format!("{}/artifacts/list", self.base_url)).bearer_auth(token).json(&body).send()
            })
            .await?;
        resp.json().await.map_err(from_reqwest)
    }

    async fn publish_artifact(&self, id: &str, scope: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .put(format!("{}/artifacts/publish", self.base_url))
                .bearer_auth(token)
                .query(&[("artifact_id", id), ("publish_in", scope)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn unpublish_artifact(&self, id: &str, scope: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .put(format!("{}/artifacts/unpublish", self.base_url))
                .bearer_auth(token)
                .query(&[("artifact_id", id), ("unpublish_from", scope)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn delete_artifact(&self, id: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .delete(format!("{}/artifacts/delete", self.base_url))
                .bearer_auth(token)
                .query(&[("artifact_id", id)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn record_episode(&self, episode: Episode) -> Result<EpisodeHeader> {
        let resp = self
            .with_auth_retry(|token| {
                self.client.post(format!("{}/episodes/record", self.base_url)).bearer_auth(token).json(&episode).send()
            })
            .await?;
        resp.json().await.map_err(from_reqwest)
    }

    async fn list_episodes(&self, filter: Option<Filter>, include_tuples: bool) -> Result<Vec<EpisodeItem>> {
        let mut body = filter_body(filter);
        if let serde_json::Value::Object(ref mut map) = body {
            map.insert("include_tuples".into(), serde_json::Value::Bool(include_tuples));
        }
        let resp = self
            .with_auth_retry(|token| {
                self.client.post(format!("{}/episodes/list", self.base_url)).bearer_auth(token).json(&body).send()
            })
            .await?;
        resp.json().await.map_err(from_reqwest)
    }

    async fn publish_episode(&self, id: &str, scope: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .put(format!("{}/episodes/publish", self.base_url))
                .bearer_auth(token)
                .query(&[("episode_id", id), ("publish_in", scope)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn unpublish_episode(&self, id: &str, scope: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .put(format!("{}/episodes/unpublish", self.base_url))
                .bearer_auth(token)
                .query(&[("episode_id", id), ("unpublish_from", scope)])
                .send()
        })
        .await?;
        Ok(())
    }

    async fn delete_episode(&self, id: &str) -> Result<()> {
        self.with_auth_retry(|token| {
            self.client
                .delete(format!("{}/episodes/delete", self.base_url))
                .bearer_auth(token)
                .query(&[("episode_id", id)])
                .send()
        })
        .await?;
        Ok(())
    }
}
