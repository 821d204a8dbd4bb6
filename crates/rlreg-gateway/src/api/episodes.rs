//! Episode endpoints (`/episodes/*`).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use rlreg_domain::resource::{Episode, EpisodeHeader, EpisodeItem};

use super::auth::AuthenticatedCaller;
use super::error::ApiResult;
use super::filterbody::parse_episode_list_body;
use crate::state::AppState;

/// `POST /episodes/record` — append-only; never mutated after creation.
pub async fn record(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<Episode>,
) -> ApiResult<Json<EpisodeHeader>> {
    Ok(Json(state.resources.record_episode(Some(&caller), body)?))
}

/// `POST /episodes/list` — body is a filter merged with
/// `{include_tuples: bool}`.
pub async fn list(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<Vec<EpisodeItem>>> {
    let (filter, include_tuples) = parse_episode_list_body(body)?;
    Ok(Json(state.resources.list_episodes(Some(&caller), filter, include_tuples)?))
}

#[derive(Deserialize)]
pub struct PublishQuery {
    pub episode_id: String,
    pub publish_in: String,
}

/// `PUT /episodes/publish?episode_id=&publish_in=` — only valid when
/// the parent benchmark is already published in the same scope.
pub async fn publish(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<PublishQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.publish_episode(Some(&caller), &query.episode_id, &query.publish_in)?;
    Ok(Json(serde_json::json!({ "published": query.episode_id })))
}

#[derive(Deserialize)]
pub struct UnpublishQuery {
    pub episode_id: String,
    pub unpublish_from: String,
}

/// `PUT /episodes/unpublish?episode_id=&unpublish_from=`
pub async fn unpublish(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<UnpublishQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.unpublish_episode(Some(&caller), &query.episode_id, &query.unpublish_from)?;
    Ok(Json(serde_json::json!({ "unpublished": query.episode_id })))
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub episode_id: String,
}

/// `DELETE /episodes/delete?episode_id=` — idempotent; independent of
/// the parent benchmark's lifecycle.
pub async fn delete(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.delete_episode(Some(&caller), &query.episode_id)?;
    Ok(Json(serde_json::json!({ "deleted": query.episode_id })))
}
