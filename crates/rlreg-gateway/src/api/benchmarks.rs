//! Benchmark endpoints (`/benchmarks/*`).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use rlreg_domain::resource::{Benchmark, BenchmarkHeader, BenchmarkQuery};

use super::auth::AuthenticatedCaller;
use super::error::ApiResult;
use super::filterbody::parse_filter_body;
use crate::state::AppState;

/// `POST /benchmarks/create`
pub async fn create(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<BenchmarkQuery>,
) -> ApiResult<Json<BenchmarkHeader>> {
    Ok(Json(state.resources.create_benchmark(Some(&caller), body)?))
}

#[derive(Deserialize)]
pub struct LoadQuery {
    pub benchmark_id: String,
}

/// `GET /benchmarks/load?benchmark_id=`
pub async fn load(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<LoadQuery>,
) -> ApiResult<Json<Benchmark>> {
    Ok(Json(state.resources.load_benchmark(Some(&caller), &query.benchmark_id)?))
}

/// `POST /benchmarks/list` — body is a filter JSON (possibly `{}`).
pub async fn list(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<Vec<BenchmarkHeader>>> {
    let filter = parse_filter_body(body)?;
    Ok(Json(state.resources.list_benchmarks(Some(&caller), filter)?))
}

#[derive(Deserialize)]
pub struct PublishQuery {
    pub benchmark_id: String,
    pub publish_in: String,
}

/// `PUT /benchmarks/publish?benchmark_id=&publish_in=`
pub async fn publish(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<PublishQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.publish_benchmark(Some(&caller), &query.benchmark_id, &query.publish_in)?;
    Ok(Json(serde_json::json!({ "published": query.benchmark_id })))
}

#[derive(Deserialize)]
pub struct UnpublishQuery {
    pub benchmark_id: String,
    pub unpublish_from: String,
}

/// `PUT /benchmarks/unpublish?benchmark_id=&unpublish_from=`
pub async fn unpublish(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<UnpublishQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.unpublish_benchmark(Some(&caller), &query.benchmark_id, &query.unpublish_from)?;
    Ok(Json(serde_json::json!({ "unpublished": query.benchmark_id })))
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub benchmark_id: String,
}

/// `DELETE /benchmarks/delete?benchmark_id=` — idempotent; cascades to
/// child episodes (artifact cascade, when opted in, is a client-side
/// concern — see `rlreg-client`).
pub async fn delete(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.delete_benchmark(Some(&caller), &query.benchmark_id)?;
    Ok(Json(serde_json::json!({ "deleted": query.benchmark_id })))
}
