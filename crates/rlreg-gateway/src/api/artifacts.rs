//! Artifact endpoints (`/artifacts/*`) — the one resource kind whose
//! wire format is binary, not JSON: upload is `multipart/form-data`,
//! download returns the raw blob with metadata folded into a response
//! header rather than the body.

use axum::body::Bytes;
use axum::extract::{Multipart, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use rlreg_domain::error::Error;
use rlreg_domain::resource::{ArtifactMetadata, ArtifactMetadataItem};

use super::auth::AuthenticatedCaller;
use super::error::{ApiError, ApiResult};
use super::filterbody::parse_filter_body;
use crate::state::AppState;

/// `POST /artifacts/upload` — multipart: file field `data`, form field
/// `metadata` (JSON).
pub async fn upload(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut data: Option<Vec<u8>> = None;
    let mut metadata: Option<ArtifactMetadata> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("data") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::Validation(format!("reading 'data' field: {e}")))?;
                data = Some(bytes.to_vec());
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(format!("reading 'metadata' field: {e}")))?;
                metadata = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| Error::Validation(format!("invalid 'metadata' JSON: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| Error::Validation("multipart body missing 'data' field".into()))?;
    let metadata = metadata.unwrap_or_default();

    let item = state.resources.store_artifact(Some(&caller), &data, metadata)?;
    Ok(Json(serde_json::json!({ "id": item.id })))
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub artifact_id: String,
}

/// `GET /artifacts/download?artifact_id=` — blob body, metadata JSON in
/// the `X-Metadata` response header.
pub async fn download(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Response {
    match state.resources.load_artifact(Some(&caller), &query.artifact_id) {
        Ok(stored) => {
            let metadata_json = serde_json::to_string(&stored.meta).unwrap_or_default();
            let mut response = Bytes::from(stored.bytes).into_response();
            if let Ok(value) = HeaderValue::from_str(&metadata_json) {
                response.headers_mut().insert("X-Metadata", value);
            }
            response
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// `POST /artifacts/list`
pub async fn list(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<Vec<ArtifactMetadataItem>>> {
    let filter = parse_filter_body(body)?;
    Ok(Json(state.resources.list_artifacts(Some(&caller), filter)?))
}

#[derive(Deserialize)]
pub struct PublishQuery {
    pub artifact_id: String,
    pub publish_in: String,
}

/// `PUT /artifacts/publish?artifact_id=&publish_in=`
pub async fn publish(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<PublishQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.publish_artifact(Some(&caller), &query.artifact_id, &query.publish_in)?;
    Ok(Json(serde_json::json!({ "published": query.artifact_id })))
}

#[derive(Deserialize)]
pub struct UnpublishQuery {
    pub artifact_id: String,
    pub unpublish_from: String,
}

/// `PUT /artifacts/unpublish?artifact_id=&unpublish_from=`
pub async fn unpublish(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<UnpublishQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.unpublish_artifact(Some(&caller), &query.artifact_id, &query.unpublish_from)?;
    Ok(Json(serde_json::json!({ "unpublished": query.artifact_id })))
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub artifact_id: String,
}

/// `DELETE /artifacts/delete?artifact_id=` — idempotent.
pub async fn delete(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    state.resources.delete_artifact(Some(&caller), &query.artifact_id)?;
    Ok(Json(serde_json::json!({ "deleted": query.artifact_id })))
}
