//! Role management endpoints (`/access/roles/*`).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use rlreg_domain::identity::Role;
use rlreg_domain::rights::Right;
use rlreg_rights::authorize_global;

use super::auth::AuthenticatedCaller;
use super::error::ApiResult;
use crate::state::AppState;

/// `POST /access/roles/create`
pub async fn create(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(role): Json<Role>,
) -> ApiResult<Json<Role>> {
    authorize_global(Some(&caller), Right::RoleCreate)?;
    Ok(Json(state.identity.create_role(role)?))
}

#[derive(Deserialize)]
pub struct DeleteRoleQuery {
    pub role_name: String,
}

/// `DELETE /access/roles/delete?role_name=` — idempotent; strips the
/// role out of every membership before removing it.
pub async fn delete(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<DeleteRoleQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_global(Some(&caller), Right::RoleDelete)?;
    state.identity.delete_role(&query.role_name)?;
    Ok(Json(serde_json::json!({ "deleted": query.role_name })))
}

/// `GET /access/roles/list`
pub async fn list(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Role>>> {
    authorize_global(Some(&caller), Right::RoleRead)?;
    Ok(Json(state.identity.list_roles()))
}
