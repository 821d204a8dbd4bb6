//! User management endpoints (`/access/users/*`, signup excluded — that
//! lives in `api::auth`).

use std::collections::BTreeSet;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use rlreg_domain::identity::User;
use rlreg_domain::rights::Right;
use rlreg_rights::authorize_global;

use super::auth::AuthenticatedCaller;
use super::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateUserBody {
    pub username: String,
    pub password: String,
}

/// `POST /access/users/create` — admin-gated user creation (signup is
/// the self-service equivalent, gated by nothing but a fresh username).
pub async fn create(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_global(Some(&caller), Right::UserCreate)?;
    let user = state.identity.create_user(&body.username, &body.password)?;
    Ok(Json(serde_json::json!({ "username": user.username })))
}

#[derive(Deserialize)]
pub struct DeleteUserQuery {
    pub username: String,
}

/// `DELETE /access/users/delete?username=` — idempotent; cascades per
/// the identity store's deletion rules (see `rlreg-store`'s
/// `purge_private_resources_for_user`, invoked here so the gateway is
/// the one place that knows both stores exist).
pub async fn delete(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<DeleteUserQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_global(Some(&caller), Right::UserDelete)?;
    state.identity.delete_user(&query.username)?;
    state.resources.purge_private_resources_for_user(&query.username)?;
    Ok(Json(serde_json::json!({ "deleted": query.username })))
}

#[derive(Deserialize)]
pub struct ChangePasswordBody {
    pub username: String,
    pub new_password: String,
}

/// `PUT /access/users/change-password` — a user may change their own
/// password; `USER_UPDATE` in `global` lets an admin change anyone's.
pub async fn change_password(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordBody>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.username != caller.username {
        authorize_global(Some(&caller), Right::UserUpdate)?;
    }
    state.identity.change_password(&body.username, &body.new_password)?;
    Ok(Json(serde_json::json!({ "username": body.username })))
}

/// `GET /access/users/list` — `USER_READ` gated.
pub async fn list(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<User>>> {
    authorize_global(Some(&caller), Right::UserRead)?;
    Ok(Json(state.identity.list_users()))
}

#[derive(Deserialize)]
pub struct ChangeRolesBody {
    pub username: String,
    pub roles: BTreeSet<String>,
}

/// `PUT /access/users/change-roles` — bulk-replaces a user's `global`-
/// scope roles wholesale (supplemented from the original source; see
/// DESIGN.md). Distinct from `groups::add_members`, which only covers
/// non-global scopes.
pub async fn change_roles(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<ChangeRolesBody>,
) -> ApiResult<Json<User>> {
    authorize_global(Some(&caller), Right::UserUpdate)?;
    let user = state.identity.set_global_roles(&body.username, body.roles)?;
    Ok(Json(user))
}
