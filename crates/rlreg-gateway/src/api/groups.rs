//! Group/membership endpoints (`/access/groups/*`).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use rlreg_domain::identity::{Group, GroupWithMembers, MemberUpdate};
use rlreg_domain::rights::Right;
use rlreg_rights::authorize_global;

use super::auth::AuthenticatedCaller;
use super::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateGroupBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// `POST /access/groups/create` — the creator is automatically granted
/// an admin-equivalent role within the new group.
pub async fn create(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<CreateGroupBody>,
) -> ApiResult<Json<Group>> {
    authorize_global(Some(&caller), Right::GroupCreate)?;
    let group = Group { name: body.name, description: body.description, created_by: caller.username.clone() };
    Ok(Json(state.identity.create_group(group, &caller.username)?))
}

#[derive(Deserialize)]
pub struct DeleteGroupQuery {
    pub group_name: String,
}

/// `DELETE /access/groups/delete?group_name=` — idempotent; removes the
/// group from every membership and, via the resource store, every
/// resource's `published_in` (publications in that scope become
/// invisible, equivalent to unpublishing).
pub async fn delete(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<DeleteGroupQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_global(Some(&caller), Right::GroupDelete)?;
    state.identity.delete_group(&query.group_name)?;
    state.resources.unpublish_from_deleted_group(&query.group_name)?;
    Ok(Json(serde_json::json!({ "deleted": query.group_name })))
}

/// `GET /access/groups/list` — every group the caller has a membership
/// in, plus `global`.
pub async fn list(AuthenticatedCaller(caller): AuthenticatedCaller, State(state): State<AppState>) -> ApiResult<Json<Vec<Group>>> {
    Ok(Json(state.identity.list_groups_visible_to(&caller.username)?))
}

#[derive(Deserialize)]
pub struct ReadGroupQuery {
    pub group_name: String,
}

/// `GET /access/groups/read?group_name=`
pub async fn read(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Query(query): Query<ReadGroupQuery>,
) -> ApiResult<Json<GroupWithMembers>> {
    authorize_global(Some(&caller), Right::GroupRead)?;
    Ok(Json(state.identity.read_group(&query.group_name)?))
}

#[derive(Deserialize)]
pub struct AddMembersBody {
    pub group_name: String,
    pub members: Vec<MemberUpdate>,
}

/// `POST /access/groups/add-members` — replaces (not merges) each
/// target user's roles for the group.
pub async fn add_members(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<AddMembersBody>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_global(Some(&caller), Right::GroupUpdate)?;
    state.identity.add_members(&body.group_name, &body.members)?;
    Ok(Json(serde_json::json!({ "group_name": body.group_name })))
}

#[derive(Deserialize)]
pub struct RemoveMembersBody {
    pub group_name: String,
    pub usernames: Vec<String>,
}

/// `POST /access/groups/remove-members` — tolerant of missing
/// user/membership.
pub async fn remove_members(
    AuthenticatedCaller(caller): AuthenticatedCaller,
    State(state): State<AppState>,
    Json(body): Json<RemoveMembersBody>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_global(Some(&caller), Right::GroupUpdate)?;
    state.identity.remove_members(&body.group_name, &body.usernames)?;
    Ok(Json(serde_json::json!({ "group_name": body.group_name })))
}
