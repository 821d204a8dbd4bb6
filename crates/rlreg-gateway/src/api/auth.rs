//! Authentication and login/refresh endpoints.
//!
//! Unlike the teacher's single shared-secret `middleware::from_fn_with_state`
//! (`require_api_token`), rights here depend on *which* user is calling, so
//! the caller is extracted per-request via [`AuthenticatedCaller`], a
//! `FromRequestParts` extractor — but the constant-time signature check
//! this replaces still lives inside `rlreg-tokens::TokenService::verify`.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use serde::{Deserialize, Serialize};

use rlreg_domain::error::Error;
use rlreg_domain::identity::Caller;
use rlreg_tokens::{TokenKind, TokenPair};

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Extracts and authenticates the caller from `Authorization: Bearer
/// <access token>`. Any other scheme, a missing header, or a failed
/// verification all map to 401 — never 403 ("no 401 vs 403 confusion").
pub struct AuthenticatedCaller(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Unauthorized("Authorization header must use the Bearer scheme".into()))?;

        let claims = state.tokens.verify(token, TokenKind::Access)?;
        let caller = state.identity.build_caller(&claims.sub)?;
        Ok(AuthenticatedCaller(caller))
    }
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// `POST /access/signup` — self-service signup with guest rights.
pub async fn signup(State(state): State<AppState>, Json(body): Json<Credentials>) -> ApiResult<Json<serde_json::Value>> {
    state.identity.create_user(&body.username, &body.password)?;
    Ok(Json(serde_json::json!({ "username": body.username })))
}

/// `POST /access/users/token` — password login, issues an access +
/// refresh token pair.
pub async fn login(State(state): State<AppState>, Json(body): Json<Credentials>) -> ApiResult<Json<TokenPair>> {
    state.identity.authenticate(&body.username, &body.password)?;
    Ok(Json(state.tokens.issue_pair(&body.username)))
}

/// `POST /access/users/refresh-token` — exchanges a refresh token (never
/// an access token) for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> ApiResult<Json<rlreg_tokens::IssuedToken>> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("missing Authorization header".into()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("Authorization header must use the Bearer scheme".into()))?;

    let claims = state.tokens.verify(token, TokenKind::Refresh)?;
    Ok(Json(state.tokens.issue_access_token(&claims.sub)))
}

#[derive(Serialize)]
pub struct RootResponse {
    service: &'static str,
}

/// `GET /` — unauthenticated liveness probe.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse { service: "rlreg" })
}
