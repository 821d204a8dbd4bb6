//! End-to-end exercises of the handlers registered in `api::router`,
//! calling them directly with hand-built extractors rather than driving
//! a real socket. Covers the signup/login/refresh flow, token-type
//! discipline, and the authorization scenarios that the lower-level
//! crates already test individually but that only the gateway wires
//! together in one request.

use axum::extract::{Query, State};
use axum::Json;

use rlreg_domain::identity::Caller;
use rlreg_domain::resource::{BenchmarkMetadata, BenchmarkQuery};
use rlreg_gateway::api::auth::{self, AuthenticatedCaller};
use rlreg_gateway::api::benchmarks;
use rlreg_gateway::api::error::ApiError;
use rlreg_gateway::api::groups;
use rlreg_gateway::state::AppState;
use rlreg_identity::IdentityStore;
use rlreg_store::ResourceStore;
use rlreg_tokens::{TokenKind, TokenService};

fn state(dir: &std::path::Path) -> AppState {
    let config = rlreg_domain::config::Config::default();
    let identity = IdentityStore::new(&dir.join("identity"), 19_456).unwrap();
    let resources = ResourceStore::new(&dir.join("resources")).unwrap();
    let tokens = TokenService::new(b"test-secret-at-least-this-long".to_vec(), 900, 86_400);
    AppState {
        config: std::sync::Arc::new(config),
        identity: std::sync::Arc::new(identity),
        resources: std::sync::Arc::new(resources),
        tokens: std::sync::Arc::new(tokens),
    }
}

async fn caller_for(state: &AppState, username: &str) -> Caller {
    state.identity.build_caller(username).unwrap()
}

#[tokio::test]
async fn signup_then_login_issues_a_usable_token_pair() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    auth::signup(
        State(state.clone()),
        Json(auth::Credentials { username: "alice".into(), password: "hunter2hunter2".into() }),
    )
    .await
    .unwrap();

    let pair = auth::login(
        State(state.clone()),
        Json(auth::Credentials { username: "alice".into(), password: "hunter2hunter2".into() }),
    )
    .await
    .unwrap()
    .0;

    let claims = state.tokens.verify(&pair.access_token.token, TokenKind::Access).unwrap();
    assert_eq!(claims.sub, "alice");
}

#[tokio::test]
async fn refresh_token_cannot_be_used_in_place_of_an_access_token() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());
    state.identity.create_user("bob", "swordfish99").unwrap();
    let pair = state.tokens.issue_pair("bob");

    // Using the refresh token where AuthenticatedCaller expects an
    // access token must fail verification with Unauthorized, not just
    // "wrong claims" silently accepted.
    let result = state.tokens.verify(&pair.refresh_token.token, TokenKind::Access);
    assert!(result.is_err());

    // The dedicated refresh endpoint, in turn, rejects an access token.
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        format!("Bearer {}", pair.access_token.token).parse().unwrap(),
    );
    let rejected = auth::refresh(State(state.clone()), headers).await;
    assert!(rejected.is_err());

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        format!("Bearer {}", pair.refresh_token.token).parse().unwrap(),
    );
    let reissued = auth::refresh(State(state.clone()), headers).await.unwrap().0;
    assert!(state.tokens.verify(&reissued.token, TokenKind::Access).is_ok());
}

#[tokio::test]
async fn creating_duplicate_benchmark_hash_conflicts_across_users() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());
    state.identity.create_user("carol", "carolpassword1").unwrap();
    state.identity.create_user("dave", "davepassword1").unwrap();
    let carol = caller_for(&state, "carol").await;
    let dave = caller_for(&state, "dave").await;

    let query = || BenchmarkQuery {
        hash: "shared-hash".into(),
        metadata: BenchmarkMetadata { name: "cartpole".into(), ..Default::default() },
        serialized: "{}".into(),
    };

    let created = benchmarks::create(AuthenticatedCaller(carol.clone()), State(state.clone()), Json(query()))
        .await
        .unwrap()
        .0;

    groups::create(
        AuthenticatedCaller(carol.clone()),
        State(state.clone()),
        Json(groups::CreateGroupBody { name: "shared".into(), description: String::new() }),
    )
    .await
    .unwrap();
    let carol = caller_for(&state, "carol").await; // refresh: now a member of "shared"

    benchmarks::publish(
        AuthenticatedCaller(carol),
        State(state.clone()),
        Query(benchmarks::PublishQuery { benchmark_id: created.id.clone(), publish_in: "shared".into() }),
    )
    .await
    .unwrap();

    let conflict = benchmarks::create(AuthenticatedCaller(dave), State(state.clone()), Json(query())).await;
    assert!(conflict.is_err());
}

#[tokio::test]
async fn guest_cannot_load_a_benchmark_still_private_to_its_owner() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());
    state.identity.create_user("erin", "erinpassword1").unwrap();
    state.identity.create_user("mallory", "malpassword1").unwrap();
    let erin = caller_for(&state, "erin").await;
    let mallory = caller_for(&state, "mallory").await;

    let created = benchmarks::create(
        AuthenticatedCaller(erin),
        State(state.clone()),
        Json(BenchmarkQuery {
            hash: "private-hash".into(),
            metadata: BenchmarkMetadata { name: "secret".into(), ..Default::default() },
            serialized: "{}".into(),
        }),
    )
    .await
    .unwrap()
    .0;

    let result = benchmarks::load(
        AuthenticatedCaller(mallory),
        State(state.clone()),
        Query(benchmarks::LoadQuery { benchmark_id: created.id }),
    )
    .await;

    let err: Result<_, ApiError> = result;
    assert!(err.is_err());
}

#[tokio::test]
async fn publishing_a_benchmark_to_a_group_makes_it_visible_to_members() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());
    state.identity.create_user("owner", "ownerpassword1").unwrap();
    state.identity.create_user("member", "memberpassword1").unwrap();
    let owner = caller_for(&state, "owner").await;

    groups::create(
        AuthenticatedCaller(owner.clone()),
        State(state.clone()),
        Json(groups::CreateGroupBody { name: "lab".into(), description: String::new() }),
    )
    .await
    .unwrap();
    state
        .identity
        .add_members(
            "lab",
            &[rlreg_domain::identity::MemberUpdate {
                user: "member".into(),
                roles: std::collections::BTreeSet::from(["guest".to_string()]),
            }],
        )
        .unwrap();
    let owner = caller_for(&state, "owner").await; // refresh: now admin of "lab"

    let created = benchmarks::create(
        AuthenticatedCaller(owner.clone()),
        State(state.clone()),
        Json(BenchmarkQuery {
            hash: "lab-hash".into(),
            metadata: BenchmarkMetadata { name: "lab-env".into(), ..Default::default() },
            serialized: "{}".into(),
        }),
    )
    .await
    .unwrap()
    .0;

    benchmarks::publish(
        AuthenticatedCaller(owner),
        State(state.clone()),
        Query(benchmarks::PublishQuery { benchmark_id: created.id.clone(), publish_in: "lab".into() }),
    )
    .await
    .unwrap();

    let member = caller_for(&state, "member").await;
    let visible = benchmarks::list(
        AuthenticatedCaller(member.clone()),
        State(state.clone()),
        Json(serde_json::json!({})),
    )
    .await
    .unwrap()
    .0;
    assert!(visible.iter().any(|b| b.id == created.id));

    let loaded = benchmarks::load(
        AuthenticatedCaller(member),
        State(state.clone()),
        Query(benchmarks::LoadQuery { benchmark_id: created.id }),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(loaded.hash, "lab-hash");
}
