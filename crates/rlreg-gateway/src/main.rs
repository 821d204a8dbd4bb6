use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use rlreg_domain::config::{Config, ConfigSeverity, CorsConfig};
use rlreg_gateway::api;
use rlreg_gateway::bootstrap;
use rlreg_gateway::cli::{Cli, Command, ConfigCommand};
use rlreg_gateway::state::AppState;
use rlreg_identity::IdentityStore;
use rlreg_store::ResourceStore;
use rlreg_tokens::TokenService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _path) = rlreg_gateway::cli::load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = rlreg_gateway::cli::load_config()?;
            let ok = rlreg_gateway::cli::validate_config(&config, &config_path);
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = rlreg_gateway::cli::load_config()?;
            if !rlreg_gateway::cli::validate_config(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _path) = rlreg_gateway::cli::load_config()?;
            rlreg_gateway::cli::show_config(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("rlreg-server {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rlreg_gateway=debug")),
        )
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("rlreg starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let secret = std::env::var(&config.auth.secret_env)
        .context("auth secret must be set (checked again here — validate() already gated on it)")?;

    let identity = Arc::new(
        IdentityStore::new(&config.storage.data_dir.join("identity"), config.auth.argon2_mem_cost_kib)
            .context("initializing identity store")?,
    );
    tracing::info!("identity store ready");

    bootstrap::ensure_admin(&identity, &config.bootstrap).context("bootstrapping admin user")?;

    let resources = Arc::new(
        ResourceStore::new(&config.storage.data_dir.join("resources")).context("initializing resource store")?,
    );
    tracing::info!("resource store ready");

    let tokens = Arc::new(TokenService::new(
        secret.into_bytes(),
        config.auth.access_token_ttl_secs,
        config.auth.refresh_token_ttl_secs,
    ));
    tracing::info!("token service ready");

    let state = AppState { config: config.clone(), identity, resources, tokens };

    let cors_layer = build_cors_layer(&config.server.cors);

    let app = api::router()
        .layer(cors_layer)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "rlreg listening");

    axum::serve(listener, app).await.context("axum server error")?;
    Ok(())
}

/// Build a [`CorsLayer`] from the configured allowed origins. Origins may
/// contain a trailing `*` wildcard for the port segment
/// (`http://localhost:*`), expanded into a predicate matching any port on
/// that host. A literal `"*"` allows all origins.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if let Some(prefix) = origin.strip_suffix('*') {
            wildcard_prefixes.push(prefix.to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
