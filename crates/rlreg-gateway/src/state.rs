//! Shared application state passed to all API handlers.

use std::sync::Arc;

use rlreg_domain::config::Config;
use rlreg_identity::IdentityStore;
use rlreg_store::ResourceStore;
use rlreg_tokens::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<IdentityStore>,
    pub resources: Arc<ResourceStore>,
    pub tokens: Arc<TokenService>,
}
