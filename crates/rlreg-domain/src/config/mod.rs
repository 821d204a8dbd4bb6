mod auth;
mod bootstrap;
mod server;
mod storage;

pub use auth::*;
pub use bootstrap::*;
pub use server::*;
pub use storage::*;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Validate the resolved configuration, returning every issue found
    /// (not just the first). The caller decides whether `Warning`-only
    /// issues are fatal; `Error`-severity issues always are.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if std::env::var(&self.auth.secret_env).is_err() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: format!(
                    "auth.secret_env points at '{}', which is not set in the environment",
                    self.auth.secret_env
                ),
            });
        }

        if self.auth.access_token_ttl_secs <= 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "auth.access_token_ttl_secs must be positive".into(),
            });
        }
        if self.auth.refresh_token_ttl_secs <= self.auth.access_token_ttl_secs {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "auth.refresh_token_ttl_secs should exceed access_token_ttl_secs".into(),
            });
        }

        if self.server.cors.allowed_origins.iter().any(|o| o == "*") {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "server.cors.allowed_origins contains '*' — permissive CORS".into(),
            });
        }

        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
