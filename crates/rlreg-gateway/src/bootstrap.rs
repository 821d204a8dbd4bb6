//! First-boot provisioning — mirrors the teacher's `BootstrapTracker`
//! doing one-time first-run setup and logging it via `tracing::info!`,
//! but here the one-time work is "is there an admin user at all".

use rlreg_domain::config::BootstrapConfig;
use rlreg_domain::error::Result;
use rlreg_identity::IdentityStore;
use tracing::{info, warn};

/// If the `users` collection is empty, create the configured admin user
/// and grant them unconditional `global` admin rights. Subsequent boots
/// are no-ops — `list_users` is non-empty, so this never re-runs.
pub fn ensure_admin(identity: &IdentityStore, config: &BootstrapConfig) -> Result<()> {
    if !identity.list_users().is_empty() {
        return Ok(());
    }

    let password = match std::env::var(&config.admin_password_env) {
        Ok(p) if !p.is_empty() => p,
        _ => {
            warn!(
                env_var = %config.admin_password_env,
                "no users exist and {} is unset — skipping admin bootstrap; \
                 set the env var and restart, or create one via POST /access/signup",
                config.admin_password_env
            );
            return Ok(());
        }
    };

    identity.create_user(&config.admin_username, &password)?;
    identity.grant_global_admin(&config.admin_username)?;
    info!(username = %config.admin_username, "bootstrap admin user created");
    Ok(())
}
