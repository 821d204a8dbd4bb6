use serde::{Deserialize, Serialize};

/// First-boot provisioning: if the `users` collection is empty when the
/// server starts, it creates this admin user so there is always a way
/// in. Subsequent boots are no-ops (the identity store already has the
/// admin user, so `create_user` would conflict — bootstrap skips it
/// instead of erroring).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "d_admin_username")]
    pub admin_username: String,
    /// Environment variable holding the initial admin password.
    #[serde(default = "d_admin_password_env")]
    pub admin_password_env: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: d_admin_username(),
            admin_password_env: d_admin_password_env(),
        }
    }
}

fn d_admin_username() -> String {
    "admin".into()
}
fn d_admin_password_env() -> String {
    "RLREG_ADMIN_PASSWORD".into()
}
