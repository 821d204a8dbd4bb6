use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the HMAC signing secret for tokens.
    /// If unset at startup, the server refuses to start (see
    /// `Config::validate`) rather than falling back to a hardcoded key.
    #[serde(default = "d_secret_env")]
    pub secret_env: String,
    /// Access token lifetime, in seconds.
    #[serde(default = "d_access_ttl")]
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime, in seconds.
    #[serde(default = "d_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
    /// argon2 work factor (memory cost in KiB). Higher is slower/safer.
    #[serde(default = "d_argon2_mem_cost_kib")]
    pub argon2_mem_cost_kib: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: d_secret_env(),
            access_token_ttl_secs: d_access_ttl(),
            refresh_token_ttl_secs: d_refresh_ttl(),
            argon2_mem_cost_kib: d_argon2_mem_cost_kib(),
        }
    }
}

fn d_secret_env() -> String {
    "RLREG_TOKEN_SECRET".into()
}
fn d_access_ttl() -> i64 {
    15 * 60
}
fn d_refresh_ttl() -> i64 {
    7 * 24 * 60 * 60
}
fn d_argon2_mem_cost_kib() -> u32 {
    19_456 // argon2id defaults (RFC 9106 "low memory" profile), work factor >= bcrypt cost 10 equivalent
}
