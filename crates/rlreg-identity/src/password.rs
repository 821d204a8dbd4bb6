//! Password hashing and verification.
//!
//! Stored hashes are salted argon2id digests (PHC string format), with a
//! memory cost configurable via [`rlreg_domain::config::AuthConfig`] —
//! the bcrypt-equivalent "work factor >= 10" requirement from the
//! identity store's contracts. Verification runs through
//! `PasswordHash::verify_password`, which compares in constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params};

use rlreg_domain::error::{Error, Result};

pub struct PasswordHasherService {
    argon2: Argon2<'static>,
}

impl PasswordHasherService {
    pub fn new(mem_cost_kib: u32) -> Self {
        let params = Params::new(mem_cost_kib, Params::DEFAULT_T_COST, Params::DEFAULT_P_COST, None)
            .expect("argon2 params within valid range");
        Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| Error::Storage(format!("hashing password: {e}")))
    }

    /// Constant-time verification (handled internally by `argon2`'s
    /// `PasswordVerifier`, which compares digests rather than raw bytes).
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasherService {
        PasswordHasherService::new(8 * 1024)
    }

    #[test]
    fn hash_then_verify_round_trips() {
        let h = hasher();
        let hash = h.hash("correct horse battery staple").unwrap();
        assert!(h.verify("correct horse battery staple", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let h = hasher();
        let hash = h.hash("correct horse battery staple").unwrap();
        assert!(!h.verify("wrong password", &hash));
    }

    #[test]
    fn same_password_hashes_differently_each_time() {
        let h = hasher();
        let a = h.hash("same password").unwrap();
        let b = h.hash("same password").unwrap();
        assert_ne!(a, b, "salts must differ");
    }
}
