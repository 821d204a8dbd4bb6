//! Token Service (C2) — mints and verifies short-lived access tokens and
//! long-lived refresh tokens bound to a user identity.
//!
//! Tokens are `base64url(claims_json).base64url(hmac_sha256(claims_json))`,
//! an HS256-equivalent symmetric scheme. This mirrors the teacher's
//! `require_api_token` middleware (SHA-256 digest + `subtle` constant-time
//! compare over a bearer token) generalized from "does the token match a
//! single shared secret" to "does the signature match a signed claims
//! payload".

use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use rlreg_domain::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Unix timestamp (seconds) after which the token is no longer valid.
    pub exp: i64,
}

/// A signed, ready-to-send token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
}

/// Both tokens issued by a successful password login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: IssuedToken,
    pub refresh_token: IssuedToken,
}

pub struct TokenService {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    pub fn issue_pair(&self, username: &str) -> TokenPair {
        TokenPair {
            access_token: self.issue(username, TokenKind::Access),
            refresh_token: self.issue(username, TokenKind::Refresh),
        }
    }

    pub fn issue_access_token(&self, username: &str) -> IssuedToken {
        self.issue(username, TokenKind::Access)
    }

    fn issue(&self, username: &str, kind: TokenKind) -> IssuedToken {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = TokenClaims {
            sub: username.to_owned(),
            kind,
            exp: (Utc::now() + ttl).timestamp(),
        };
        IssuedToken {
            token: self.encode(&claims),
            token_type: "bearer".into(),
        }
    }

    fn encode(&self, claims: &TokenClaims) -> String {
        let payload = serde_json::to_vec(claims).expect("TokenClaims always serializes");
        let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&payload);

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload_b64.as_bytes());
        let sig_b64 =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{payload_b64}.{sig_b64}")
    }

    /// Verify a token's signature, expiry, and that it carries `expected`
    /// kind. Rejects wrong type, wrong signature, and expired tokens —
    /// the three failure modes the spec calls out explicitly.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims> {
        let (payload_b64, sig_b64) = token
            .split_once('.')
            .ok_or_else(|| Error::Unauthorized("malformed token".into()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload_b64.as_bytes());
        let expected_sig = mac.finalize().into_bytes();

        let given_sig = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| Error::Unauthorized("malformed token signature".into()))?;

        if given_sig.len() != expected_sig.len()
            || !bool::from(given_sig.ct_eq(expected_sig.as_slice()))
        {
            return Err(Error::Unauthorized("invalid token signature".into()));
        }

        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| Error::Unauthorized("malformed token payload".into()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|_| Error::Unauthorized("malformed token claims".into()))?;

        if claims.kind != expected {
            return Err(Error::Unauthorized(format!(
                "expected a {expected:?} token, got {:?}",
                claims.kind
            )));
        }

        if claims.exp < Utc::now().timestamp() {
            return Err(Error::Unauthorized("token expired".into()));
        }

        Ok(claims)
    }

    pub fn expires_at(claims: &TokenClaims) -> DateTime<Utc> {
        DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"unit-test-secret".to_vec(), 900, 604_800)
    }

    #[test]
    fn round_trips_access_token() {
        let svc = service();
        let token = svc.issue_access_token("alice");
        let claims = svc.verify(&token.token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn rejects_wrong_kind() {
        let svc = service();
        let pair = svc.issue_pair("alice");
        let err = svc.verify(&pair.refresh_token.token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn rejects_tampered_signature() {
        let svc = service();
        let token = svc.issue_access_token("alice");
        let mut tampered = token.token.clone();
        tampered.push('x');
        assert!(svc.verify(&tampered, TokenKind::Access).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let svc = TokenService::new(b"unit-test-secret".to_vec(), -1, 604_800);
        let token = svc.issue_access_token("alice");
        let err = svc.verify(&token.token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn rejects_token_signed_with_different_secret() {
        let svc_a = TokenService::new(b"secret-a".to_vec(), 900, 604_800);
        let svc_b = TokenService::new(b"secret-b".to_vec(), 900, 604_800);
        let token = svc_a.issue_access_token("alice");
        assert!(svc_b.verify(&token.token, TokenKind::Access).is_err());
    }
}
