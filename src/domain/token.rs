//! Opaque token value object and refresh token entity.
//!
//! Refresh and email-confirmation tokens are random opaque strings.
//! Only a SHA-256 digest is persisted; the plain value exists once, in
//! the response or email that delivers it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::OPAQUE_TOKEN_BYTES;

/// A freshly generated opaque token: the plain value for the client and
/// the digest for storage.
#[derive(Clone)]
pub struct OpaqueToken {
    plain: String,
    hash: String,
}

impl std::fmt::Debug for OpaqueToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaqueToken")
            .field("plain", &"[REDACTED]")
            .field("hash", &self.hash)
            .finish()
    }
}

impl OpaqueToken {
    /// Generate a new random token from the OS entropy source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; OPAQUE_TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let plain = URL_SAFE_NO_PAD.encode(bytes);
        let hash = Self::digest(&plain);
        Self { plain, hash }
    }

    /// Digest a presented token the same way stored tokens were digested.
    pub fn digest(plain: &str) -> String {
        let digest = Sha256::digest(plain.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// The value handed to the client.
    pub fn plain(&self) -> &str {
        &self.plain
    }

    /// The value persisted in the database.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Refresh token domain entity.
///
/// Single-use: rotation revokes the presented token and issues a new one.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    /// Owner's security stamp at issuance; a mismatch means credentials
    /// changed since and the token is dead.
    pub security_stamp: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// Create a new refresh token record for a user.
    pub fn new(
        user_id: Uuid,
        token_hash: String,
        security_stamp: String,
        ttl_days: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            security_stamp,
            expires_at: now + chrono::Duration::days(ttl_days),
            created_at: now,
            revoked_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Usable for rotation: not revoked, not expired, stamp still current.
    pub fn is_active_for(&self, current_stamp: &str, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now) && self.security_stamp == current_stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_match_their_digest() {
        let a = OpaqueToken::generate();
        let b = OpaqueToken::generate();

        assert_ne!(a.plain(), b.plain());
        assert_eq!(OpaqueToken::digest(a.plain()), a.hash());
        assert_ne!(a.plain(), a.hash());
    }

    #[test]
    fn refresh_token_lifecycle() {
        let stamp = "stamp-1".to_string();
        let token = RefreshToken::new(Uuid::new_v4(), "hash".into(), stamp.clone(), 14);
        let now = Utc::now();

        assert!(token.is_active_for(&stamp, now));
        assert!(!token.is_active_for("stamp-2", now));
        assert!(token.is_expired(now + chrono::Duration::days(15)));

        let mut revoked = token;
        revoked.revoked_at = Some(now);
        assert!(!revoked.is_active_for(&stamp, now));
    }
}
