//! Credential digests and signed session tokens.
//!
//! Passwords are stored as the unsalted hex SHA-256 digest of the
//! plaintext. That digest is what the provisioning tool writes and what
//! login compares against, so it must stay stable; only the comparison is
//! hardened to constant time.
//!
//! Sessions are a signed, expiring token rather than a bare identity
//! string: `base64url(name).expiry_unix.signature`, where the signature is
//! a keyed SHA-256 over the first two segments. A token that is absent,
//! malformed, tampered with, or expired verifies to `None`; the caller
//! treats all of those the same way.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};

/// Hex SHA-256 digest of a plaintext password.
pub fn hash_password(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a submitted password against a stored digest in constant time.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let submitted = hash_password(plaintext);
    submitted.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Issues and verifies session tokens for the admin surface.
pub struct SessionAuthority {
    secret: Vec<u8>,
    ttl: Duration,
    cookie_name: String,
}

/// A freshly issued session, ready to be set as a cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub max_age_secs: i64,
}

impl SessionAuthority {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration, cookie_name: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Issue a token asserting `name` until the configured TTL elapses.
    pub fn issue(&self, name: &str) -> IssuedSession {
        self.issue_at(name, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, name: &str, now: OffsetDateTime) -> IssuedSession {
        let expiry = (now + self.ttl).unix_timestamp();
        let payload = format!("{}.{expiry}", URL_SAFE_NO_PAD.encode(name.as_bytes()));
        let signature = self.sign(&payload);
        IssuedSession {
            token: format!("{payload}.{signature}"),
            max_age_secs: self.ttl.whole_seconds(),
        }
    }

    /// Verify a token and return the actor name it asserts.
    pub fn verify(&self, token: &str) -> Option<String> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Option<String> {
        let mut segments = token.splitn(3, '.');
        let encoded_name = segments.next()?;
        let expiry_text = segments.next()?;
        let signature = segments.next()?;

        let payload = format!("{encoded_name}.{expiry_text}");
        let expected = self.sign(&payload);
        let authentic: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();
        if !authentic {
            return None;
        }

        let expiry = expiry_text.parse::<i64>().ok()?;
        if expiry < now.unix_timestamp() {
            return None;
        }

        let name_bytes = URL_SAFE_NO_PAD.decode(encoded_name).ok()?;
        String::from_utf8(name_bytes).ok()
    }

    /// `Set-Cookie` value establishing the session.
    pub fn set_cookie(&self, session: &IssuedSession) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            self.cookie_name, session.token, session.max_age_secs
        )
    }

    /// `Set-Cookie` value clearing the session unconditionally.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; HttpOnly; Path=/; Max-Age=0", self.cookie_name)
    }

    fn sign(&self, payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(b".");
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }
}
