//! Shared-secret authentication for webhook callers.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Why a credential was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No credential, or an empty one, was presented.
    Missing,
    /// A credential was presented but does not match the secret.
    Invalid,
}

/// The result of checking a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// The caller presented the configured secret.
    Authorized,
    /// The caller is refused.
    Rejected(AuthRejection),
}

/// Verifies the shared secret sent by webhook callers.
///
/// Only the SHA-256 digest of the secret is kept. Presented credentials are
/// hashed the same way and the two digests are compared in constant time, so
/// neither the secret's contents nor its length leak through timing.
#[derive(Clone)]
pub struct AuthGate {
    secret_digest: Option<[u8; 32]>,
}

impl AuthGate {
    /// Creates a gate for the given secret. An empty secret rejects every
    /// credential.
    pub fn new(secret: &str) -> Self {
        let secret_digest = (!secret.is_empty()).then(|| digest(secret));
        Self { secret_digest }
    }

    /// Checks a caller-supplied credential.
    pub fn check(&self, credential: Option<&str>) -> AuthDecision {
        let Some(credential) = credential.filter(|c| !c.is_empty()) else {
            return AuthDecision::Rejected(AuthRejection::Missing);
        };

        let Some(expected) = &self.secret_digest else {
            return AuthDecision::Rejected(AuthRejection::Invalid);
        };

        if bool::from(digest(credential).ct_eq(expected)) {
            AuthDecision::Authorized
        } else {
            AuthDecision::Rejected(AuthRejection::Invalid)
        }
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").field("configured", &self.secret_digest.is_some()).finish()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generates a fresh webhook secret suitable for the `server.webhook_secret`
/// setting.
pub fn generate_secret() -> String {
    random_hex(32)
}

/// Generates the identifier attached to each notification.
pub fn generate_error_id() -> String {
    random_hex(12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exact_secret() {
        let gate = AuthGate::new("s3cret");
        assert_eq!(gate.check(Some("s3cret")), AuthDecision::Authorized);
    }

    #[test]
    fn test_rejects_missing_and_empty_credentials() {
        let gate = AuthGate::new("s3cret");
        assert_eq!(gate.check(None), AuthDecision::Rejected(AuthRejection::Missing));
        assert_eq!(gate.check(Some("")), AuthDecision::Rejected(AuthRejection::Missing));
    }

    #[test]
    fn test_rejects_wrong_credentials() {
        let gate = AuthGate::new("s3cret");
        for candidate in ["s3cre", "s3cret ", "S3CRET", "s3cret-and-more", " "] {
            assert_eq!(
                gate.check(Some(candidate)),
                AuthDecision::Rejected(AuthRejection::Invalid),
                "{candidate:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_empty_configured_secret_rejects_everything() {
        let gate = AuthGate::new("");
        assert_eq!(gate.check(Some("anything")), AuthDecision::Rejected(AuthRejection::Invalid));
        assert_eq!(gate.check(Some("")), AuthDecision::Rejected(AuthRejection::Missing));
    }

    #[test]
    fn test_debug_does_not_print_secret() {
        let gate = AuthGate::new("s3cret");
        let printed = format!("{gate:?}");
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn test_generated_values_have_expected_shape() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(hex::decode(&secret).is_ok());
        assert_ne!(secret, generate_secret());

        let error_id = generate_error_id();
        assert_eq!(error_id.len(), 24);
    }
}
