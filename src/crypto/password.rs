/// Argon2id password hashing
use crate::error::{LedgerError, LedgerResult};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};

/// Salted one-way hashing of plaintext passwords.
///
/// Digests are PHC strings, so the algorithm parameters and salt travel with
/// the stored value and verification never depends on the current defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Hash a plaintext password with a fresh random salt
    pub fn hash(password: &str) -> LedgerResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| LedgerError::PasswordHash(e.to_string()))?
            .to_string();

        Ok(hash)
    }

    /// Check a candidate password against a stored digest.
    ///
    /// A mismatch is `Ok(false)`; a digest that cannot be parsed is an error.
    pub fn verify(digest: &str, candidate: &str) -> LedgerResult<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| LedgerError::PasswordHash(e.to_string()))?;

        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(LedgerError::PasswordHash(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let digest = PasswordHasher::hash("hunter22").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(PasswordHasher::verify(&digest, "hunter22").unwrap());
        assert!(!PasswordHasher::verify(&digest, "hunter23").unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let first = PasswordHasher::hash("same-password").unwrap();
        let second = PasswordHasher::hash("same-password").unwrap();

        assert_ne!(first, second);
        assert!(PasswordHasher::verify(&second, "same-password").unwrap());
    }

    #[test]
    fn test_malformed_digest_is_error() {
        let result = PasswordHasher::verify("not-a-phc-string", "password");
        assert!(matches!(result, Err(LedgerError::PasswordHash(_))));
    }
}
