//! Password hashing for client and store accounts.
//!
//! Hashes are Argon2id PHC strings, so algorithm parameters and salt travel
//! with the stored digest.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::AppError;

pub trait CredentialService: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;

    /// `Ok(false)` on mismatch; `Err` only when the stored digest is unreadable.
    fn verify(&self, password: &str, digest: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Default, Clone)]
pub struct Argon2Credentials;

impl CredentialService for Argon2Credentials {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, digest: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AppError::Internal(format!("stored password hash is invalid: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!("password verification failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let credentials = Argon2Credentials;
        let digest = credentials.hash("s3nha-forte").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(credentials.verify("s3nha-forte", &digest).unwrap());
        assert!(!credentials.verify("wrong", &digest).unwrap());
    }

    #[test]
    fn garbage_digest_is_an_error() {
        assert!(Argon2Credentials.verify("x", "not-a-phc-string").is_err());
    }
}
