//! Capabilities the services depend on: password hashing, random tokens and
//! the current time. Injected so tests can swap them out.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use chrono::{DateTime, Utc};

use crate::error::{UserError, UserResult};

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> UserResult<String>;

    /// `false` for a wrong password and for an unreadable hash alike.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id with default parameters, PHC string output.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> UserResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserError::PasswordHash(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is unreadable");
                false
            }
        }
    }
}

pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 32 random bytes, hex encoded (64 characters).
#[derive(Debug, Default, Clone)]
pub struct RandomHexTokenGenerator;

impl TokenGenerator for RandomHexTokenGenerator {
    fn generate(&self) -> String {
        const_hex::encode(rand::random::<[u8; 32]>())
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_hash_and_verify() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
        assert!(!hasher.verify("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = Argon2PasswordHasher;
        assert_ne!(hasher.hash("pw").unwrap(), hasher.hash("pw").unwrap());
    }

    #[test]
    fn test_tokens_are_64_hex_chars() {
        let generator = RandomHexTokenGenerator;
        let token = generator.generate();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generator.generate());
    }
}
