/// Password Hashing and Verification
///
/// Salted bcrypt hashes. A wrong password is `Ok(false)`; only a stored hash
/// that cannot be parsed (or an unusable input) is an error.

use bcrypt::{hash, verify};

use crate::error::AuthError;

pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;
/// Roughly 100ms per verify on commodity hardware.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password with a fresh salt
    ///
    /// # Errors
    /// `AuthError::Hashing` if the password is empty or bcrypt fails
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        if password.is_empty() {
            return Err(AuthError::Hashing("password is empty".to_string()));
        }

        hash(password, self.cost).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Check a password against a stored hash
    ///
    /// # Errors
    /// `AuthError::Hashing` if the stored hash is malformed or truncated
    pub fn verify(&self, hash: &str, password: &str) -> Result<bool, AuthError> {
        verify(password, hash).map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}
