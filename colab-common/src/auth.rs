//! Password hashing and session token generation
//!
//! # Password hashing
//!
//! - 16 random salt bytes, hex encoded
//! - hash = SHA-256(salt_hex || password), hex encoded (64 chars)
//! - Verification compares in constant time
//!
//! # Session tokens
//!
//! 32 random bytes, hex encoded (64 chars), sent as
//! `Authorization: Bearer <token>`.
//!
//! This module contains ONLY pure functions; session persistence lives in
//! `db::sessions` and the HTTP middleware in the server crate.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;

/// Hashed password plus the salt it was hashed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt_bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    PasswordHash {
        hash: hash_with_salt(password, &salt),
        salt,
    }
}

/// Check a password against a stored hash and salt
///
/// # Examples
///
/// ```
/// use colab_common::auth::{hash_password, verify_password};
///
/// let stored = hash_password("correct horse");
/// assert!(verify_password("correct horse", &stored.hash, &stored.salt));
/// assert!(!verify_password("wrong horse", &stored.hash, &stored.salt));
/// ```
pub fn verify_password(password: &str, stored_hash: &str, salt: &str) -> bool {
    let calculated = hash_with_salt(password, salt);
    constant_time_eq(calculated.as_bytes(), stored_hash.as_bytes())
}

fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Generate a new random session token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`]
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Trim and lower-case an email, rejecting obviously malformed addresses
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(Error::InvalidInput(format!("Invalid email address: {}", email)));
    }
    Ok(email)
}

/// Extract the token from an `Authorization` header value
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
