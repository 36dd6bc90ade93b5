/// Password hashing compatible with the legacy account store
///
/// Stored credentials are a `(hashed_password, salt)` pair of hex strings:
///
/// - salt empty: `hashed_password = sha1_hex(password)` (legacy, unsalted)
/// - salt set: `hashed_password = sha1_hex(salt + sha1_hex(password))`
///
/// New credentials are always written in the salted form with a fresh random
/// salt. Both forms verify transparently.
///
/// # Example
///
/// ```
/// use depot_shared::auth::password::{hash_for_storage, verify_stored};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stored = hash_for_storage("correct horse")?;
/// assert_eq!(stored.salt.len(), 32);
/// assert!(verify_stored(&stored.hashed_password, &stored.salt, "correct horse"));
/// assert!(!verify_stored(&stored.hashed_password, &stored.salt, "wrong"));
/// # Ok(())
/// # }
/// ```

use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::models::user::User;

/// Error type for password operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
    /// Refusing to store an empty password
    #[error("Password must not be empty")]
    Empty,
}

/// Credential columns as persisted on a user row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPassword {
    pub hashed_password: String,
    pub salt: String,
}

/// Lowercase hex SHA-1 of `input`
pub fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// Hash of `password` under `salt`, using the legacy form when `salt` is empty
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    if salt.is_empty() {
        sha1_hex(password)
    } else {
        sha1_hex(&format!("{}{}", salt, sha1_hex(password)))
    }
}

/// Hashes `password` with a fresh 16-byte random salt
///
/// # Errors
///
/// Returns `PasswordError::Empty` for an empty password.
pub fn hash_for_storage(password: &str) -> Result<StoredPassword, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }

    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    Ok(StoredPassword {
        hashed_password: hash_with_salt(password, &salt),
        salt,
    })
}

/// Checks `password` against a stored hash and salt
pub fn verify_stored(hashed_password: &str, salt: &str, password: &str) -> bool {
    if hashed_password.is_empty() {
        return false;
    }

    let computed = hash_with_salt(password, salt);
    constant_time_eq(computed.as_bytes(), hashed_password.to_ascii_lowercase().as_bytes())
}

/// Checks `password` against the user's stored credential
pub fn verify_password(user: &User, password: &str) -> bool {
    verify_stored(&user.hashed_password, &user.salt, password)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_hex_known_vector() {
        assert_eq!(sha1_hex("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_legacy_unsalted_hash_verifies() {
        let stored = sha1_hex("secret");
        assert!(verify_stored(&stored, "", "secret"));
        assert!(!verify_stored(&stored, "", "Secret"));
    }

    #[test]
    fn test_salted_hash_is_sha1_of_salt_and_inner_hash() {
        let salt = "0123456789abcdef";
        let expected = sha1_hex(&format!("{}{}", salt, sha1_hex("pw")));
        assert_eq!(hash_with_salt("pw", salt), expected);
        assert!(verify_stored(&expected, salt, "pw"));
    }

    #[test]
    fn test_uppercase_stored_hash_verifies() {
        let stored = sha1_hex("secret").to_uppercase();
        assert!(verify_stored(&stored, "", "secret"));
    }

    #[test]
    fn test_hash_for_storage_uses_fresh_salts() {
        let first = hash_for_storage("pw").unwrap();
        let second = hash_for_storage("pw").unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.hashed_password, second.hashed_password);
        assert!(verify_stored(&first.hashed_password, &first.salt, "pw"));
        assert!(verify_stored(&second.hashed_password, &second.salt, "pw"));
    }

    #[test]
    fn test_hash_for_storage_rejects_empty() {
        assert_eq!(hash_for_storage(""), Err(PasswordError::Empty));
    }

    #[test]
    fn test_empty_stored_hash_never_verifies() {
        assert!(!verify_stored("", "", ""));
        assert!(!verify_stored("", "salt", "anything"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
