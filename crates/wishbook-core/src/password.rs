use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use wishbook_types::WishbookError;

/// Hash a plaintext password with Argon2id.
pub(crate) fn hash(plaintext: &str) -> Result<String, WishbookError> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| WishbookError::Upstream(anyhow::anyhow!("password hash: {}", e)))?
        .to_string();
    Ok(digest)
}

/// Constant-time comparison of a plaintext against a stored digest.
pub(crate) fn compare(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}
