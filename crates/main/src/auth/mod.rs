use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use rand::rngs::OsRng;

use crate::util_resp::FailureResponse;

pub mod change_password;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod register;
pub mod settings;

pub fn hash_password(password: &str) -> Result<String, FailureResponse> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("Could not hash password: {e}");
            FailureResponse::ServerError(())
        })
}

/// A stored hash which cannot be parsed never matches.
pub fn password_matches(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {e}");
            false
        }
    }
}
