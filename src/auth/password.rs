/// Password hashing and credential verification
///
/// Passwords are stored as salted bcrypt hashes; verification goes
/// through bcrypt's constant-time comparison.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::error::{AppError, AuthError, TokenError};
use crate::models::User;
use crate::store::UserStore;

/// Hash a password using bcrypt
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Token(TokenError::Hashing(e.to_string())))
}

lazy_static! {
    // Checked against when the username is unknown so both failures cost
    // one bcrypt verification.
    static ref DUMMY_PASSWORD_HASH: Option<String> = hash("no-such-user", DEFAULT_COST).ok();
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Check a username/password pair against the user store.
///
/// # Errors
/// - `AuthError::UserNotFound` when no user has that username; a bcrypt
///   verification still runs so this takes as long as a wrong password
/// - `AuthError::InvalidCredentials` when the password does not match
pub async fn verify_credentials(
    users: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = match users.find_by_username(username).await? {
        Some(user) => user,
        None => {
            let password = password.to_owned();
            tokio::task::spawn_blocking(move || {
                if let Some(dummy) = DUMMY_PASSWORD_HASH.as_deref() {
                    let _ = verify(&password, dummy);
                }
            })
            .await?;
            return Err(AuthError::UserNotFound.into());
        }
    };

    let password = password.to_owned();
    let password_hash = user.password_hash.clone();
    let valid =
        tokio::task::spawn_blocking(move || verify_password(&password, &password_hash)).await??;

    if !valid {
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(user)
}
