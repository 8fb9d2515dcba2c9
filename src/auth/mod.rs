/// Authentication module
///
/// Handles credential verification, JWT access tokens, refresh token
/// secrets, and the login/refresh/logout lifecycle that ties them together.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;
mod sweeper;

pub use claims::{AuthenticatedUser, Claims};
pub use jwt::JwtKeys;
pub use password::{hash_password, verify_credentials, verify_password};
pub use refresh_token::{
    generate_refresh_token, hash_refresh_token, lookup_hash, verify_refresh_token,
    HashedRefreshToken,
};
pub use service::{AuthService, IssuedTokens, TokenPolicy};
pub use sweeper::spawn_refresh_token_sweeper;
