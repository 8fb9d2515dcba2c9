/// JWT access token issuing and validation
///
/// `JwtKeys` is built once at startup from the configured (or freshly
/// generated) secret and shared read-only by every request.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::refresh_token::secure_random_bytes;
use crate::configuration::JwtSettings;
use crate::error::{AuthError, TokenError};

const GENERATED_SECRET_BYTES: usize = 64;

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    access_token_lifetime: Duration,
}

impl JwtKeys {
    /// Build signing keys from an explicit secret.
    ///
    /// # Errors
    /// `TokenError::Signing` if the secret is empty.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        access_token_lifetime: Duration,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Signing("signing secret is empty".to_string()));
        }

        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
            access_token_lifetime,
        })
    }

    /// Use the configured secret, or generate one for this process.
    pub fn from_settings(config: &JwtSettings) -> Result<Self, TokenError> {
        let secret = match &config.secret {
            Some(secret) => secret.trim().as_bytes().to_vec(),
            None => {
                tracing::info!("No JWT secret configured; generating one for this process");
                URL_SAFE
                    .encode(secure_random_bytes(GENERATED_SECRET_BYTES)?)
                    .into_bytes()
            }
        };
        Self::new(&secret, config.issuer.clone(), config.access_token_lifetime())
    }

    pub fn access_token_lifetime(&self) -> Duration {
        self.access_token_lifetime
    }

    /// Issue a signed access token for `user_id`, valid for the configured
    /// lifetime from now.
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, self.access_token_lifetime, self.issuer.clone());
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer and expiry.
    ///
    /// # Errors
    /// `AuthError::TokenExpired` for a well-formed token past its `exp`,
    /// `AuthError::TokenInvalid` for anything else.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!("JWT validation error: {}", e);
                    AuthError::TokenInvalid
                }
            })
    }
}
