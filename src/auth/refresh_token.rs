/// Refresh token secrets
///
/// A refresh token is an opaque random string handed to the client once.
/// The server keeps two derived values:
/// - a SHA-256 hex digest, deterministic, used as the lookup key
/// - a bcrypt hash, verified in constant time after lookup

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::TokenError;

/// Both stored forms of one refresh secret
#[derive(Debug, Clone)]
pub struct HashedRefreshToken {
    pub lookup_hash: String,
    pub token_hash: String,
}

/// Fill `len` bytes from the operating system's secure random source.
pub fn secure_random_bytes(len: usize) -> Result<Vec<u8>, TokenError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::RandomnessUnavailable(e.to_string()))?;
    Ok(bytes)
}

/// Generate a new refresh secret of `len` random bytes, encoded as
/// cookie-safe base64 (URL alphabet, no padding).
pub fn generate_refresh_token(len: usize) -> Result<String, TokenError> {
    let bytes = secure_random_bytes(len)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Deterministic lookup digest of a refresh secret
pub fn lookup_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive both stored forms. bcrypt is CPU-bound; call from a blocking
/// context.
pub fn hash_refresh_token(token: &str, cost: u32) -> Result<HashedRefreshToken, TokenError> {
    let token_hash =
        bcrypt::hash(token, cost).map_err(|e| TokenError::Hashing(e.to_string()))?;
    Ok(HashedRefreshToken {
        lookup_hash: lookup_hash(token),
        token_hash,
    })
}

/// Constant-time check of a presented secret against its stored bcrypt hash.
/// A malformed stored hash counts as a mismatch.
pub fn verify_refresh_token(token: &str, token_hash: &str) -> bool {
    match bcrypt::verify(token, token_hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(error = %e, "Stored refresh token hash could not be parsed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token(32).expect("Failed to generate token");

        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        let token1 = generate_refresh_token(32).unwrap();
        let token2 = generate_refresh_token(32).unwrap();

        assert_ne!(token1, token2);
        assert_ne!(lookup_hash(&token1), lookup_hash(&token2));
    }

    #[test]
    fn test_lookup_hash_is_deterministic() {
        let token = generate_refresh_token(32).unwrap();
        let hash1 = lookup_hash(&token);
        let hash2 = lookup_hash(&token);

        assert_eq!(hash1, hash2);
        assert_ne!(token, hash1);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hashed_token_verifies_only_against_its_plaintext() {
        let token = generate_refresh_token(32).unwrap();
        let hashed = hash_refresh_token(&token, TEST_COST).expect("Failed to hash token");

        assert!(hashed.token_hash.starts_with("$2"));
        assert_eq!(hashed.lookup_hash, lookup_hash(&token));
        assert!(verify_refresh_token(&token, &hashed.token_hash));

        let other = generate_refresh_token(32).unwrap();
        assert!(!verify_refresh_token(&other, &hashed.token_hash));
    }

    #[test]
    fn test_malformed_stored_hash_does_not_verify() {
        assert!(!verify_refresh_token("anything", "not-a-bcrypt-hash"));
    }
}
