//! Password hashing and bearer-token primitives.
//!
//! Credentials are hashed with argon2id; bearer tokens are HS256-signed and
//! carry the user id plus an expiry. Both primitives are external dependencies
//! wrapped thinly here, never reimplemented.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher as _, PasswordVerifier as _,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialError};

/// Argon2id password hashing with policy-upgrade detection
#[derive(Default)]
pub struct PasswordAuthenticator {
    argon2: Argon2<'static>,
}

impl PasswordAuthenticator {
    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2.hash_password(password.as_bytes(), &salt)?;

        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// A mismatch returns `Ok(false)`; a malformed hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a stored hash falls behind the current hashing policy
    pub fn needs_rehash(&self, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)?;

        if parsed_hash.algorithm != argon2::ARGON2ID_IDENT {
            return Ok(true);
        }

        if let Some(m_param) = parsed_hash.params.get_str("m") {
            if let Ok(memory) = m_param.parse::<u32>() {
                if memory < self.argon2.params().m_cost() {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

/// Token payload: the user id and the expiry timestamp
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token authenticates
    pub id: i64,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

/// Issues and validates HS256-signed bearer tokens
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    /// Build an issuer from the shared secret and token lifetime
    #[must_use]
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Sign a token for a user id, expiring after the configured lifetime
    pub fn issue(&self, user_id: i64) -> Result<String> {
        let claims = Claims {
            id: user_id,
            exp: chrono::Utc::now().timestamp() + self.ttl_secs as i64,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Decode a token, returning the authenticated user id.
    ///
    /// Invalid signatures, garbage tokens, and expired tokens all surface as
    /// `Unauthorized`.
    pub fn user_id(&self, token: &str) -> Result<i64> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| SocialError::Unauthorized("Could not validate credentials".to_string()))?;

        Ok(data.claims.id)
    }
}
