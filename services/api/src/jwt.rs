//! JWT service for access token issuance and validation
//!
//! Tokens carry the identity id, a snapshot of its role and a unique token id
//! (`jti`) used as the revocation handle. The role claim is informational;
//! admin-gated handlers re-read the role from the user store.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use common::{Identity, Role};

/// Signing material
#[derive(Clone)]
pub enum JwtKeys {
    /// Shared secret, HS256
    Hmac(String),
    /// PEM key pair, RS256
    Rsa {
        private_key: String,
        public_key: String,
    },
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtKeys::Hmac(_) => f.write_str("JwtKeys::Hmac(..)"),
            JwtKeys::Rsa { .. } => f.write_str("JwtKeys::Rsa(..)"),
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub keys: JwtKeys,
    /// Access token expiration time in seconds (default: 7 days)
    pub access_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY`: RS256 key pair (PEM or path to PEM file)
    /// - `JWT_SECRET`: HS256 shared secret, used when no key pair is set
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let keys = match (
            std::env::var("JWT_PRIVATE_KEY"),
            std::env::var("JWT_PUBLIC_KEY"),
        ) {
            (Ok(private_key), Ok(public_key)) => JwtKeys::Rsa {
                private_key: read_pem(&private_key)?,
                public_key: read_pem(&public_key)?,
            },
            _ => {
                let secret = std::env::var("JWT_SECRET").map_err(|_| {
                    anyhow::anyhow!("Set JWT_SECRET or both JWT_PRIVATE_KEY and JWT_PUBLIC_KEY")
                })?;
                if secret.len() < 16 {
                    anyhow::bail!("JWT_SECRET must be at least 16 characters");
                }
                JwtKeys::Hmac(secret)
            }
        };

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(604800);

        Ok(JwtConfig {
            keys,
            access_token_expiry,
        })
    }
}

/// Accept inline PEM or a path to a PEM file
fn read_pem(value: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }
    std::fs::read_to_string(value)
        .map(|pem| pem.trim().to_string())
        .map_err(|e| anyhow::anyhow!("Failed to read key file {}: {}", value, e))
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id
    pub sub: Uuid,
    /// Role at issuance
    pub role: Role,
    /// Token id
    pub jti: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

impl Claims {
    /// Seconds until expiry, saturating at zero
    pub fn remaining_lifetime(&self) -> u64 {
        self.exp.saturating_sub(now_secs().unwrap_or(self.exp))
    }
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let (encoding_key, decoding_key, algorithm) = match &config.keys {
            JwtKeys::Hmac(secret) => (
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()),
                Algorithm::HS256,
            ),
            JwtKeys::Rsa {
                private_key,
                public_key,
            } => (
                EncodingKey::from_rsa_pem(private_key.as_bytes())?,
                DecodingKey::from_rsa_pem(public_key.as_bytes())?,
                Algorithm::RS256,
            ),
        };
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            algorithm,
            validation,
            config,
        })
    }

    /// Issue a fresh access token for `identity`
    pub fn issue(&self, identity: &Identity) -> Result<String> {
        let now = now_secs()?;

        let claims = Claims {
            sub: identity.id,
            role: identity.role,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + self.config.access_token_expiry,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}
