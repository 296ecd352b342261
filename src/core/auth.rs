//! Handshake authentication for the hub
//!
//! Every upgrade request carries a credential token as a query parameter.
//! The token is verified before the upgrade completes: no frame from an
//! unauthenticated connection is ever processed, and a refused handshake
//! leaves no state behind.
//!
//! [`TokenVerifier`] is the seam between the hub and the identity provider.
//! Production deployments use [`JwtVerifier`] against the provider's shared
//! secret; tests use [`StaticVerifier`] with a fixed token → identity map.

use crate::core::error::AdmissionError;
use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Claims the hub reads from an access token
///
/// The identity provider signs more than this; the hub only cares about the
/// subject and the expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated principal
    pub sub: Uuid,
    /// Expiry as a unix timestamp
    pub exp: usize,
}

/// Resolves a credential token to an identity, or refuses it
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify signature and expiry, returning the principal on success
    async fn verify(&self, token: &str) -> Result<Uuid, AdmissionError>;
}

/// JWT verifier backed by the identity provider's HS256 secret
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier with the library's default expiry leeway
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Create a verifier with an explicit expiry leeway in seconds
    pub fn with_leeway(secret: &str, leeway_seconds: u64) -> Self {
        let mut validation = Validation::default();
        validation.leeway = leeway_seconds;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Uuid, AdmissionError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AdmissionError::ExpiredToken,
                _ => AdmissionError::InvalidToken {
                    message: e.to_string(),
                },
            }
        })?;
        Ok(data.claims.sub)
    }
}

/// Fixed token → identity map for tests and development
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, Uuid>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token that resolves to the given identity
    pub fn with_token(mut self, token: &str, user_id: Uuid) -> Self {
        self.tokens.insert(token.to_string(), user_id);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Uuid, AdmissionError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or(AdmissionError::UnknownPrincipal)
    }
}
