//! Core module: handshake authentication and the error taxonomy

pub mod auth;
pub mod error;

pub use auth::{Claims, JwtVerifier, StaticVerifier, TokenVerifier};
pub use error::{AdmissionError, CollaboratorError, ConfigError, HubError, HubResult};
