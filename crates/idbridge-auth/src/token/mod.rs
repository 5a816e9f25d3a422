//! Token generation, validation, and lifecycle management.
//!
//! This module provides:
//!
//! - JWT signing and verification for access, refresh and ID tokens
//! - The token lifecycle coordinator (issue, refresh, revoke, introspect)
//! - Token introspection (RFC 7662)
//! - Token revocation (RFC 7009)

pub mod introspection;
pub mod jwt;
pub mod revocation;
pub mod service;

pub use introspection::{IntrospectionRequest, IntrospectionResponse};
pub use jwt::{
    AccessClaims, IdClaims, JwtError, JwtService, RefreshClaims, SignedToken, SigningAlgorithm,
    SigningKey, TokenClaims, TokenKind, TokenLifetimes,
};
pub use revocation::{RevocationRequest, TokenTypeHint, token_fingerprint};
pub use service::{TokenConfig, TokenService, TokenTriple};
