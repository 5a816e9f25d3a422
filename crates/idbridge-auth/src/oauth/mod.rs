//! OAuth 2.0 authorization-code flow.
//!
//! - [`pkce`] - challenge validation and verifier checks (RFC 7636)
//! - [`store`] - in-process pending sessions and one-time codes
//! - [`client_auth`] - client authentication and redirect URI binding
//! - [`service`] - the flow itself, from authorization request to code redemption
//! - [`token`] - token endpoint request/response types

pub mod client_auth;
pub mod pkce;
pub mod service;
pub mod store;
pub mod token;

pub use client_auth::{ClientAuthError, ClientCredentials, ClientValidator, parse_basic_auth};
pub use pkce::{PkceChallengeMethod, PkceError};
pub use service::{
    AuthorizationRequest, AuthorizationService, AuthorizationStart, CodeRedemption,
    FederationCompletion,
};
pub use store::{AuthSession, AuthorizationCode, SessionCodeStore, SweepStats};
pub use token::{TokenRequest, TokenResponse};
