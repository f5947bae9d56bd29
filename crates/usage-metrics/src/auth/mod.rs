//! Service-account authentication
//!
//! Signs a JWT assertion with the service account's private key and trades it
//! for a short-lived bearer token. Nothing here is cached: every invocation
//! signs and exchanges afresh.

pub mod base64url;
mod assertion;
mod token;

pub use assertion::{
    build_assertion, AssertionClaims, SignedAssertion, ANALYTICS_READONLY_SCOPE,
    DEFAULT_ASSERTION_TTL,
};
pub use token::{
    AccessToken, TokenExchanger, TokenRequestEncoding, DEFAULT_TOKEN_LIFETIME_SECS,
    JWT_BEARER_GRANT_TYPE,
};
pub(crate) use token::upstream_payload;
