//! Signed JWT assertions for the OAuth2 JWT-bearer grant
//!
//! The assertion is assembled by hand so the header and claim JSON keep a
//! fixed key order; only the RS256 signature itself is delegated to
//! `jsonwebtoken`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{crypto, Algorithm, EncodingKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ServiceAccountCredentials;

use super::base64url;

/// Read-only scope of the analytics reporting API
pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Lifetime recommended for service-account assertions
pub const DEFAULT_ASSERTION_TTL: Duration = Duration::from_secs(3600);

#[derive(Serialize)]
struct AssertionHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    kid: &'a str,
}

/// Claim set of a service-account assertion, in wire key order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service account email
    pub iss: String,
    /// Space-separated scopes requested
    pub scope: String,
    /// Token endpoint the assertion is meant for
    pub aud: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Issue time, seconds since the epoch
    pub iat: i64,
}

/// A compact, signed JWT (`header.claims.signature`)
#[derive(Clone, PartialEq, Eq)]
pub struct SignedAssertion {
    pub(crate) compact: String,
    pub(crate) expires_at: DateTime<Utc>,
}

impl SignedAssertion {
    /// The compact serialization sent to the token endpoint
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// When the assertion stops being accepted
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `header.claims`, the part covered by the signature
    pub fn signing_input(&self) -> &str {
        self.compact
            .rsplit_once('.')
            .map_or(self.compact.as_str(), |(input, _)| input)
    }
}

impl fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("signing_input", &self.signing_input())
            .field("signature", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Build and sign an RS256 assertion for `credentials`.
///
/// Output is deterministic for fixed inputs: PKCS#1 v1.5 signing uses no
/// randomness.
pub fn build_assertion(
    credentials: &ServiceAccountCredentials,
    scope: &str,
    audience: &str,
    issued_at: DateTime<Utc>,
    ttl: Duration,
) -> Result<SignedAssertion> {
    if credentials.private_key.trim().is_empty() {
        return Err(Error::credential("private_key is missing"));
    }
    credentials.validate()?;

    // Keys pasted into environment variables often keep their escaped newlines.
    let pem = credentials.private_key.replace("\\n", "\n");
    let key = EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| Error::credential(format!("private_key is not a valid RSA key: {e}")))?;

    let ttl_secs = i64::try_from(ttl.as_secs())
        .map_err(|_| Error::credential("assertion lifetime out of range"))?;
    let iat = issued_at.timestamp();
    let exp = iat.saturating_add(ttl_secs);

    let header = AssertionHeader {
        alg: "RS256",
        typ: "JWT",
        kid: &credentials.private_key_id,
    };
    let claims = AssertionClaims {
        iss: credentials.issuer.clone(),
        scope: scope.to_string(),
        aud: audience.to_string(),
        exp,
        iat,
    };

    let signing_input = format!(
        "{}.{}",
        base64url::encode(serde_json::to_vec(&header)?),
        base64url::encode(serde_json::to_vec(&claims)?)
    );

    // `crypto::sign` returns the signature already base64url encoded.
    let signature = crypto::sign(signing_input.as_bytes(), &key, Algorithm::RS256)
        .map_err(|e| Error::credential(format!("failed to sign assertion: {e}")))?;

    let expires_at = Utc
        .timestamp_opt(exp, 0)
        .single()
        .ok_or_else(|| Error::credential("assertion expiry out of range"))?;

    Ok(SignedAssertion {
        compact: format!("{signing_input}.{signature}"),
        expires_at,
    })
}
