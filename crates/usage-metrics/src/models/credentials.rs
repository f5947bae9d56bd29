//! Service-account credentials

use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Token endpoint used when the service-account JSON omits `token_uri`
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Identity used to authenticate against the analytics API.
///
/// Deserializes from the JSON key file issued for a service account. Unknown
/// fields (`type`, `project_id`, `client_id`, ...) are ignored.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    /// Service account email, used as the assertion issuer
    #[serde(rename = "client_email")]
    pub issuer: String,

    /// PEM-encoded RSA private key
    pub private_key: String,

    /// Identifier of the private key, sent as the JWT `kid`
    pub private_key_id: String,

    /// OAuth2 token endpoint
    #[serde(rename = "token_uri", default = "default_token_uri")]
    pub token_endpoint: String,
}

impl ServiceAccountCredentials {
    /// Parse and validate a service-account JSON document
    pub fn from_json(raw: &str) -> Result<Self> {
        let credentials: Self = serde_json::from_str(raw)
            .map_err(|e| Error::credential(format!("invalid service account JSON: {e}")))?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Check that every field needed to sign an assertion is present.
    ///
    /// The key itself is only parsed when signing.
    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            return Err(Error::credential("client_email is empty"));
        }
        if self.private_key_id.trim().is_empty() {
            return Err(Error::credential("private_key_id is empty"));
        }
        if !self.private_key.contains("-----BEGIN") {
            return Err(Error::credential("private_key is not PEM encoded"));
        }
        Url::parse(&self.token_endpoint)
            .map_err(|e| Error::credential(format!("token_uri is not a valid URL: {e}")))?;
        Ok(())
    }
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("issuer", &self.issuer)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}
