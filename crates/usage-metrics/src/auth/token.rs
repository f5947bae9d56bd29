//! Exchange of signed assertions for bearer access tokens

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::SignedAssertion;

/// Grant type of the OAuth2 JWT-bearer flow (RFC 7523)
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Token lifetime assumed when the endpoint does not declare one
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Upper bound on a declared token lifetime
const MAX_TOKEN_LIFETIME_SECS: i64 = u32::MAX as i64;

/// Bearer credential authorizing report queries
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Create a token
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// The raw token, for the `Authorization` header
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// When the token stops being accepted
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body encoding of the token request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenRequestEncoding {
    /// `application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`, as RFC 7523 describes
    Form,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    assertion: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Trades signed assertions for access tokens, one attempt per call
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: Client,
    encoding: TokenRequestEncoding,
    timeout: Duration,
}

impl TokenExchanger {
    /// Create a new token exchanger
    pub fn new(client: Client, encoding: TokenRequestEncoding, timeout: Duration) -> Self {
        Self {
            client,
            encoding,
            timeout,
        }
    }

    /// POST the assertion to `token_endpoint` and read back the access token
    pub async fn exchange(
        &self,
        assertion: &SignedAssertion,
        token_endpoint: &str,
    ) -> Result<AccessToken> {
        let body = TokenRequest {
            grant_type: JWT_BEARER_GRANT_TYPE,
            assertion: assertion.as_str(),
        };

        let request = self.client.post(token_endpoint).timeout(self.timeout);
        let request = match self.encoding {
            TokenRequestEncoding::Json => request.json(&body),
            TokenRequestEncoding::Form => request.form(&body),
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::auth(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::auth(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            let upstream = upstream_payload(&text);
            let detail = upstream
                .as_ref()
                .and_then(|p| p.get("error_description").or_else(|| p.get("error")))
                .and_then(serde_json::Value::as_str)
                .map(|d| format!(": {d}"))
                .unwrap_or_default();
            warn!(status = status.as_u16(), "Token endpoint rejected assertion");
            return Err(Error::Auth {
                message: format!("token endpoint returned {status}{detail}"),
                status: Some(status.as_u16()),
                upstream,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| Error::Auth {
            message: format!("token response is not valid JSON: {e}"),
            status: Some(status.as_u16()),
            upstream: upstream_payload(&text),
        })?;

        let Some(secret) = parsed.access_token.filter(|t| !t.is_empty()) else {
            return Err(Error::Auth {
                message: "token response has no access_token".to_string(),
                status: Some(status.as_u16()),
                upstream: upstream_payload(&text),
            });
        };

        // Out-of-range lifetimes from upstream must not overflow the expiry.
        let lifetime = parsed
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
            .clamp(0, MAX_TOKEN_LIFETIME_SECS);
        let expires_at = Utc::now() + chrono::Duration::seconds(lifetime);
        debug!(expires_at = %expires_at, "Obtained access token");

        Ok(AccessToken::new(secret, expires_at))
    }
}

/// Upstream body as JSON, or as a plain string when it is not JSON
pub(crate) fn upstream_payload(text: &str) -> Option<serde_json::Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn assertion() -> SignedAssertion {
        SignedAssertion {
            compact: "aGVhZGVy.Y2xhaW1z.c2ln".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(3600),
        }
    }

    fn exchanger(encoding: TokenRequestEncoding) -> TokenExchanger {
        TokenExchanger::new(Client::new(), encoding, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn exchanges_assertion_for_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_json(json!({
                "grant_type": JWT_BEARER_GRANT_TYPE,
                "assertion": "aGVhZGVy.Y2xhaW1z.c2ln"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "expires_in": 1800,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let before = Utc::now();
        let token = exchanger(TokenRequestEncoding::Json)
            .exchange(&assertion(), &format!("{}/token", server.uri()))
            .await
            .unwrap();

        assert_eq!(token.secret(), "ya29.token");
        assert!(token.expires_at() >= before + chrono::Duration::seconds(1800));
        assert!(token.expires_at() <= Utc::now() + chrono::Duration::seconds(1800));
    }

    #[tokio::test]
    async fn defaults_lifetime_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })))
            .mount(&server)
            .await;

        let before = Utc::now();
        let token = exchanger(TokenRequestEncoding::Json)
            .exchange(&assertion(), &server.uri())
            .await
            .unwrap();

        assert!(token.expires_at() >= before + chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
    }

    #[tokio::test]
    async fn out_of_range_lifetimes_are_clamped() {
        for (expires_in, max_lifetime) in [(i64::MAX, MAX_TOKEN_LIFETIME_SECS), (-86_400, 0)] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": "tok",
                    "expires_in": expires_in
                })))
                .mount(&server)
                .await;

            let before = Utc::now();
            let token = exchanger(TokenRequestEncoding::Json)
                .exchange(&assertion(), &server.uri())
                .await
                .unwrap();

            assert_eq!(token.secret(), "tok");
            assert!(token.expires_at() >= before + chrono::Duration::seconds(max_lifetime));
            assert!(token.expires_at() <= Utc::now() + chrono::Duration::seconds(max_lifetime));
        }
    }

    #[tokio::test]
    async fn form_encoding_sends_urlencoded_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion=aGVhZGVy.Y2xhaW1z.c2ln"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })))
            .expect(1)
            .mount(&server)
            .await;

        let token = exchanger(TokenRequestEncoding::Form)
            .exchange(&assertion(), &server.uri())
            .await
            .unwrap();
        assert_eq!(token.secret(), "tok");
    }

    #[tokio::test]
    async fn rejection_carries_status_and_upstream_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })))
            .mount(&server)
            .await;

        let err = exchanger(TokenRequestEncoding::Json)
            .exchange(&assertion(), &server.uri())
            .await
            .unwrap_err();

        match err {
            Error::Auth {
                message,
                status,
                upstream,
            } => {
                assert_eq!(status, Some(401));
                assert!(message.contains("Invalid JWT Signature."));
                assert_eq!(upstream.unwrap()["error"], "invalid_grant");
            }
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_access_token_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })))
            .mount(&server)
            .await;

        let err = exchanger(TokenRequestEncoding::Json)
            .exchange(&assertion(), &server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth { status: Some(200), .. }));
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = exchanger(TokenRequestEncoding::Json)
            .exchange(&assertion(), &server.uri())
            .await
            .unwrap_err();
        assert_eq!(err.upstream(), Some(&json!("Bad Gateway")));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_auth_error() {
        let err = exchanger(TokenRequestEncoding::Json)
            .exchange(&assertion(), "http://127.0.0.1:1/token")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth { status: None, .. }));
    }

    #[test]
    fn debug_output_hides_secret() {
        let token = AccessToken::new("ya29.secret", Utc::now());
        assert!(!format!("{token:?}").contains("ya29"));
    }
}
