//! Service-account authentication (OAuth2 JWT-bearer grant).
//!
//! The key's RSA private key signs an RS256 assertion naming the
//! requested scopes; the assertion is exchanged at the key's `token_uri`
//! for a short-lived bearer token.
//!
//! Flow: https://developers.google.com/identity/protocols/oauth2/service-account

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use reqwest::Client;
use ring::rand::SystemRandom;
use ring::signature::{self, RsaKeyPair};
use rustls_pemfile::Item;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::DashboardError;

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Assertion lifetime; Google rejects anything over one hour.
const ASSERTION_TTL_SECS: i64 = 3600;

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// A Google service-account key, as downloaded from the cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    pub private_key: SecretString,
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Reject bundles that cannot be a service-account key before any
    /// network traffic happens.
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.key_type != SERVICE_ACCOUNT_TYPE {
            return Err(DashboardError::Auth(format!(
                "expected key type {SERVICE_ACCOUNT_TYPE:?}, got {:?}",
                self.key_type
            )));
        }
        if self.client_email.trim().is_empty() {
            return Err(DashboardError::Auth("client_email is empty".into()));
        }
        if self.token_uri.trim().is_empty() {
            return Err(DashboardError::Auth("token_uri is empty".into()));
        }
        Ok(())
    }
}

/// Load the RSA key pair from the first PEM item in `pem`. Both PKCS#8
/// (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`) keys are
/// accepted; anything after the first item is ignored.
pub fn load_key_pair(pem: &str) -> Result<RsaKeyPair, DashboardError> {
    // Keys pasted from JSON sometimes keep their escaped newlines.
    let pem = pem.replace("\\n", "\n");
    let mut reader = std::io::Cursor::new(pem.as_bytes());
    let item = rustls_pemfile::read_one(&mut reader)
        .map_err(|e| DashboardError::Auth(format!("private_key is not valid PEM: {e}")))?;

    match item {
        Some(Item::Pkcs8Key(der)) => RsaKeyPair::from_pkcs8(der.secret_pkcs8_der())
            .map_err(|e| DashboardError::Auth(format!("PKCS#8 private key rejected: {e}"))),
        Some(Item::Pkcs1Key(der)) => RsaKeyPair::from_der(der.secret_pkcs1_der())
            .map_err(|e| DashboardError::Auth(format!("PKCS#1 private key rejected: {e}"))),
        _ => Err(DashboardError::Auth(
            "private_key holds no RSA private key".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Assertion
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct JwtHeader<'a> {
    alg: &'a str,
    typ: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Build and sign the RS256 JWT assertion for `scopes`.
pub fn build_assertion(
    key: &ServiceAccountKey,
    scopes: &[&str],
    now: DateTime<Utc>,
) -> Result<String, DashboardError> {
    let key_pair = load_key_pair(key.private_key.expose_secret())?;

    let header = JwtHeader {
        alg: "RS256",
        typ: "JWT",
        kid: Some(key.private_key_id.as_str()).filter(|kid| !kid.is_empty()),
    };
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: scopes.join(" "),
        aud: key.token_uri.clone(),
        iat,
        exp: iat + ASSERTION_TTL_SECS,
    };

    let signing_input = format!(
        "{}.{}",
        encode_segment(&header)?,
        encode_segment(&claims)?
    );

    let mut sig = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &signature::RSA_PKCS1_SHA256,
            &SystemRandom::new(),
            signing_input.as_bytes(),
            &mut sig,
        )
        .map_err(|_| DashboardError::Auth("failed to sign assertion".into()))?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(sig)))
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, DashboardError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| DashboardError::Auth(format!("failed to encode assertion: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

// ---------------------------------------------------------------------------
// Token exchange
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    token_type: String,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// A bearer token for the Sheets API.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_in: u64,
}

/// Exchange a freshly signed assertion for an access token.
///
/// Rejections by the token endpoint (4xx) are credential problems and map
/// to [`DashboardError::Auth`]; an unreachable or failing endpoint maps to
/// [`DashboardError::StoreUnavailable`].
pub async fn fetch_access_token(
    http: &Client,
    key: &ServiceAccountKey,
    scopes: &[&str],
) -> Result<AccessToken, DashboardError> {
    let assertion = build_assertion(key, scopes, Utc::now())?;

    debug!(token_uri = %key.token_uri, client_email = %key.client_email, "Requesting access token");

    let resp = http
        .post(&key.token_uri)
        .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| DashboardError::StoreUnavailable(format!("token endpoint unreachable: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<TokenError>(&body)
            .map(|e| format!("{}: {}", e.error, e.error_description))
            .unwrap_or(body);
        return Err(if status.is_client_error() {
            DashboardError::Auth(format!("token request rejected ({status}): {reason}"))
        } else {
            DashboardError::StoreUnavailable(format!("token endpoint error ({status}): {reason}"))
        });
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| DashboardError::Auth(format!("unexpected token response: {e}")))?;

    debug!(
        token_type = %token.token_type,
        expires_in = token.expires_in,
        "Access token issued"
    );

    Ok(AccessToken {
        token: SecretString::new(token.access_token),
        expires_in: token.expires_in,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
