// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service account authentication.
//!
//! Access tokens are obtained with the OAuth2 JWT bearer grant: an RS256 assertion
//! signed with the service account's private key is exchanged at the token endpoint.
//! Tokens are cached and refreshed shortly before they expire.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::types::TokenResponse;
use crate::constants::{
    CLOUD_DNS_SCOPE, DEFAULT_TOKEN_URI, JWT_ASSERTION_LIFETIME_SECS, JWT_BEARER_GRANT_TYPE,
    TOKEN_REFRESH_MARGIN_SECS,
};
use crate::dns_errors::AuthError;

/// The fields of a Google service account JSON key that token exchange needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a JSON key file.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidServiceAccountKey`] for malformed JSON or a key
    /// without a client email or private key.
    pub fn from_json(json: &[u8]) -> Result<Self, AuthError> {
        let key: Self =
            serde_json::from_slice(json).map_err(|e| AuthError::InvalidServiceAccountKey {
                reason: e.to_string(),
            })?;

        if key.client_email.trim().is_empty() {
            return Err(AuthError::InvalidServiceAccountKey {
                reason: "client_email is empty".to_string(),
            });
        }
        if key.private_key.trim().is_empty() {
            return Err(AuthError::InvalidServiceAccountKey {
                reason: "private_key is empty".to_string(),
            });
        }
        Ok(key)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Issues and caches access tokens for one service account.
pub struct TokenSource {
    client: reqwest::Client,
    client_email: String,
    key_id: Option<String>,
    encoding_key: EncodingKey,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Build a token source from a key.
    ///
    /// The token endpoint is `token_uri` when given, otherwise the key's own
    /// `token_uri`, otherwise Google's default endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidServiceAccountKey`] if the private key is not an
    /// RSA PEM key.
    pub fn new(
        client: reqwest::Client,
        key: &ServiceAccountKey,
        token_uri: Option<String>,
    ) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            AuthError::InvalidServiceAccountKey {
                reason: format!("private_key: {e}"),
            }
        })?;

        let token_uri = token_uri
            .or_else(|| key.token_uri.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(Self {
            client,
            client_email: key.client_email.clone(),
            key_id: key.private_key_id.clone(),
            encoding_key,
            token_uri,
            cached: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    #[must_use]
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// A valid access token, exchanging a new assertion when the cached one is close
    /// to expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if signing or the token exchange fails.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        let token = self.exchange(now).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_DNS_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + JWT_ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key_id);

        encode(&header, &claims, &self.encoding_key).map_err(|e| AuthError::TokenSigningFailed {
            client_email: self.client_email.clone(),
            reason: e.to_string(),
        })
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, AuthError> {
        let assertion = self.assertion(now)?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT_TYPE)
            .append_pair("assertion", &assertion)
            .finish();

        let failed = |reason: String, status_code: Option<u16>| AuthError::TokenExchangeFailed {
            token_uri: self.token_uri.clone(),
            reason,
            status_code,
        };

        let response = self
            .client
            .post(&self.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| failed(e.to_string(), None))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(failed(text, Some(status.as_u16())));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid token response: {e}"), Some(status.as_u16())))?;

        debug!(
            client_email = %self.client_email,
            expires_in = token.expires_in,
            "Obtained access token"
        );

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + ChronoDuration::seconds(token.expires_in),
        })
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;
