//! GitHub App authentication
//!
//! A GitHub App authenticates in two steps: it signs a short-lived RS256 JWT
//! with its private key, then exchanges that JWT for an installation access
//! token scoped to one installation. The token authorizes the REST calls the
//! handlers make.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::client::GitHubClient;

const API_BASE: &str = "https://api.github.com";

/// GitHub caps App JWT lifetime at 10 minutes; stay under it and allow for
/// clock drift on the issued-at claim.
const JWT_DRIFT_SECS: i64 = 60;
const JWT_TTL_SECS: i64 = 9 * 60;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid private key: {0}")]
    InvalidKey(jsonwebtoken::errors::Error),
    #[error("JWT signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("Token exchange failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token exchange rejected: {status} - {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Serialize)]
struct AppJwtClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    token: String,
}

/// Authenticates as a GitHub App and mints per-installation clients.
///
/// Holds the App ID and parsed private key; both are immutable after
/// construction and safe to share across concurrent dispatches.
pub struct AppAuth {
    app_id: String,
    key: EncodingKey,
    http: reqwest::Client,
}

impl AppAuth {
    /// Parse the App's RSA private key PEM and build the authenticator
    pub fn new(app_id: impl Into<String>, private_key_pem: &str) -> Result<Self, AuthError> {
        let key =
            EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(AuthError::InvalidKey)?;
        Ok(Self {
            app_id: app_id.into(),
            key,
            http: reqwest::Client::new(),
        })
    }

    fn app_jwt(&self) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AppJwtClaims {
            iat: now - JWT_DRIFT_SECS,
            exp: now + JWT_TTL_SECS,
            iss: self.app_id.clone(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key).map_err(AuthError::Signing)
    }

    /// Exchange the App JWT for an installation access token
    pub async fn installation_token(&self, installation_id: i64) -> Result<String, AuthError> {
        let jwt = self.app_jwt()?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            API_BASE, installation_id
        );
        debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header("User-Agent", "greetly/0.1")
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(jwt)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: AccessTokenResponse = resp.json().await?;
        Ok(token.token)
    }

    /// Build a REST client scoped to one installation.
    ///
    /// Events without an installation reference get an unauthenticated
    /// client; public-repo reads still work, writes will be rejected by
    /// GitHub.
    pub async fn installation_client(
        &self,
        installation_id: Option<i64>,
    ) -> Result<GitHubClient, AuthError> {
        match installation_id {
            Some(id) => {
                let token = self.installation_token(id).await?;
                Ok(GitHubClient::new(Some(token)))
            }
            None => Ok(GitHubClient::new(None)),
        }
    }
}
