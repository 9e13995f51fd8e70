//! Handler and collaborator traits

use async_trait::async_trait;
use github::{AppAuth, AuthError, GitHubClient};
use thiserror::Error;

use crate::envelope::EventEnvelope;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("GitHub API error: {0}")]
    GitHub(#[from] github::ClientError),
    #[error("Malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Everything a handler gets for one dispatch.
///
/// The envelope and client are lent by reference for the duration of the
/// call; a handler cannot retain the client past return, which keeps
/// installation tokens from leaking across requests.
pub struct DispatchContext<'a> {
    pub envelope: &'a EventEnvelope,
    pub client: &'a GitHubClient,
}

/// A registered webhook event handler
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: DispatchContext<'_>) -> Result<(), HandlerError>;
}

/// Produces an authenticated API client scoped to one dispatch.
///
/// Invoked only after a handler has matched, so a rejected or ignored
/// delivery never touches GitHub.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn client_for(&self, installation_id: Option<i64>) -> Result<GitHubClient, AuthError>;
}

#[async_trait]
impl ClientFactory for AppAuth {
    async fn client_for(&self, installation_id: Option<i64>) -> Result<GitHubClient, AuthError> {
        self.installation_client(installation_id).await
    }
}
