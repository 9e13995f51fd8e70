//! GitHub event types
//!
//! Only the fields the handlers actually read are modeled; the rest of the
//! payload stays in the raw JSON value carried by the envelope.

use serde::{Deserialize, Serialize};

/// GitHub user (as appears in webhook payloads)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

/// GitHub repository (as appears in webhook payloads)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub name: String,
    pub owner: GitHubUser,
}

/// App installation reference attached to webhook payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: i64,
}

/// GitHub pull request (as appears in webhook payloads)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPullRequest {
    pub number: i32,
    pub title: String,
}

/// Pull request event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: GitHubPullRequest,
    pub repository: GitHubRepo,
    pub installation: Option<Installation>,
}

/// A commit as it appears in a push event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushCommit {
    pub id: String,
    pub message: String,
}

/// Push event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub commits: Vec<PushCommit>,
    pub repository: GitHubRepo,
    pub installation: Option<Installation>,
}
