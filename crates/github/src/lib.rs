//! GitHub integration: webhook signature verification, typed event payloads,
//! App authentication, and the REST client used by handlers.

pub mod auth;
pub mod client;
pub mod events;
pub mod verify;

pub use auth::{AppAuth, AuthError};
pub use client::{ClientError, CommitComment, GitHubClient, IssueComment, PullRequestFile};
pub use events::{
    GitHubPullRequest, GitHubRepo, GitHubUser, Installation, PullRequestEvent, PushCommit,
    PushEvent,
};
pub use verify::verify_signature;
