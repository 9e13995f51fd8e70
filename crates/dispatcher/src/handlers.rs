//! Concrete event handlers
//!
//! These are the bot's business logic; the dispatch pipeline treats them as
//! opaque collaborators. Each deserializes the typed view it needs from the
//! envelope payload.

use async_trait::async_trait;
use github::{PullRequestEvent, PushEvent};
use tracing::{debug, info};

use crate::handler::{DispatchContext, EventHandler, HandlerError};

const WELCOME_MESSAGE: &str = "Thanks for opening a new PR! \
    Please follow our contributing guidelines to make your PR easier to review.";

const COMMIT_MESSAGE: &str =
    "Hello from Greetly! 👋\n\nThis comment was automatically added on push.";

/// On `pull_request` / `opened`: fetch the diff and changed files, then post
/// a welcome comment on the PR.
pub struct PrOpenedHandler;

#[async_trait]
impl EventHandler for PrOpenedHandler {
    async fn handle(&self, ctx: DispatchContext<'_>) -> Result<(), HandlerError> {
        let event: PullRequestEvent = serde_json::from_value(ctx.envelope.payload.clone())?;
        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        let number = event.pull_request.number;
        info!(
            "PR #{} opened in {}/{}: {}",
            number, owner, repo, event.pull_request.title
        );

        let diff = ctx.client.get_pull_request_diff(owner, repo, number).await?;
        debug!(diff_bytes = diff.len(), "fetched PR diff");

        let files = ctx
            .client
            .list_pull_request_files(owner, repo, number)
            .await?;
        for file in &files {
            debug!(
                "{} ({}, +{} -{})",
                file.filename, file.status, file.additions, file.deletions
            );
        }

        ctx.client
            .create_issue_comment(owner, repo, number, WELCOME_MESSAGE)
            .await?;
        info!("welcomed PR #{} in {}/{}", number, owner, repo);
        Ok(())
    }
}

/// On `pull_request` / `synchronize`: fetch the diff and changed files for
/// logging only. No comment; one welcome per PR is enough.
pub struct PrSynchronizeHandler;

#[async_trait]
impl EventHandler for PrSynchronizeHandler {
    async fn handle(&self, ctx: DispatchContext<'_>) -> Result<(), HandlerError> {
        let event: PullRequestEvent = serde_json::from_value(ctx.envelope.payload.clone())?;
        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        let number = event.pull_request.number;
        info!(
            "PR #{} synchronized in {}/{}: {}",
            number, owner, repo, event.pull_request.title
        );

        let diff = ctx.client.get_pull_request_diff(owner, repo, number).await?;
        debug!(diff_bytes = diff.len(), "fetched PR diff");

        let files = ctx
            .client
            .list_pull_request_files(owner, repo, number)
            .await?;
        debug!(changed_files = files.len(), "fetched PR file list");
        Ok(())
    }
}

/// On `push`: comment on the last commit of the push.
pub struct PushHandler;

#[async_trait]
impl EventHandler for PushHandler {
    async fn handle(&self, ctx: DispatchContext<'_>) -> Result<(), HandlerError> {
        let event: PushEvent = serde_json::from_value(ctx.envelope.payload.clone())?;

        let commit = match event.commits.last() {
            Some(commit) => commit,
            None => {
                debug!("push with no commits, nothing to do");
                return Ok(());
            }
        };

        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        info!(
            "push to {} in {}/{}, commenting on {}",
            event.git_ref, owner, repo, commit.id
        );

        ctx.client
            .create_commit_comment(owner, repo, &commit.id, COMMIT_MESSAGE)
            .await?;
        Ok(())
    }
}
