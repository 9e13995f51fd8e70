//! GitHub REST API client for fetching PR details and posting comments

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// GitHub API client
///
/// Created per dispatch with an installation token (or no token for
/// unauthenticated reads); never shared across concurrent requests.
pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
}

/// Changed file as returned by the PR files endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
    pub status: String,
    pub additions: i64,
    pub deletions: i64,
    pub changes: i64,
    pub patch: Option<String>,
}

/// Comment as returned by the issue comments endpoint
#[derive(Debug, Deserialize)]
pub struct IssueComment {
    pub id: i64,
    pub body: String,
}

/// Comment as returned by the commit comments endpoint
#[derive(Debug, Deserialize)]
pub struct CommitComment {
    pub id: i64,
    pub body: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        let client = reqwest::Client::new();
        Self { client, token }
    }

    fn headers(&self, accept: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("greetly/0.1"));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(ref token) = self.token {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, val);
            }
        }
        headers
    }

    async fn check(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, ClientError> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .headers(self.headers("application/vnd.github+json"))
            .send()
            .await?;
        Ok(Self::check(resp, url).await?.json().await?)
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        debug!("POST {}", url);
        let resp = self
            .client
            .post(url)
            .headers(self.headers("application/vnd.github+json"))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(resp, url).await?.json().await?)
    }

    /// Fetch the raw diff for a PR
    ///
    /// Uses the diff media type, so the response is the unified diff text
    /// rather than JSON.
    pub async fn get_pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i32,
    ) -> Result<String, ClientError> {
        let url = format!("{}/repos/{}/{}/pulls/{}", API_BASE, owner, repo, pr_number);
        debug!("GET {} (diff)", url);
        let resp = self
            .client
            .get(&url)
            .headers(self.headers("application/vnd.github.v3.diff"))
            .send()
            .await?;
        Ok(Self::check(resp, &url).await?.text().await?)
    }

    /// Fetch the list of files changed in a PR
    pub async fn list_pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i32,
    ) -> Result<Vec<PullRequestFile>, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/files",
            API_BASE, owner, repo, pr_number
        );
        self.get(&url).await
    }

    /// Post a comment on a PR (PR comments go through the issues endpoint)
    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: i32,
        body: &str,
    ) -> Result<IssueComment, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            API_BASE, owner, repo, issue_number
        );
        self.post(&url, json!({ "body": body })).await
    }

    /// Post a comment on a commit
    pub async fn create_commit_comment(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        body: &str,
    ) -> Result<CommitComment, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}/comments",
            API_BASE, owner, repo, commit_sha
        );
        self.post(&url, json!({ "body": body })).await
    }
}
