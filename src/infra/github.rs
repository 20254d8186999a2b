//! Source-control host interface and its GitHub REST implementation.

use crate::domain::{CheckRequest, CheckRun, HostError};
use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Name under which every check run is published.
const CHECK_RUN_NAME: &str = "Pixophilic";

/// One entry in a pull request's changed-file listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PullFile {
    pub filename: String,
}

/// Pull-request metadata needed for deferred re-entry validation.
#[derive(Debug, Clone)]
pub struct PullRequestInfo {
    pub number: u64,
    pub state: String,
    pub head_sha: String,
    pub base_sha: String,
}

impl PullRequestInfo {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

/// Narrow interface to the source-control host.
#[async_trait]
pub trait GitHubHost: Send + Sync {
    /// Fetch the decoded content of a file at a ref.
    async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, HostError>;

    /// One page of a pull request's changed-file listing.
    async fn pull_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullFile>, HostError>;

    async fn create_check(&self, request: &CheckRequest) -> Result<CheckRun, HostError>;

    async fn update_check(
        &self,
        check_run_id: u64,
        request: &CheckRequest,
    ) -> Result<CheckRun, HostError>;

    async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo, HostError>;
}

/// GitHub REST v3 client.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    /// Public base URL of this service, for check-run `details_url` links.
    host_url: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str, host_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            host_url: host_url.trim_end_matches('/').to_string(),
        }
    }

    fn details_url(&self, head_sha: &str) -> String {
        format!("{}/pixophilic/complete_check/{}", self.host_url, head_sha)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "pixophilic")
    }

    async fn send_check(
        &self,
        method: reqwest::Method,
        url: &str,
        request: &CheckRequest,
    ) -> Result<CheckRun, HostError> {
        let payload = CheckRunPayload::from_request(request, self.details_url(&request.head_sha));
        let response = self
            .request(method, url)
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        response
            .json::<CheckRun>()
            .await
            .map_err(|e| HostError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GitHubHost for GitHubClient {
    async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, HostError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/contents/{path}?ref={git_ref}",
            self.base_url
        );
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| HostError::Decode(e.to_string()))?;

        // The contents API returns base64 with embedded newlines.
        let packed: String = contents.content.split_whitespace().collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(packed)
            .map_err(|e| HostError::Decode(format!("invalid base64 content: {e}")))?;
        String::from_utf8(bytes).map_err(|e| HostError::Decode(format!("non-utf8 content: {e}")))
    }

    async fn pull_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullFile>, HostError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/pulls/{number}/files?page={page}&per_page={per_page}",
            self.base_url
        );
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        response
            .json::<Vec<PullFile>>()
            .await
            .map_err(|e| HostError::Decode(e.to_string()))
    }

    async fn create_check(&self, request: &CheckRequest) -> Result<CheckRun, HostError> {
        let url = format!(
            "{}/repos/{}/{}/check-runs",
            self.base_url, request.owner, request.repo
        );
        self.send_check(reqwest::Method::POST, &url, request).await
    }

    async fn update_check(
        &self,
        check_run_id: u64,
        request: &CheckRequest,
    ) -> Result<CheckRun, HostError> {
        let url = format!(
            "{}/repos/{}/{}/check-runs/{check_run_id}",
            self.base_url, request.owner, request.repo
        );
        self.send_check(reqwest::Method::PATCH, &url, request).await
    }

    async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo, HostError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_url);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        let pull: PullResponse = response
            .json()
            .await
            .map_err(|e| HostError::Decode(e.to_string()))?;
        Ok(PullRequestInfo {
            number: pull.number,
            state: pull.state,
            head_sha: pull.head.sha,
            base_sha: pull.base.sha,
        })
    }
}

fn transport(e: reqwest::Error) -> HostError {
    HostError::Transport(e.into())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HostError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(HostError::NotFound);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(HostError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    state: String,
    head: CommitRef,
    base: CommitRef,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Serialize)]
struct CheckRunPayload<'a> {
    name: &'static str,
    head_sha: &'a str,
    details_url: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conclusion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a crate::domain::CheckOutput>,
}

impl<'a> CheckRunPayload<'a> {
    fn from_request(request: &'a CheckRequest, details_url: String) -> Self {
        Self {
            name: CHECK_RUN_NAME,
            head_sha: &request.head_sha,
            details_url,
            status: request.status.to_string(),
            conclusion: request.conclusion.map(|c| c.to_string()),
            completed_at: request.completed_at.as_deref(),
            output: request.output.as_ref(),
        }
    }
}
