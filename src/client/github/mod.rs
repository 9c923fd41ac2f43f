//! GitHub REST Client
//!
//! Implements [`GitClient`] against the GitHub REST API v3. Works with
//! github.com and GitHub Enterprise (pass the `/api/v3` endpoint as the base
//! URL) and directly with Pact HTTP mock servers.
//!
//! References:
//! - [Repository contents](https://docs.github.com/en/rest/repos/contents)
//! - [Git references](https://docs.github.com/en/rest/git/refs)
//! - [Pull requests](https://docs.github.com/en/rest/pulls/pulls)

mod requests;
mod responses;

pub use requests::*;
pub use responses::*;

use super::{FileSnapshot, GitClient, GitError, PullRequest, PullRequestInput};
use crate::constants::USER_AGENT;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// GitHub REST client
pub struct GitHubClient {
    http_client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client for the API rooted at `base_url`
    ///
    /// An empty `token` sends unauthenticated requests. `insecure` disables
    /// TLS certificate verification for self-hosted instances.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: &str, token: Option<String>, insecure: bool) -> Result<Self, GitError> {
        if insecure {
            warn!("TLS certificate verification is disabled for {}", base_url);
        }

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(insecure)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an HTTP request with authentication and API headers
    fn make_request<B: Serialize>(&self, method: Method, path: &str, body: Option<&B>) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .http_client
            .request(method, url)
            .header("Accept", "application/vnd.github+json");

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        request
    }

    /// Send a request, turning error statuses into [`GitError::Status`]
    async fn send(&self, request: RequestBuilder, message: String) -> Result<Response, GitError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(message, status, &error_text));
        }
        Ok(response)
    }

    /// Handle GitHub API error responses
    fn handle_error_response(
        message: String,
        status: reqwest::StatusCode,
        error_text: &str,
    ) -> GitError {
        let cause = match serde_json::from_str::<GitHubErrorResponse>(error_text) {
            Ok(error_response) => {
                debug!("GitHub API error ({}): {}", status, error_response.message);
                Some(error_response.message).filter(|m| !m.is_empty())
            }
            Err(_) => {
                debug!("GitHub API error ({}): {}", status, error_text);
                None
            }
        };
        GitError::Status {
            message,
            status: status.as_u16(),
            cause,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GitError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GitError::Decode(e.to_string()))
    }
}

/// GitHub wraps base64 content in newlines
fn decode_content(content: &str, encoding: &str) -> Result<Vec<u8>, GitError> {
    if !encoding.is_empty() && encoding != "base64" {
        return Err(GitError::Decode(format!(
            "unsupported content encoding {encoding}"
        )));
    }
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| GitError::Decode(e.to_string()))
}

#[async_trait]
impl GitClient for GitHubClient {
    async fn get_file(
        &self,
        repo: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<FileSnapshot, GitError> {
        let request = self
            .make_request::<()>(Method::GET, &format!("repos/{repo}/contents/{path}"), None)
            .query(&[("ref", git_ref)]);
        let response = self
            .send(
                request,
                format!("failed to get file {path} from repo {repo} ref {git_ref}"),
            )
            .await?;

        let body: ContentResponse = Self::decode(response).await?;
        Ok(FileSnapshot {
            content: decode_content(&body.content, &body.encoding)?,
            path: body.path,
            sha: body.sha,
        })
    }

    async fn get_branch_head(&self, repo: &str, branch: &str) -> Result<String, GitError> {
        let request =
            self.make_request::<()>(Method::GET, &format!("repos/{repo}/git/ref/heads/{branch}"), None);
        let response = self
            .send(
                request,
                format!("failed to get head of branch {branch} in repo {repo}"),
            )
            .await?;

        let body: RefResponse = Self::decode(response).await?;
        Ok(body.object.sha)
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), GitError> {
        let body = CreateRefRequest::branch(branch, sha);
        let request = self.make_request(Method::POST, &format!("repos/{repo}/git/refs"), Some(&body));
        self.send(
            request,
            format!("failed to create branch {branch} in repo {repo}"),
        )
        .await?;
        Ok(())
    }

    async fn update_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        message: &str,
        previous_sha: &str,
        content: &[u8],
    ) -> Result<(), GitError> {
        let body = UpdateContentRequest {
            message: message.to_string(),
            content: STANDARD.encode(content),
            sha: previous_sha.to_string(),
            branch: branch.to_string(),
        };
        let request =
            self.make_request(Method::PUT, &format!("repos/{repo}/contents/{path}"), Some(&body));
        self.send(
            request,
            format!("failed to update file {path} in repo {repo} branch {branch}"),
        )
        .await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        input: &PullRequestInput,
    ) -> Result<PullRequest, GitError> {
        let body = CreatePullRequestRequest {
            title: input.title.clone(),
            body: input.body.clone(),
            head: input.head.clone(),
            base: input.base.clone(),
        };
        let request = self.make_request(Method::POST, &format!("repos/{repo}/pulls"), Some(&body));
        let response = self
            .send(
                request,
                format!("failed to create pull request in repo {repo}"),
            )
            .await?;

        let body: PullRequestResponse = Self::decode(response).await?;
        Ok(PullRequest {
            number: body.number,
            link: body.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_ignores_line_wrapping() {
        let decoded = decode_content("dGVzdDoKICBpbWFnZTog\nb2xkLWltYWdlCg==\n", "base64").unwrap();
        assert_eq!(decoded, b"test:\n  image: old-image\n");
    }

    #[test]
    fn test_decode_content_rejects_unknown_encoding() {
        assert!(matches!(
            decode_content("abc", "utf-8"),
            Err(GitError::Decode(_))
        ));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = GitHubClient::new(
            "https://api.github.com/",
            Some("secret-token".to_string()),
            false,
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert_eq!(client.base_url(), "https://api.github.com");
    }

    #[test]
    fn test_error_status_format() {
        let err = GitHubClient::handle_error_response(
            "failed to get file config/my/file.yaml from repo Codertocat/Hello-World ref master"
                .to_string(),
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "{\"message\":\"boom\"}",
        );
        assert_eq!(
            err.to_string(),
            "failed to get file config/my/file.yaml from repo Codertocat/Hello-World ref master: (500): boom"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_status_without_json_body() {
        let err = GitHubClient::handle_error_response(
            "failed to create branch test-branch-a in repo Codertocat/Hello-World".to_string(),
            reqwest::StatusCode::BAD_GATEWAY,
            "<html>Bad Gateway</html>",
        );
        assert_eq!(
            err.to_string(),
            "failed to create branch test-branch-a in repo Codertocat/Hello-World: (502)"
        );
    }
}
