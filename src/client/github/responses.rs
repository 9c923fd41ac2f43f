//! # Response Types
//!
//! GitHub REST API response structures. Only the fields the updater reads are
//! declared; everything else in the payload is ignored.

use serde::Deserialize;

/// Response from `GET /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    pub path: String,
    pub sha: String,
    /// Base64 content, wrapped at 60 columns with `\n`
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

/// Response from `GET /repos/{owner}/{repo}/git/ref/{ref}`
#[derive(Debug, Deserialize)]
pub struct RefResponse {
    pub object: RefObject,
}

#[derive(Debug, Deserialize)]
pub struct RefObject {
    pub sha: String,
}

/// Response from `POST /repos/{owner}/{repo}/pulls`
#[derive(Debug, Deserialize)]
pub struct PullRequestResponse {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
}

/// GitHub error body
#[derive(Debug, Deserialize)]
pub struct GitHubErrorResponse {
    pub message: String,
}
