//! Wire types for the GitHub operations the bundler consumes.
//!
//! Octocrab covers issues, pulls and refs with typed builders; the git-data
//! endpoints (trees, commit objects, ref updates) go through its generic
//! HTTP methods with the request/response models below.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One open bot-authored issue, as returned by the listing call.
#[derive(Debug, Clone)]
pub struct CandidateIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    /// Present when the issue is the issue-side of a pull request.
    pub has_linked_pr: bool,
}

/// The subset of a pull request the resolver chain consumes.
#[derive(Debug, Clone)]
pub struct PullRequestInfo {
    pub number: u64,
    /// Head branch name; encodes the ecosystem (`go_modules`, `github_actions`).
    pub head_ref: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct CreatedPullRequest {
    pub number: u64,
    pub html_url: String,
}

/// A git reference resolved to the SHA it points at.
#[derive(Debug, Clone)]
pub struct GitRef {
    pub ref_name: String,
    pub sha: String,
}

/// One file snapshot staged into a new tree. Mode is always `100644` and the
/// entry type `blob`; the bundler never commits anything but regular files.
#[derive(Debug, Clone, Serialize)]
pub struct NewTreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub content: String,
}

impl NewTreeEntry {
    pub fn blob(path: String, content: String) -> Self {
        Self {
            path,
            mode: "100644".to_string(),
            entry_type: "blob".to_string(),
            content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewTreeRequest {
    pub base_tree: String,
    pub tree: Vec<NewTreeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeInfo {
    pub sha: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
    pub date: String,
}

impl CommitIdentity {
    pub fn at(name: &str, email: &str, date: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            date: date.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Request body for creating a commit object. The signature, when present,
/// is an armored detached signature over the canonical commit payload.
#[derive(Debug, Serialize)]
pub struct NewCommit {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
    pub author: CommitIdentity,
    pub committer: CommitIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitCommit {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateRefRequest {
    pub sha: String,
    pub force: bool,
}
