use async_trait::async_trait;
use octocrab::params::repos::Reference;
use octocrab::Octocrab;

use super::errors::GitHubError;
use super::types::{
    CandidateIssue, CreatedPullRequest, GitCommit, GitRef, NewCommit, NewTreeEntry,
    NewTreeRequest, PullRequestInfo, TreeInfo, UpdateRefRequest,
};

/// Page size contract with the issue-listing endpoint.
const ISSUE_PAGE_SIZE: u8 = 100;

/// Trait for the GitHub operations the bundler drives, to enable testing
/// with mocks. Owner and repo are bound at client construction.
#[async_trait]
pub trait GitHubOps: Send + Sync {
    /// Open issues created by `creator`, first page, 100 per page.
    async fn list_open_issues(&self, creator: &str) -> Result<Vec<CandidateIssue>, GitHubError>;
    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo, GitHubError>;
    async fn get_branch_ref(&self, branch: &str) -> Result<GitRef, GitHubError>;
    async fn create_branch_ref(&self, branch: &str, sha: &str) -> Result<GitRef, GitHubError>;
    async fn create_tree(
        &self,
        base_tree: &str,
        entries: Vec<NewTreeEntry>,
    ) -> Result<TreeInfo, GitHubError>;
    async fn get_commit(&self, sha: &str) -> Result<GitCommit, GitHubError>;
    async fn create_commit(&self, commit: NewCommit) -> Result<GitCommit, GitHubError>;
    /// Fast-forward `branch` to `sha`. `force` stays false for bundle refs.
    async fn update_branch_ref(
        &self,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, GitHubError>;
    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<CreatedPullRequest, GitHubError>;
    async fn add_labels(&self, issue_number: u64, labels: &[String]) -> Result<(), GitHubError>;
}

/// Tag lookup against arbitrary repositories. The workflow-pin resolver
/// resolves `actions/checkout`-style names through this, so unlike
/// [`GitHubOps`] the target repository is a parameter.
#[async_trait]
pub trait RefLookup: Send + Sync {
    async fn get_remote_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<GitRef, GitHubError>;
}

#[derive(Debug)]
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(token: &str, owner: String, repo: String) -> Result<Self, GitHubError> {
        if token.is_empty() {
            return Err(GitHubError::TokenNotFound(
                "No GitHub token configured. Set GITHUB_TOKEN or pass --token.".to_string(),
            ));
        }

        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()?;

        Ok(GitHubClient {
            octocrab,
            owner,
            repo,
        })
    }

    fn git_data_route(&self, suffix: &str) -> String {
        format!("/repos/{}/{}/git/{}", self.owner, self.repo, suffix)
    }
}

/// Pull the object SHA out of a reference response.
fn ref_sha(reference: octocrab::models::repos::Ref) -> Result<GitRef, GitHubError> {
    use octocrab::models::repos::Object;

    let sha = match reference.object {
        Object::Commit { sha, .. } => sha,
        Object::Tag { sha, .. } => sha,
        _ => {
            return Err(GitHubError::MalformedResponse(format!(
                "reference {} does not point at a commit or tag",
                reference.ref_field
            )))
        }
    };

    Ok(GitRef {
        ref_name: reference.ref_field,
        sha,
    })
}

#[async_trait]
impl GitHubOps for GitHubClient {
    async fn list_open_issues(&self, creator: &str) -> Result<Vec<CandidateIssue>, GitHubError> {
        let issues = self
            .octocrab
            .issues(&self.owner, &self.repo)
            .list()
            .state(octocrab::params::State::Open)
            .creator(creator.to_string())
            .per_page(ISSUE_PAGE_SIZE)
            .send()
            .await?;

        Ok(issues
            .items
            .into_iter()
            .map(|issue| CandidateIssue {
                id: issue.id.0,
                number: issue.number,
                title: issue.title,
                body: issue.body.unwrap_or_default(),
                author: issue.user.login,
                has_linked_pr: issue.pull_request.is_some(),
            })
            .collect())
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo, GitHubError> {
        let pr = self
            .octocrab
            .pulls(&self.owner, &self.repo)
            .get(number)
            .await?;

        Ok(PullRequestInfo {
            number: pr.number,
            head_ref: pr.head.ref_field.clone(),
            title: pr.title.clone().unwrap_or_default(),
        })
    }

    async fn get_branch_ref(&self, branch: &str) -> Result<GitRef, GitHubError> {
        let reference = self
            .octocrab
            .repos(&self.owner, &self.repo)
            .get_ref(&Reference::Branch(branch.to_string()))
            .await
            .map_err(|e| GitHubError::from_api(e, &format!("heads/{branch}")))?;
        ref_sha(reference)
    }

    async fn create_branch_ref(&self, branch: &str, sha: &str) -> Result<GitRef, GitHubError> {
        let reference = self
            .octocrab
            .repos(&self.owner, &self.repo)
            .create_ref(&Reference::Branch(branch.to_string()), sha)
            .await?;
        ref_sha(reference)
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: Vec<NewTreeEntry>,
    ) -> Result<TreeInfo, GitHubError> {
        let body = NewTreeRequest {
            base_tree: base_tree.to_string(),
            tree: entries,
        };
        let tree: TreeInfo = self
            .octocrab
            .post(self.git_data_route("trees"), Some(&body))
            .await?;
        Ok(tree)
    }

    async fn get_commit(&self, sha: &str) -> Result<GitCommit, GitHubError> {
        let commit: GitCommit = self
            .octocrab
            .get(self.git_data_route(&format!("commits/{sha}")), None::<&()>)
            .await?;
        Ok(commit)
    }

    async fn create_commit(&self, commit: NewCommit) -> Result<GitCommit, GitHubError> {
        let created: GitCommit = self
            .octocrab
            .post(self.git_data_route("commits"), Some(&commit))
            .await?;
        Ok(created)
    }

    async fn update_branch_ref(
        &self,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, GitHubError> {
        let body = UpdateRefRequest {
            sha: sha.to_string(),
            force,
        };
        let reference: octocrab::models::repos::Ref = self
            .octocrab
            .patch(
                self.git_data_route(&format!("refs/heads/{branch}")),
                Some(&body),
            )
            .await?;
        ref_sha(reference)
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<CreatedPullRequest, GitHubError> {
        let pr = self
            .octocrab
            .pulls(&self.owner, &self.repo)
            .create(title, head, base)
            .body(body)
            .send()
            .await?;

        Ok(CreatedPullRequest {
            number: pr.number,
            html_url: pr
                .html_url
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        })
    }

    async fn add_labels(&self, issue_number: u64, labels: &[String]) -> Result<(), GitHubError> {
        self.octocrab
            .issues(&self.owner, &self.repo)
            .add_labels(issue_number, labels)
            .await
            .map_err(GitHubError::ApiError)?;
        Ok(())
    }
}

#[async_trait]
impl RefLookup for GitHubClient {
    async fn get_remote_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<GitRef, GitHubError> {
        let reference = self
            .octocrab
            .repos(owner, repo)
            .get_ref(&Reference::Tag(tag.to_string()))
            .await
            .map_err(|e| GitHubError::from_api(e, &format!("{owner}/{repo} tags/{tag}")))?;
        ref_sha(reference)
    }
}
