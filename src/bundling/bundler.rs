use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::types::{BundleResult, ResolvedUpdate};
use crate::config::BundlerConfig;
use crate::external::CommandExecutor;
use crate::github::types::{CommitIdentity, GitRef, NewCommit, NewTreeEntry, TreeInfo};
use crate::github::GitHubOps;
use crate::resolvers::ResolverChain;
use crate::signing::Signer;

const COMMIT_MESSAGE: &str = "Bundling updated dependencies.";

/// Drives one bundling run end to end: list bot issues, resolve each update
/// locally, and turn the union of touched files into a single branch, commit
/// and pull request.
pub struct Bundler {
    github: Arc<dyn GitHubOps>,
    chain: ResolverChain,
    runner: Arc<dyn CommandExecutor>,
    signer: Option<Arc<dyn Signer>>,
    config: BundlerConfig,
    repo_root: PathBuf,
}

impl Bundler {
    pub fn new(
        github: Arc<dyn GitHubOps>,
        chain: ResolverChain,
        runner: Arc<dyn CommandExecutor>,
        signer: Option<Arc<dyn Signer>>,
        config: BundlerConfig,
    ) -> Self {
        Self::with_repo_root(github, chain, runner, signer, config, PathBuf::from("."))
    }

    pub fn with_repo_root(
        github: Arc<dyn GitHubOps>,
        chain: ResolverChain,
        runner: Arc<dyn CommandExecutor>,
        signer: Option<Arc<dyn Signer>>,
        config: BundlerConfig,
        repo_root: PathBuf,
    ) -> Self {
        Self {
            github,
            chain,
            runner,
            signer,
            config,
            repo_root,
        }
    }

    /// Perform the bundling run. Per-issue failures are skipped; transport
    /// and signing failures abort the run.
    pub async fn bundle(&self) -> Result<BundleResult> {
        println!(
            "🔎 Looking for open pull requests from {}",
            self.config.bot_name
        );
        let issues = self
            .github
            .list_open_issues(&self.config.bot_name)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "listing bot issues failed");
                e
            })
            .context("failed to list open issues")?;

        let mut resolved: Vec<ResolvedUpdate> = Vec::new();
        for issue in &issues {
            if !issue.has_linked_pr {
                tracing::debug!(
                    issue = issue.number,
                    "skipping issue without a linked pull request"
                );
                continue;
            }

            let pr = match self.github.get_pull_request(issue.number).await {
                Ok(pr) => pr,
                Err(e) => {
                    println!(
                        "⚠️  Skipping #{} ({}): failed to fetch pull request: {e}",
                        issue.number, issue.title
                    );
                    continue;
                }
            };

            match self.chain.resolve(&issue.body, &pr.head_ref, &pr.title).await {
                Ok(files) => {
                    println!("✅ Resolved #{} ({})", issue.number, issue.title);
                    resolved.push(ResolvedUpdate {
                        issue_number: issue.number,
                        files,
                    });
                }
                Err(e) => {
                    println!("⚠️  Skipping #{} ({}): {e}", issue.number, issue.title);
                }
            }
        }

        if resolved.is_empty() {
            println!("No pull requests found to bundle, exiting.");
            return Ok(BundleResult::NoCandidates);
        }

        // Union of touched paths; a file shared by several updates is staged once.
        let mut touched: BTreeSet<String> = BTreeSet::new();
        let mut issue_numbers = Vec::with_capacity(resolved.len());
        for update in &resolved {
            touched.extend(update.files.iter().cloned());
            issue_numbers.push(update.issue_number);
        }

        println!(
            "📦 Gathered {} pull requests, opening PR...",
            issue_numbers.len()
        );
        let result = self.open_bundle_pr(&touched, &issue_numbers).await;

        // The working tree goes back to its pre-run state regardless of the
        // PR outcome so the next invocation starts clean.
        self.cleanup(&touched).await;

        result
    }

    async fn open_bundle_pr(
        &self,
        touched: &BTreeSet<String>,
        issues: &[u64],
    ) -> Result<BundleResult> {
        let (bundle_branch, head) = self.open_branch().await?;
        let tree = self.build_tree(&head, touched).await?;
        self.push_commit(&bundle_branch, &head, &tree).await?;

        let body = Self::pr_body(issues);
        let pr = self
            .github
            .create_pull_request(
                &self.config.pr_title,
                &bundle_branch,
                &self.config.target_branch,
                &body,
            )
            .await
            .context("failed to create pull request")?;
        println!("📋 PR created: {}", pr.html_url);

        self.apply_labels(pr.number).await?;

        Ok(BundleResult::Bundled {
            pr_number: pr.number,
            html_url: pr.html_url,
            bundle_branch,
            issues: issues.to_vec(),
        })
    }

    async fn open_branch(&self) -> Result<(String, GitRef)> {
        let base = self
            .github
            .get_branch_ref(&self.config.target_branch)
            .await
            .with_context(|| {
                format!(
                    "failed to read tip of target branch {}",
                    self.config.target_branch
                )
            })?;

        let bundle_branch = self.generate_commit_branch();
        println!("🌿 Creating branch {bundle_branch} from {}", base.sha);
        let head = self
            .github
            .create_branch_ref(&bundle_branch, &base.sha)
            .await
            .context("failed to create bundle branch")?;
        Ok((bundle_branch, head))
    }

    /// Time-derived head branch name, fresh per run.
    fn generate_commit_branch(&self) -> String {
        format!("bundler-{}", Utc::now().timestamp())
    }

    async fn build_tree(&self, head: &GitRef, touched: &BTreeSet<String>) -> Result<TreeInfo> {
        let mut entries = Vec::with_capacity(touched.len());
        for path in touched {
            let content = tokio::fs::read_to_string(self.repo_root.join(path))
                .await
                .with_context(|| format!("failed to read {path}"))?;
            entries.push(NewTreeEntry::blob(path.clone(), content));
        }

        self.github
            .create_tree(&head.sha, entries)
            .await
            .context("failed to create tree")
    }

    async fn push_commit(
        &self,
        bundle_branch: &str,
        head: &GitRef,
        tree: &TreeInfo,
    ) -> Result<()> {
        let parent = self
            .github
            .get_commit(&head.sha)
            .await
            .context("failed to fetch parent commit")?;

        let date = Utc::now();
        let author = CommitIdentity::at(&self.config.author_name, &self.config.author_email, date);

        // A requested signature that cannot be produced aborts the run; the
        // commit is never silently downgraded to unsigned.
        let signature = match &self.signer {
            Some(signer) => {
                let payload = self.commit_payload(&tree.sha, &parent.sha, date);
                Some(signer.sign(&payload).context("failed to sign commit")?)
            }
            None => None,
        };

        let commit = NewCommit {
            message: COMMIT_MESSAGE.to_string(),
            tree: tree.sha.clone(),
            parents: vec![parent.sha.clone()],
            author: author.clone(),
            committer: author,
            signature,
        };
        let created = self
            .github
            .create_commit(commit)
            .await
            .context("failed to create commit")?;

        self.github
            .update_branch_ref(bundle_branch, &created.sha, false)
            .await
            .context("failed to advance bundle branch")?;
        Ok(())
    }

    /// The commit object as git serializes it, the payload a detached
    /// signature must cover.
    fn commit_payload(&self, tree: &str, parent: &str, date: DateTime<Utc>) -> String {
        let identity = format!(
            "{} <{}> {} +0000",
            self.config.author_name,
            self.config.author_email,
            date.timestamp()
        );
        format!(
            "tree {tree}\nparent {parent}\nauthor {identity}\ncommitter {identity}\n\n{COMMIT_MESSAGE}\n"
        )
    }

    fn pr_body(issues: &[u64]) -> String {
        let mut body = String::from("Bundling together PRs:\n");
        for number in issues {
            body.push_str(&format!("#{number}\n"));
        }
        body
    }

    async fn apply_labels(&self, pr_number: u64) -> Result<()> {
        if self.config.labels.is_empty() {
            return Ok(());
        }
        self.github
            .add_labels(pr_number, &self.config.labels)
            .await
            .context("failed to apply labels to the PR")?;
        println!("🏷️  Applied labels: {}", self.config.labels.join(", "));
        Ok(())
    }

    async fn cleanup(&self, touched: &BTreeSet<String>) {
        for path in touched {
            match self
                .runner
                .execute("git", &["checkout", "--", path], &self.repo_root)
                .await
            {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    tracing::warn!(path = %path, output = %output.combined(), "failed to revert file")
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "failed to run git checkout"),
            }
        }
    }
}
