//! GitHub Actions workflow pin updates.
//!
//! Rewrites every `uses: <action>@<pin>` occurrence under the workflow
//! directory. Version-tag pins move to the `v`-prefixed target version;
//! full-length commit-hash pins are re-resolved against the action
//! repository's tags so the replacement stays a hash.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use super::{ResolveError, UpdateResolver};
use crate::github::RefLookup;

const ECOSYSTEM_MARKER: &str = "github_actions";
const WORKFLOWS_DIR: &str = ".github/workflows";

/// Length of a full commit hash; anything else is treated as a tag pin.
const FULL_HASH_LEN: usize = 40;

fn action_bump_regex() -> &'static Regex {
    static ACTION_BUMP: OnceLock<Regex> = OnceLock::new();
    ACTION_BUMP
        .get_or_init(|| Regex::new(r"Bumps \[(.*)\].*from (.*) to (.*)").expect("static regex"))
}

/// Resolves `github_actions` updates by in-place substitution across the
/// workflow files.
pub struct GithubActionResolver {
    refs: Arc<dyn RefLookup>,
    root: PathBuf,
}

impl GithubActionResolver {
    pub fn new(refs: Arc<dyn RefLookup>) -> Self {
        Self::with_root(refs, PathBuf::from("."))
    }

    pub fn with_root(refs: Arc<dyn RefLookup>, root: PathBuf) -> Self {
        Self { refs, root }
    }

    fn extract_action_bump(description: &str) -> Option<(String, String, String)> {
        let captures = action_bump_regex().captures(description)?;
        Some((
            captures[1].to_string(),
            captures[2].to_string(),
            // dependabot sentences end with a period right after the version
            captures[3].trim_end_matches('.').to_string(),
        ))
    }

    /// The current pin for `action` in `content`, truncated at the first
    /// whitespace since the capture is greedy to end of line.
    fn extract_pinned_value(action: &str, content: &str) -> Option<String> {
        let pin_pattern = Regex::new(&format!(r"uses: {}@(.*)", regex::escape(action)))
            .expect("escaped action name");
        pin_pattern
            .captures(content)
            .and_then(|captures| captures[1].split_whitespace().next().map(str::to_string))
    }

    /// Determine the (old, new) pin values for one workflow file. Hash pins
    /// are re-resolved through the action repository's tags, trying
    /// `tags/<to>` and falling back to `tags/v<to>` only on not-found.
    async fn pin_replacement(
        &self,
        action: &str,
        from: &str,
        to: &str,
        content: &str,
    ) -> Result<(String, String), ResolveError> {
        let pinned = match Self::extract_pinned_value(action, content) {
            Some(pinned) if pinned.len() == FULL_HASH_LEN => pinned,
            _ => return Ok((format!("v{from}"), format!("v{to}"))),
        };

        let mut segments = action.split('/');
        let (owner, repo) = match (segments.next(), segments.next()) {
            (Some(owner), Some(repo)) => (owner, repo),
            _ => {
                return Err(ResolveError::DescriptionNotParsable {
                    reason: format!("couldn't determine owner and repo from action name: {action}"),
                })
            }
        };

        let resolved = match self.refs.get_remote_tag(owner, repo, to).await {
            Ok(reference) => reference,
            Err(err) if err.is_not_found() => {
                self.refs.get_remote_tag(owner, repo, &format!("v{to}")).await?
            }
            Err(err) => return Err(err.into()),
        };

        Ok((pinned, resolved.sha))
    }
}

#[async_trait]
impl UpdateResolver for GithubActionResolver {
    fn recognizes(&self, branch: &str) -> bool {
        branch.contains(ECOSYSTEM_MARKER)
    }

    async fn resolve(
        &self,
        description: &str,
        _branch: &str,
        _title: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let (action, from, to) = Self::extract_action_bump(description).ok_or_else(|| {
            ResolveError::DescriptionNotParsable {
                reason: format!(
                    "failed to extract action name and from -> to version from description: \
                     {description}"
                ),
            }
        })?;

        let mut modified_files = Vec::new();
        let workflows = self.root.join(WORKFLOWS_DIR);
        for entry in walkdir::WalkDir::new(&workflows).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let extension = entry.path().extension().and_then(|ext| ext.to_str());
            if !matches!(extension, Some("yml") | Some("yaml")) {
                continue;
            }

            let content = std::fs::read_to_string(entry.path())?;
            let (old_pin, new_pin) = self.pin_replacement(&action, &from, &to, &content).await?;

            let updated = content.replace(
                &format!("uses: {action}@{old_pin}"),
                &format!("uses: {action}@{new_pin}"),
            );
            if updated == content {
                continue;
            }
            // fs::write truncates in place, leaving the file mode untouched.
            std::fs::write(entry.path(), updated)?;

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            modified_files.push(relative.display().to_string());
        }

        Ok(modified_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{types::GitRef, GitHubError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockRefLookup {
        /// tag name -> SHA; missing tags answer not-found.
        tags: HashMap<String, String>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl MockRefLookup {
        fn empty() -> Self {
            Self {
                tags: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_tag(tag: &str, sha: &str) -> Self {
            let mut tags = HashMap::new();
            tags.insert(tag.to_string(), sha.to_string());
            Self {
                tags,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RefLookup for MockRefLookup {
        async fn get_remote_tag(
            &self,
            owner: &str,
            repo: &str,
            tag: &str,
        ) -> Result<GitRef, GitHubError> {
            self.calls.lock().unwrap().push((
                owner.to_string(),
                repo.to_string(),
                tag.to_string(),
            ));
            match self.tags.get(tag) {
                Some(sha) => Ok(GitRef {
                    ref_name: format!("refs/tags/{tag}"),
                    sha: sha.clone(),
                }),
                None => Err(GitHubError::NotFound {
                    resource: format!("{owner}/{repo} tags/{tag}"),
                }),
            }
        }
    }

    const DESCRIPTION: &str =
        "Bumps [actions/checkout](https://github.com/actions/checkout) from 2 to 3.";
    const OLD_SHA: &str = "aa218f56b14c9653891f9e74264a383fa43fefbd";
    const NEW_SHA: &str = "deadbeefb14c9653891f9e74264a383fa43fefbd";

    fn write_workflow(root: &std::path::Path, name: &str, content: &str) {
        let dir = root.join(WORKFLOWS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_recognizes_github_actions_branches_only() {
        let resolver = GithubActionResolver::new(Arc::new(MockRefLookup::empty()));
        assert!(resolver.recognizes("dependabot/github_actions/actions/checkout-3"));
        assert!(!resolver.recognizes("dependabot/go_modules/github.com/x/y-1.2.3"));
    }

    #[tokio::test]
    async fn test_resolve_rewrites_tag_pin_to_new_version() {
        let temp = tempfile::tempdir().unwrap();
        write_workflow(
            temp.path(),
            "test.yaml",
            "jobs:\n  build:\n    steps:\n      - uses: actions/checkout@v2\n",
        );

        let refs = Arc::new(MockRefLookup::empty());
        let resolver =
            GithubActionResolver::with_root(refs.clone(), temp.path().to_path_buf());

        let files = resolver
            .resolve(DESCRIPTION, "github_actions", "")
            .await
            .unwrap();

        assert_eq!(files, vec![".github/workflows/test.yaml".to_string()]);
        let updated =
            std::fs::read_to_string(temp.path().join(".github/workflows/test.yaml")).unwrap();
        assert!(updated.contains("uses: actions/checkout@v3"));
        assert!(!updated.contains("@v2"));
        // Tag pins never hit the remote API.
        assert!(refs.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_rewrites_hash_pin_to_resolved_tag_sha() {
        let temp = tempfile::tempdir().unwrap();
        write_workflow(
            temp.path(),
            "ci.yml",
            &format!("steps:\n  - uses: actions/checkout@{OLD_SHA}\n"),
        );

        let refs = Arc::new(MockRefLookup::with_tag("3", NEW_SHA));
        let resolver =
            GithubActionResolver::with_root(refs.clone(), temp.path().to_path_buf());

        let files = resolver
            .resolve(DESCRIPTION, "github_actions", "")
            .await
            .unwrap();

        assert_eq!(files, vec![".github/workflows/ci.yml".to_string()]);
        let updated = std::fs::read_to_string(temp.path().join(".github/workflows/ci.yml")).unwrap();
        assert!(updated.contains(&format!("uses: actions/checkout@{NEW_SHA}")));
        assert_eq!(
            refs.calls.lock().unwrap().as_slice(),
            &[(
                "actions".to_string(),
                "checkout".to_string(),
                "3".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_v_prefixed_tag_on_not_found() {
        let temp = tempfile::tempdir().unwrap();
        write_workflow(
            temp.path(),
            "ci.yml",
            &format!("steps:\n  - uses: actions/checkout@{OLD_SHA}\n"),
        );

        let refs = Arc::new(MockRefLookup::with_tag("v3", NEW_SHA));
        let resolver =
            GithubActionResolver::with_root(refs.clone(), temp.path().to_path_buf());

        let files = resolver
            .resolve(DESCRIPTION, "github_actions", "")
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        let calls = refs.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].2, "3");
        assert_eq!(calls[1].2, "v3");
    }

    #[tokio::test]
    async fn test_resolve_skips_files_without_a_substitution() {
        let temp = tempfile::tempdir().unwrap();
        write_workflow(
            temp.path(),
            "release.yaml",
            "steps:\n  - uses: actions/setup-go@v5\n",
        );
        write_workflow(
            temp.path(),
            "test.yaml",
            "steps:\n  - uses: actions/checkout@v2\n",
        );

        let resolver = GithubActionResolver::with_root(
            Arc::new(MockRefLookup::empty()),
            temp.path().to_path_buf(),
        );

        let files = resolver
            .resolve(DESCRIPTION, "github_actions", "")
            .await
            .unwrap();

        assert_eq!(files, vec![".github/workflows/test.yaml".to_string()]);
        let untouched =
            std::fs::read_to_string(temp.path().join(".github/workflows/release.yaml")).unwrap();
        assert!(untouched.contains("actions/setup-go@v5"));
    }

    #[tokio::test]
    async fn test_resolve_fails_on_unparsable_description() {
        let resolver = GithubActionResolver::new(Arc::new(MockRefLookup::empty()));
        let err = resolver
            .resolve("invalid", "github_actions", "")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::DescriptionNotParsable { .. }));
    }
}
