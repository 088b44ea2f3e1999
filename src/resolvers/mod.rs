//! Ecosystem-specific update resolvers
//!
//! Each resolver turns one dependabot PR description into a concrete local
//! file mutation. Resolvers are tried in order against the PR's head branch
//! name; the first one recognizing the ecosystem performs the update and
//! reports the paths it touched. Iteration is explicit rather than
//! recursive hand-off, keeping control flow flat.

pub mod github_actions;
pub mod go_modules;

use async_trait::async_trait;
use thiserror::Error;

use crate::external::CommandError;
use crate::github::GitHubError;

pub use github_actions::GithubActionResolver;
pub use go_modules::GoModuleResolver;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no resolver recognized the ecosystem of branch: {branch}")]
    UnrecognizedEcosystem { branch: String },
    #[error("description not parsable: {reason}")]
    DescriptionNotParsable { reason: String },
    #[error("update command failed: {output}")]
    CommandFailed { output: String },
    #[error("remote ref lookup failed: {0}")]
    RefLookup(#[from] GitHubError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One node of the resolver chain.
#[async_trait]
pub trait UpdateResolver: Send + Sync {
    /// Whether the head branch name carries this resolver's ecosystem marker.
    fn recognizes(&self, branch: &str) -> bool;

    /// Apply the update described by the PR and return the repo-relative
    /// paths that were modified.
    async fn resolve(
        &self,
        description: &str,
        branch: &str,
        title: &str,
    ) -> Result<Vec<String>, ResolveError>;
}

/// Ordered set of resolvers, tried first-match.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn UpdateResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn UpdateResolver>>) -> Self {
        Self { resolvers }
    }

    pub async fn resolve(
        &self,
        description: &str,
        branch: &str,
        title: &str,
    ) -> Result<Vec<String>, ResolveError> {
        for resolver in &self.resolvers {
            if resolver.recognizes(branch) {
                return resolver.resolve(description, branch, title).await;
            }
        }
        Err(ResolveError::UnrecognizedEcosystem {
            branch: branch.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticResolver {
        marker: &'static str,
        files: Vec<String>,
    }

    #[async_trait]
    impl UpdateResolver for StaticResolver {
        fn recognizes(&self, branch: &str) -> bool {
            branch.contains(self.marker)
        }

        async fn resolve(
            &self,
            _description: &str,
            _branch: &str,
            _title: &str,
        ) -> Result<Vec<String>, ResolveError> {
            Ok(self.files.clone())
        }
    }

    #[tokio::test]
    async fn test_chain_routes_to_first_recognizing_resolver() {
        let chain = ResolverChain::new(vec![
            Box::new(StaticResolver {
                marker: "go_modules",
                files: vec!["go.mod".to_string()],
            }),
            Box::new(StaticResolver {
                marker: "github_actions",
                files: vec![".github/workflows/ci.yaml".to_string()],
            }),
        ]);

        let files = chain
            .resolve("Bumps [x]", "dependabot/github_actions/actions/checkout-3", "")
            .await
            .unwrap();
        assert_eq!(files, vec![".github/workflows/ci.yaml".to_string()]);
    }

    #[tokio::test]
    async fn test_chain_fails_on_unrecognized_ecosystem() {
        let chain = ResolverChain::new(vec![Box::new(StaticResolver {
            marker: "go_modules",
            files: vec![],
        })]);

        let err = chain
            .resolve("Bumps [x]", "dependabot/npm_and_yarn/lodash-4.17.21", "")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnrecognizedEcosystem { .. }));
    }
}
