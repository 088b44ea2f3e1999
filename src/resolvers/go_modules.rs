//! Go module updates, applied with `go get -u` in the module's directory.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use super::{ResolveError, UpdateResolver};
use crate::external::CommandExecutor;

const ECOSYSTEM_MARKER: &str = "go_modules";

fn module_name_regex() -> &'static Regex {
    static MODULE_NAME: OnceLock<Regex> = OnceLock::new();
    MODULE_NAME.get_or_init(|| Regex::new(r"Bumps \[(.*)\]").expect("static regex"))
}

/// Matches the `in /<path>` suffix dependabot appends to PR titles when the
/// module lives below the repository root.
fn subdirectory_regex() -> &'static Regex {
    static SUBDIRECTORY: OnceLock<Regex> = OnceLock::new();
    SUBDIRECTORY.get_or_init(|| Regex::new(r" in /(.*)$").expect("static regex"))
}

/// Resolves `go_modules` updates by running the Go toolchain against the
/// manifest named in the PR description.
pub struct GoModuleResolver {
    runner: Arc<dyn CommandExecutor>,
    root: PathBuf,
}

impl GoModuleResolver {
    pub fn new(runner: Arc<dyn CommandExecutor>) -> Self {
        Self::with_root(runner, PathBuf::from("."))
    }

    pub fn with_root(runner: Arc<dyn CommandExecutor>, root: PathBuf) -> Self {
        Self { runner, root }
    }

    fn extract_module_name(description: &str) -> Option<String> {
        module_name_regex()
            .captures(description)
            .map(|captures| captures[1].to_string())
    }

    fn extract_subdirectory(title: &str) -> Option<String> {
        subdirectory_regex()
            .captures(title)
            .map(|captures| captures[1].trim().to_string())
            .filter(|subdir| !subdir.is_empty())
    }
}

#[async_trait]
impl UpdateResolver for GoModuleResolver {
    fn recognizes(&self, branch: &str) -> bool {
        branch.contains(ECOSYSTEM_MARKER)
    }

    async fn resolve(
        &self,
        description: &str,
        _branch: &str,
        title: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let module = Self::extract_module_name(description).ok_or_else(|| {
            ResolveError::DescriptionNotParsable {
                reason: "no module name found in description".to_string(),
            }
        })?;
        let subdirectory = Self::extract_subdirectory(title);

        let workdir = match &subdirectory {
            Some(subdir) => self.root.join(subdir),
            None => self.root.clone(),
        };

        tracing::debug!(module = %module, workdir = %workdir.display(), "updating go module");
        let output = self
            .runner
            .execute("go", &["get", "-u", &module], &workdir)
            .await?;
        if !output.success() {
            return Err(ResolveError::CommandFailed {
                output: output.combined(),
            });
        }

        // The update only ever touches the module manifest and lock file;
        // nothing else may leak into the bundled tree.
        let files = match subdirectory {
            Some(subdir) => vec![
                Path::new(&subdir).join("go.mod").display().to_string(),
                Path::new(&subdir).join("go.sum").display().to_string(),
            ],
            None => vec!["go.mod".to_string(), "go.sum".to_string()],
        };
        Ok(files)
    }
}
