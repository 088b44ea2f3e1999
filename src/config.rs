use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for bundlebot
///
/// Loaded from `bundlebot.toml` and `BUNDLEBOT_*` environment variables;
/// command-line flags override individual fields on top of this.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BundlebotConfig {
    /// GitHub connection settings
    #[serde(default)]
    pub github: GitHubConfig,
    /// Bundling run settings
    #[serde(default)]
    pub bundler: BundlerConfig,
    /// Commit signing key bundle (optional)
    #[serde(default)]
    pub signing: Option<SigningConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token (can be set via env var)
    pub token: Option<String>,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Account whose open PRs get bundled
    pub bot_name: String,
    /// Labels applied to the bundle PR; empty list applies nothing
    pub labels: Vec<String>,
    /// Branch the bundle PR targets
    pub target_branch: String,
    /// Committer identity
    pub author_name: String,
    pub author_email: String,
    /// Title of the bundle PR
    pub pr_title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SigningConfig {
    pub name: String,
    pub email: String,
    /// RSA key size the bundle was generated with
    #[serde(default = "default_key_bits")]
    pub bits: u32,
    /// Armored public key
    pub public_key: String,
    /// Armored private key; without it a requested signature cannot be produced
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
}

fn default_key_bits() -> u32 {
    4096
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None, // Will be read from env var
            owner: String::new(),
            repo: String::new(),
        }
    }
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            bot_name: "app/dependabot".to_string(),
            labels: Vec::new(),
            target_branch: "main".to_string(),
            author_name: "Github Action".to_string(),
            author_email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
            pr_title: "Dependabot Bundler PR".to_string(),
        }
    }
}

impl Default for BundlebotConfig {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            bundler: BundlerConfig::default(),
            signing: None,
        }
    }
}

impl BundlebotConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (bundlebot.toml)
    /// 3. Environment variables (prefixed with BUNDLEBOT_)
    pub fn load() -> Result<Self> {
        Self::load_env_file()?;

        let mut builder = Config::builder();

        if Path::new("bundlebot.toml").exists() {
            builder = builder.add_source(File::with_name("bundlebot"));
        }

        builder = builder.add_source(
            Environment::with_prefix("BUNDLEBOT")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut bundlebot_config: BundlebotConfig = config.try_deserialize()?;

        // Special handling for the GitHub token - check multiple sources
        if bundlebot_config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                bundlebot_config.github.token = Some(token);
            } else if let Ok(token) = std::env::var("BUNDLEBOT_GITHUB_TOKEN") {
                bundlebot_config.github.token = Some(token);
            }
        }

        Ok(bundlebot_config)
    }

    /// Load .env file if it exists
    fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_dependabot_contract() {
        let config = BundlebotConfig::default();
        assert_eq!(config.bundler.bot_name, "app/dependabot");
        assert_eq!(config.bundler.target_branch, "main");
        assert_eq!(config.bundler.author_name, "Github Action");
        assert_eq!(
            config.bundler.author_email,
            "41898282+github-actions[bot]@users.noreply.github.com"
        );
        assert_eq!(config.bundler.pr_title, "Dependabot Bundler PR");
        assert!(config.bundler.labels.is_empty());
        assert!(config.signing.is_none());
    }

    #[test]
    fn test_signing_config_defaults_key_bits() {
        let signing: SigningConfig = toml::from_str(
            r#"
            name = "Bundle Bot"
            email = "bundlebot@example.com"
            public_key = "armored"
            "#,
        )
        .unwrap();
        assert_eq!(signing.bits, 4096);
        assert!(signing.private_key.is_none());
        assert!(signing.passphrase.is_none());
    }
}
