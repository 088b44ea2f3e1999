use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bundlebot::bundling::{BundleResult, Bundler};
use bundlebot::config::BundlebotConfig;
use bundlebot::external::ProcessCommandExecutor;
use bundlebot::github::{GitHubClient, GitHubOps, RefLookup};
use bundlebot::resolvers::{GithubActionResolver, GoModuleResolver, ResolverChain};
use bundlebot::signing::{PgpSigner, Signer};

#[derive(Parser)]
#[command(name = "bundlebot")]
#[command(about = "Bundles open dependabot PRs into a single PR")]
#[command(
    long_about = "Bundlebot collects the open dependency-update pull requests a bot account \
                  opened against a repository, re-applies each update locally, and opens one \
                  combined pull request against the target branch."
)]
struct Cli {
    /// GitHub token
    #[arg(long)]
    token: Option<String>,
    /// GitHub organization / owner
    #[arg(long)]
    owner: Option<String>,
    /// GitHub repository
    #[arg(long)]
    repo: Option<String>,
    /// Labels to apply to the bundle PR
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,
    /// Name of the bot whose PRs get bundled
    #[arg(long, help = "Defaults to app/dependabot")]
    bot_name: Option<String>,
    /// Name of the committer
    #[arg(long, help = "Defaults to Github Action")]
    author_name: Option<String>,
    /// Email address of the committer
    #[arg(long, help = "Defaults to the github-actions bot address")]
    author_email: Option<String>,
    /// Branch to open the PR against
    #[arg(long, help = "Defaults to main")]
    target_branch: Option<String>,
    /// Title of the PR that will be created
    #[arg(long)]
    pr_title: Option<String>,
    /// Output extra debug information
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "bundlebot=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tokio::runtime::Runtime::new()?.block_on(async { run(cli).await })
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = BundlebotConfig::load()?;

    // Command-line flags win over file and environment configuration.
    if let Some(token) = cli.token {
        config.github.token = Some(token);
    }
    if let Some(owner) = cli.owner {
        config.github.owner = owner;
    }
    if let Some(repo) = cli.repo {
        config.github.repo = repo;
    }
    if let Some(labels) = cli.labels {
        config.bundler.labels = labels;
    }
    if let Some(bot_name) = cli.bot_name {
        config.bundler.bot_name = bot_name;
    }
    if let Some(author_name) = cli.author_name {
        config.bundler.author_name = author_name;
    }
    if let Some(author_email) = cli.author_email {
        config.bundler.author_email = author_email;
    }
    if let Some(target_branch) = cli.target_branch {
        config.bundler.target_branch = target_branch;
    }
    if let Some(pr_title) = cli.pr_title {
        config.bundler.pr_title = pr_title;
    }

    if config.github.owner.is_empty() || config.github.repo.is_empty() {
        bail!("a repository must be configured; pass --owner and --repo");
    }

    let client = Arc::new(GitHubClient::new(
        config.github.token.as_deref().unwrap_or_default(),
        config.github.owner.clone(),
        config.github.repo.clone(),
    )?);
    let github: Arc<dyn GitHubOps> = client.clone();
    let refs: Arc<dyn RefLookup> = client;

    let runner = Arc::new(ProcessCommandExecutor);
    let chain = ResolverChain::new(vec![
        Box::new(GoModuleResolver::new(runner.clone())),
        Box::new(GithubActionResolver::new(refs)),
    ]);

    // A configured signing bundle that cannot be decoded stops the run here;
    // signing never degrades silently.
    let signer: Option<Arc<dyn Signer>> = match &config.signing {
        Some(signing_config) => Some(Arc::new(PgpSigner::new(signing_config)?)),
        None => None,
    };

    let bundler = Bundler::new(github, chain, runner, signer, config.bundler);
    match bundler.bundle().await? {
        BundleResult::NoCandidates => {}
        BundleResult::Bundled { issues, .. } => {
            println!(
                "🎉 Bundled {} pull requests. Thank you for using bundlebot, goodbye.",
                issues.len()
            );
        }
    }
    Ok(())
}
