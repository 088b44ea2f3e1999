// Bundlebot Library - Dependabot PR Bundling
// This exposes the core components for testing and integration

pub mod bundling;
pub mod config;
pub mod external;
pub mod github;
pub mod resolvers;
pub mod signing;

// Re-export key types for easy access
pub use bundling::{BundleResult, Bundler, ResolvedUpdate};
pub use config::{BundlebotConfig, BundlerConfig, GitHubConfig, SigningConfig};
pub use external::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use github::{GitHubClient, GitHubError, GitHubOps, RefLookup};
pub use resolvers::{
    GithubActionResolver, GoModuleResolver, ResolveError, ResolverChain, UpdateResolver,
};
pub use signing::{PgpSigner, Signer, SignerError};
