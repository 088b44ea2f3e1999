pub mod client;
pub mod errors;
pub mod types;

pub use client::{GitHubClient, GitHubOps, RefLookup};
pub use errors::GitHubError;
