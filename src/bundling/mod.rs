//! Bundling orchestration
//!
//! One run: discover open bot PRs, resolve each update into local file
//! changes, and bundle the union into a single branch, commit and PR.

pub mod bundler;
pub mod types;

pub use bundler::Bundler;
pub use types::{BundleResult, ResolvedUpdate};
