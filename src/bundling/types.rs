/// One issue's successful resolution: the files its update touched.
#[derive(Debug, Clone)]
pub struct ResolvedUpdate {
    pub issue_number: u64,
    pub files: Vec<String>,
}

/// Result of a bundling run
#[derive(Debug)]
pub enum BundleResult {
    /// No bot PR resolved; nothing was created and that is a success.
    NoCandidates,
    /// A single bundle PR was created.
    Bundled {
        pr_number: u64,
        html_url: String,
        bundle_branch: String,
        issues: Vec<u64>,
    },
}
