use octocrab::Error as OctocrabError;

#[derive(Debug)]
pub enum GitHubError {
    TokenNotFound(String),
    ApiError(OctocrabError),
    IoError(std::io::Error),
    /// The requested object does not exist (HTTP 404). Split out from
    /// `ApiError` because the workflow-pin resolver's tag fallback keys on it.
    NotFound { resource: String },
    MalformedResponse(String),
}

impl GitHubError {
    /// Wrap an octocrab error, lifting 404s into `NotFound` for `resource`.
    pub fn from_api(err: OctocrabError, resource: &str) -> Self {
        if let OctocrabError::GitHub { ref source, .. } = err {
            if source.status_code.as_u16() == 404 {
                return GitHubError::NotFound {
                    resource: resource.to_string(),
                };
            }
        }
        GitHubError::ApiError(err)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound { .. })
    }
}

impl From<OctocrabError> for GitHubError {
    fn from(err: OctocrabError) -> Self {
        GitHubError::ApiError(err)
    }
}

impl From<std::io::Error> for GitHubError {
    fn from(err: std::io::Error) -> Self {
        GitHubError::IoError(err)
    }
}

impl std::fmt::Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitHubError::TokenNotFound(msg) => {
                writeln!(f, "GitHub Authentication Error")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "🔑 {msg}\n\n")?;
                writeln!(f, "🔧 QUICK FIXES:")?;
                writeln!(f, "   → Set token directly: export GITHUB_TOKEN=your_token")?;
                writeln!(f, "   → Or: export BUNDLEBOT_GITHUB_TOKEN=your_token")?;
                write!(
                    f,
                    "   → Create token at: https://github.com/settings/tokens (needs 'repo' scope)"
                )
            }
            GitHubError::ApiError(octocrab_err) => {
                writeln!(f, "GitHub API Error")?;
                writeln!(f, "────────────────")?;
                match octocrab_err {
                    // Surface the response body GitHub sent back; transport
                    // failures are fatal and this message is what gets logged.
                    octocrab::Error::GitHub { source, .. } => {
                        write!(f, "🌐 HTTP {}: {}", source.status_code, source.message)
                    }
                    octocrab::Error::Http { .. } => {
                        writeln!(f, "🌐 Network connection failed to GitHub API")?;
                        write!(f, "   → GitHub status: https://status.github.com")
                    }
                    _ => write!(f, "🌐 {octocrab_err}"),
                }
            }
            GitHubError::IoError(io_err) => {
                write!(f, "File System Error: {io_err}")
            }
            GitHubError::NotFound { resource } => {
                write!(f, "Not found: {resource}")
            }
            GitHubError::MalformedResponse(msg) => {
                write!(f, "Malformed GitHub response: {msg}")
            }
        }
    }
}

impl std::error::Error for GitHubError {}
