/// Errors that can occur across the Parrot workspace.
///
/// Library crates return this type directly; the binary converts it to a
/// `miette::Report` at the boundary.
///
/// Empty diffs and diverged histories are not errors: they surface as
/// `Ok(None)` from the fetcher and are filtered out before scoring.
///
/// # Examples
///
/// ```
/// use parrot_core::ParrotError;
///
/// let err = ParrotError::Config("missing GitHub token".into());
/// assert!(err.to_string().contains("missing GitHub token"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ParrotError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The hosting provider rejected a request or could not be reached.
    #[error("provider error: {0}")]
    Provider(String),

    /// Secondary rate limiting persisted past the retry budget.
    #[error("rate limit still in effect for branch '{branch}' after {attempts} attempts")]
    #[diagnostic(help("wait a few minutes, or raise [retry] max_attempts in .parrot.toml"))]
    RateLimitExceeded {
        /// Branch whose fetch was being retried.
        branch: String,
        /// Number of requests issued before giving up.
        attempts: u32,
    },

    /// A comparison was requested against a branch that produced no diff.
    #[error("branch '{0}' has no changes against the baseline")]
    MissingDiff(String),

    /// Malformed user input such as a repository URL.
    #[error("parse error: {0}")]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
