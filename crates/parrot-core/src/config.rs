use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ParrotError;
use crate::types::MatchMode;

/// Top-level configuration loaded from `.parrot.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use parrot_core::ParrotConfig;
///
/// let config = ParrotConfig::default();
/// assert_eq!(config.compare.baseline, "main");
/// assert_eq!(config.retry.max_attempts, 5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParrotConfig {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Diff acquisition and scoring settings.
    #[serde(default)]
    pub compare: CompareConfig,
    /// Secondary rate-limit retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Report rendering settings.
    #[serde(default)]
    pub report: ReportConfig,
    /// Organization-wide sweep settings.
    #[serde(default)]
    pub cohort: CohortConfig,
}

impl ParrotConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::Io`] if the file cannot be read, or
    /// [`ParrotError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use parrot_core::ParrotConfig;
    /// use std::path::Path;
    ///
    /// let config = ParrotConfig::from_file(Path::new(".parrot.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ParrotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use parrot_core::ParrotConfig;
    ///
    /// let toml = r#"
    /// [compare]
    /// baseline = "master"
    /// "#;
    /// let config = ParrotConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.compare.baseline, "master");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ParrotError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// GitHub API configuration.
///
/// # Examples
///
/// ```
/// use parrot_core::GitHubConfig;
///
/// let config = GitHubConfig::default();
/// assert_eq!(config.api_url, "https://api.github.com");
/// assert_eq!(config.host, "github.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token. Falls back to `GITHUB_TOKEN`, then
    /// `GITHUB_ACCESS_TOKEN`.
    pub token: Option<String>,
    /// REST API root.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Web host used for compare links.
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_host() -> String {
    "github.com".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
            host: default_host(),
        }
    }
}

impl GitHubConfig {
    /// Resolve the token: explicit override, then config, then environment.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::Config`] when no token is available anywhere.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<String, ParrotError> {
        if let Some(token) = explicit.or(self.token.as_deref()) {
            return Ok(token.to_string());
        }
        ["GITHUB_TOKEN", "GITHUB_ACCESS_TOKEN"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                ParrotError::Config(
                    "no GitHub token: pass --token, set [github] token, or export GITHUB_TOKEN"
                        .into(),
                )
            })
    }
}

/// Diff acquisition and scoring configuration.
///
/// # Examples
///
/// ```
/// use parrot_core::{CompareConfig, MatchMode};
///
/// let config = CompareConfig::default();
/// assert_eq!(config.baseline, "main");
/// assert!(config.excluded_files.contains(&"package-lock.json".to_string()));
/// assert_eq!(config.match_mode, MatchMode::Membership);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Reference branch every other branch is diffed against.
    #[serde(default = "default_baseline")]
    pub baseline: String,
    /// Filenames dropped before scoring (matched on full path or basename).
    #[serde(default = "default_excluded_files")]
    pub excluded_files: Vec<String>,
    /// Additional glob patterns dropped before scoring.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Line matching strategy.
    #[serde(default)]
    pub match_mode: MatchMode,
}

fn default_baseline() -> String {
    "main".into()
}

fn default_excluded_files() -> Vec<String> {
    vec![
        "package-lock.json".into(),
        "package.json".into(),
        "README.md".into(),
    ]
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            excluded_files: default_excluded_files(),
            exclude_patterns: Vec::new(),
            match_mode: MatchMode::default(),
        }
    }
}

/// Bounded retry policy for secondary rate limiting.
///
/// # Examples
///
/// ```
/// use parrot_core::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default();
/// assert_eq!(config.max_attempts, 5);
/// assert_eq!(config.max_delay(), Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total requests allowed per fetch, including the first (minimum 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Upper bound on a single provider-requested wait, in seconds.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_max_delay_secs() -> u64 {
    120
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl RetryConfig {
    /// Cap applied to provider-specified retry delays.
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

/// Report rendering configuration.
///
/// # Examples
///
/// ```
/// use parrot_core::ReportConfig;
///
/// let config = ReportConfig::default();
/// assert_eq!(config.top, 5);
/// assert_eq!(config.alert_threshold, 0.9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of highest-ratio pairs to show (0 shows all).
    #[serde(default = "default_top")]
    pub top: usize,
    /// Ratio above which a cross-author pair is flagged.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
}

fn default_top() -> usize {
    5
}

fn default_alert_threshold() -> f64 {
    0.9
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            alert_threshold: default_alert_threshold(),
        }
    }
}

/// Settings for sweeps across every exercise repository in an organization.
///
/// # Examples
///
/// ```
/// use parrot_core::CohortConfig;
///
/// let config = CohortConfig::default();
/// assert!(config.active_repos.is_empty());
/// assert_eq!(config.challenges_path, "packages");
/// assert_eq!(config.recent_hours, 24);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortConfig {
    /// Explicit allow-list of repository names. When empty the list is read
    /// from `challenges_repo`.
    #[serde(default)]
    pub active_repos: Vec<String>,
    /// `owner/repo` whose directory listing names the active exercises.
    #[serde(default = "default_challenges_repo")]
    pub challenges_repo: String,
    /// Directory inside `challenges_repo` holding one entry per exercise.
    #[serde(default = "default_challenges_path")]
    pub challenges_path: String,
    /// Only repositories pushed within this many hours are swept.
    #[serde(default = "default_recent_hours")]
    pub recent_hours: u64,
}

fn default_challenges_repo() -> String {
    "dev-academy-challenges/challenges".into()
}

fn default_challenges_path() -> String {
    "packages".into()
}

fn default_recent_hours() -> u64 {
    24
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            active_repos: Vec::new(),
            challenges_repo: default_challenges_repo(),
            challenges_path: default_challenges_path(),
            recent_hours: default_recent_hours(),
        }
    }
}
