//! Excluded-file filtering applied before a branch diff is scored.
//!
//! Package manifests, lockfiles and READMEs change on nearly every branch of
//! an exercise repository, so they are dropped before they can inflate the
//! overlap between two students.

use std::path::Path;

use parrot_core::CompareConfig;

/// Decides which changed files are left out of a [`parrot_core::BranchDiff`].
///
/// # Examples
///
/// ```
/// use parrot_difflens::filter::ExclusionFilter;
///
/// let filter = ExclusionFilter::default_filter();
/// assert!(filter.should_skip("package-lock.json"));
/// assert!(filter.should_skip("client/package.json"));
/// assert!(!filter.should_skip("client/App.tsx"));
/// ```
pub struct ExclusionFilter {
    excluded_names: Vec<String>,
    patterns: Vec<glob::Pattern>,
}

impl ExclusionFilter {
    /// A filter using the default excluded filenames and no patterns.
    pub fn default_filter() -> Self {
        Self::from_config(&CompareConfig::default())
    }

    /// Create a filter from compare configuration.
    ///
    /// Invalid glob patterns are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use parrot_core::CompareConfig;
    /// use parrot_difflens::filter::ExclusionFilter;
    ///
    /// let config = CompareConfig {
    ///     exclude_patterns: vec!["**/*.snap".into()],
    ///     ..CompareConfig::default()
    /// };
    /// let filter = ExclusionFilter::from_config(&config);
    /// assert!(filter.should_skip("client/__snapshots__/App.test.tsx.snap"));
    /// ```
    pub fn from_config(config: &CompareConfig) -> Self {
        let patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();

        Self {
            excluded_names: config.excluded_files.clone(),
            patterns,
        }
    }

    /// Check if a single file path should be skipped.
    pub fn should_skip(&self, path: &str) -> bool {
        self.check_skip(path).is_some()
    }

    /// Return why `path` is excluded, or `None` if it is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use parrot_difflens::filter::{ExclusionFilter, SkipReason};
    ///
    /// let filter = ExclusionFilter::default_filter();
    /// assert!(matches!(
    ///     filter.check_skip("README.md"),
    ///     Some(SkipReason::ExcludedName(_))
    /// ));
    /// ```
    pub fn check_skip(&self, path: &str) -> Option<SkipReason> {
        let file_name = Path::new(path)
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Some(name) = self
            .excluded_names
            .iter()
            .find(|n| n.as_str() == path || n.as_str() == file_name)
        {
            return Some(SkipReason::ExcludedName(name.clone()));
        }

        self.patterns
            .iter()
            .find(|p| p.matches(path))
            .map(|p| SkipReason::PatternMatch(p.to_string()))
    }
}

/// Reason a file was excluded.
///
/// # Examples
///
/// ```
/// use parrot_difflens::filter::SkipReason;
///
/// let reason = SkipReason::ExcludedName("package.json".into());
/// assert_eq!(format!("{reason}"), "excluded: package.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched a configured filename.
    ExcludedName(String),
    /// Matched a configured glob pattern.
    PatternMatch(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ExcludedName(name) => write!(f, "excluded: {name}"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}
