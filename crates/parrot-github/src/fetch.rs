use std::time::Duration;

use parrot_core::{BranchDiff, CompareConfig, ParrotError, RepoCoordinates, RetryConfig};
use parrot_difflens::filter::ExclusionFilter;
use parrot_difflens::patch::file_diff;

use crate::provider::{Comparison, GitProvider, ProviderError};

/// Bounded retry policy for secondary rate limiting.
///
/// # Examples
///
/// ```
/// use parrot_core::RetryConfig;
/// use parrot_github::fetch::RetryPolicy;
///
/// let policy = RetryPolicy::from_config(&RetryConfig::default());
/// assert_eq!(policy.max_attempts, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total requests allowed per fetch, including the first.
    pub max_attempts: u32,
    /// Cap on any single provider-requested wait.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy from configuration. At least one attempt is always made.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            max_delay: config.max_delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Retrieves and normalizes one branch's changes against the baseline.
pub struct DiffFetcher<P> {
    provider: P,
    baseline: String,
    filter: ExclusionFilter,
    retry: RetryPolicy,
}

impl<P: GitProvider> DiffFetcher<P> {
    /// Create a fetcher comparing against `config.baseline` with
    /// `config`'s exclusions.
    pub fn new(provider: P, config: &CompareConfig, retry: RetryPolicy) -> Self {
        Self {
            provider,
            baseline: config.baseline.clone(),
            filter: ExclusionFilter::from_config(config),
            retry,
        }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Baseline ref every branch is compared against.
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Fetch `branch`'s diff against the baseline.
    ///
    /// Returns `Ok(None)` for the baseline itself, for branches with no
    /// changed files, and for branches whose history diverged from the
    /// baseline. Secondary rate limits are waited out and retried up to the
    /// policy's attempt budget.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::RateLimitExceeded`] when the budget runs out,
    /// or [`ParrotError::Provider`] for any other provider failure.
    pub async fn fetch(
        &self,
        branch: &str,
        coords: &RepoCoordinates,
    ) -> Result<Option<BranchDiff>, ParrotError> {
        if branch == self.baseline {
            return Ok(None);
        }

        let mut attempts = 0;
        let comparison = loop {
            attempts += 1;
            match self.provider.compare(coords, &self.baseline, branch).await {
                Ok(comparison) => break comparison,
                Err(ProviderError::NotFound) => {
                    tracing::debug!(%coords, branch, "no common history with baseline, skipping");
                    return Ok(None);
                }
                Err(ProviderError::RateLimited { retry_after }) => {
                    if attempts >= self.retry.max_attempts {
                        return Err(ParrotError::RateLimitExceeded {
                            branch: branch.to_string(),
                            attempts,
                        });
                    }
                    let wait = retry_after.min(self.retry.max_delay);
                    tracing::warn!(
                        %coords,
                        branch,
                        attempt = attempts,
                        wait_secs = wait.as_secs(),
                        "secondary rate limit hit, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => return Err(err.into()),
            }
        };

        Ok(self.normalize(branch, comparison))
    }

    /// Turn a provider comparison into a [`BranchDiff`].
    ///
    /// Returns `None` when the provider reported no changed files at all.
    pub fn normalize(&self, branch: &str, comparison: Comparison) -> Option<BranchDiff> {
        if comparison.files.is_empty() {
            return None;
        }

        let mut diff = BranchDiff::new(branch);

        for commit in &comparison.commits {
            if let Some(identity) = commit.identity() {
                diff.authors.insert(identity.to_string());
            }
            if let Some(date) = commit.authored_at() {
                if diff.pushed_at.map_or(true, |latest| date > latest) {
                    diff.pushed_at = Some(date);
                }
            }
        }

        for file in comparison.files {
            if let Some(reason) = self.filter.check_skip(&file.filename) {
                tracing::trace!(branch, file = %file.filename, %reason, "excluded");
                continue;
            }
            let key = file.match_key().to_string();
            diff.files.insert(key, file_diff(file.patch, file.additions));
        }

        Some(diff)
    }
}
