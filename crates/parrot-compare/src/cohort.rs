use chrono::{DateTime, Duration, Utc};
use parrot_core::{BranchComparison, CohortConfig, ParrotError, RepoCoordinates};
use parrot_github::provider::{GitProvider, OrgRepo};
use serde::Serialize;

use crate::comparator::{Comparator, RepoComparisons};

/// Results of sweeping a cohort's recently active repositories.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CohortReport {
    /// Per-repository results, in organization listing order.
    pub repos: Vec<RepoComparisons>,
}

impl CohortReport {
    /// Cross-author comparisons above `threshold` in every repository, most
    /// similar first.
    pub fn alarms(&self, threshold: f64) -> Vec<(&str, &BranchComparison)> {
        let mut alarms: Vec<(&str, &BranchComparison)> = self
            .repos
            .iter()
            .flat_map(|r| {
                r.comparisons
                    .alarms(threshold)
                    .into_iter()
                    .map(move |c| (r.repo.as_str(), c))
            })
            .collect();
        alarms.sort_by(|a, b| b.1.ratio.total_cmp(&a.1.ratio));
        alarms
    }

    /// Total comparisons across all repositories.
    pub fn total_comparisons(&self) -> usize {
        self.repos.iter().map(|r| r.comparisons.len()).sum()
    }
}

/// Names of the exercise repositories currently in play.
///
/// Uses `config.active_repos` when set. Otherwise lists
/// `config.challenges_path` in `config.challenges_repo` and drops entries
/// whose name contains `solution`.
///
/// # Errors
///
/// Returns [`ParrotError::Config`] if `challenges_repo` is not `owner/repo`,
/// or a provider error if the listing fails.
pub async fn challenge_names<P: GitProvider>(
    provider: &P,
    config: &CohortConfig,
) -> Result<Vec<String>, ParrotError> {
    if !config.active_repos.is_empty() {
        return Ok(config.active_repos.clone());
    }

    let (owner, repo) = config.challenges_repo.split_once('/').ok_or_else(|| {
        ParrotError::Config(format!(
            "cohort.challenges_repo must be owner/repo, got '{}'",
            config.challenges_repo
        ))
    })?;
    let coords = RepoCoordinates::new(owner, repo);

    let names = provider
        .list_directory(&coords, &config.challenges_path)
        .await?
        .into_iter()
        .filter(|name| !name.contains("solution"))
        .collect::<Vec<_>>();
    tracing::debug!(%coords, count = names.len(), "loaded challenge names");
    Ok(names)
}

/// Repositories pushed to within `hours` of `now`.
pub fn recently_pushed(repos: Vec<OrgRepo>, hours: u64, now: DateTime<Utc>) -> Vec<OrgRepo> {
    // None when the window reaches past the representable range.
    let since = i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|window| now.checked_sub_signed(window));

    repos
        .into_iter()
        .filter(|r| match (r.pushed_at, since) {
            (Some(pushed), Some(since)) => pushed > since,
            (Some(_), None) => true,
            (None, _) => false,
        })
        .collect()
}

impl<P: GitProvider> Comparator<P> {
    /// Compare all pairs in every allow-listed repository of `org` that was
    /// pushed to within `hours` of `now`.
    pub async fn compare_cohort(
        &self,
        org: &str,
        allow_list: &[String],
        now: DateTime<Utc>,
        hours: u64,
    ) -> Result<CohortReport, ParrotError> {
        let repos = self.fetcher().provider().list_org_repos(org).await?;
        let active: Vec<String> = recently_pushed(repos, hours, now)
            .into_iter()
            .filter(|r| allow_list.contains(&r.name))
            .map(|r| r.name)
            .collect();
        tracing::info!(org, repos = active.len(), "sweeping recently pushed repositories");

        Ok(CohortReport {
            repos: self.compare_repos(org, &active).await?,
        })
    }
}
