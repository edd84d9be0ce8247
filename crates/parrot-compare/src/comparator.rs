use std::sync::Arc;

use futures::future::try_join_all;
use parrot_core::{BranchComparison, BranchDiff, ParrotError, RepoCoordinates};
use parrot_github::fetch::DiffFetcher;
use parrot_github::provider::GitProvider;
use serde::Serialize;

use crate::ranker::{rank, Ranked};
use crate::scorer::OverlapScorer;

/// Ranked comparisons for one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoComparisons {
    /// Repository name within the organization.
    pub repo: String,
    /// Comparisons, ascending by ratio.
    pub comparisons: Ranked,
}

/// Drives fetching and scoring over a repository's branches.
pub struct Comparator<P> {
    fetcher: DiffFetcher<P>,
    scorer: OverlapScorer,
}

impl<P: GitProvider> Comparator<P> {
    pub fn new(fetcher: DiffFetcher<P>, scorer: OverlapScorer) -> Self {
        Self { fetcher, scorer }
    }

    pub fn fetcher(&self) -> &DiffFetcher<P> {
        &self.fetcher
    }

    /// Compare every pair of non-baseline branches in `coords`.
    ///
    /// Produces one record per unordered pair of branches that have a diff.
    ///
    /// # Errors
    ///
    /// Aborts on the first provider failure; no partial results are returned.
    pub async fn compare_all(&self, coords: &RepoCoordinates) -> Result<Ranked, ParrotError> {
        let branches = self.candidate_branches(coords).await?;
        tracing::debug!(%coords, branches = branches.len(), "comparing all pairs");

        let diffs = self.fetch_all(coords, &branches).await?;
        let mut comparisons = Vec::with_capacity(diffs.len() * diffs.len().saturating_sub(1) / 2);
        for (i, base) in diffs.iter().enumerate() {
            for other in &diffs[i + 1..] {
                comparisons.push(self.scorer.score(base, other));
            }
        }

        Ok(rank(comparisons))
    }

    /// Compare `branch` against every other non-baseline branch in `coords`.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::MissingDiff`] if `branch` has no diff against
    /// the baseline, or a provider error from any fetch.
    pub async fn compare_one(
        &self,
        coords: &RepoCoordinates,
        branch: &str,
    ) -> Result<Ranked, ParrotError> {
        let others: Vec<String> = self
            .candidate_branches(coords)
            .await?
            .into_iter()
            .filter(|b| b != branch)
            .collect();

        let (base, others) = futures::try_join!(
            self.fetcher.fetch(branch, coords),
            self.fetch_all(coords, &others)
        )?;
        let base = Arc::new(base.ok_or_else(|| ParrotError::MissingDiff(branch.to_string()))?);

        Ok(rank(
            others.iter().map(|other| self.scorer.score(&base, other)).collect(),
        ))
    }

    /// Compare one student's branches across every allow-listed repository
    /// in `org`.
    ///
    /// A branch belongs to the student when its name contains `student`,
    /// ignoring case. Repositories are processed one at a time, in listing
    /// order, and repositories with no matching branch are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::MissingDiff`] if a matching branch has no diff
    /// against the baseline, or a provider error from any fetch.
    pub async fn compare_one_all_repos(
        &self,
        org: &str,
        student: &str,
        allow_list: &[String],
    ) -> Result<Vec<RepoComparisons>, ParrotError> {
        let needle = student.to_lowercase();
        let repos = self.fetcher.provider().list_org_repos(org).await?;

        let mut results = Vec::new();
        for repo in repos.into_iter().filter(|r| allow_list.contains(&r.name)) {
            let coords = RepoCoordinates::new(org, &repo.name);
            let (mine, others): (Vec<String>, Vec<String>) = self
                .candidate_branches(&coords)
                .await?
                .into_iter()
                .partition(|b| b.to_lowercase().contains(&needle));

            if mine.is_empty() {
                tracing::debug!(%coords, student, "no matching branch, skipping");
                continue;
            }

            let (bases, others) = futures::try_join!(
                self.fetch_required(&coords, &mine),
                self.fetch_all(&coords, &others)
            )?;

            let comparisons: Vec<BranchComparison> = bases
                .iter()
                .flat_map(|base| others.iter().map(move |other| (base, other)))
                .map(|(base, other)| self.scorer.score(base, other))
                .collect();

            results.push(RepoComparisons {
                repo: repo.name,
                comparisons: rank(comparisons),
            });
        }

        Ok(results)
    }

    /// Run [`Comparator::compare_all`] over each repository in `repos`,
    /// concurrently.
    pub async fn compare_repos(
        &self,
        org: &str,
        repos: &[String],
    ) -> Result<Vec<RepoComparisons>, ParrotError> {
        try_join_all(repos.iter().map(|name| async move {
            let coords = RepoCoordinates::new(org, name);
            Ok::<_, ParrotError>(RepoComparisons {
                repo: name.clone(),
                comparisons: self.compare_all(&coords).await?,
            })
        }))
        .await
    }

    /// Branch names in `coords` other than the baseline, in listing order.
    async fn candidate_branches(&self, coords: &RepoCoordinates) -> Result<Vec<String>, ParrotError> {
        let baseline = self.fetcher.baseline();
        let branches = self.fetcher.provider().list_branches(coords).await?;
        Ok(branches.into_iter().filter(|b| b != baseline).collect())
    }

    /// Fetch every branch concurrently, failing if any of them has no diff.
    async fn fetch_required(
        &self,
        coords: &RepoCoordinates,
        branches: &[String],
    ) -> Result<Vec<Arc<BranchDiff>>, ParrotError> {
        try_join_all(branches.iter().map(|b| async move {
            self.fetcher
                .fetch(b, coords)
                .await?
                .map(Arc::new)
                .ok_or_else(|| ParrotError::MissingDiff(b.clone()))
        }))
        .await
    }

    /// Fetch every branch concurrently, keeping listing order and dropping
    /// branches without a diff.
    async fn fetch_all(
        &self,
        coords: &RepoCoordinates,
        branches: &[String],
    ) -> Result<Vec<Arc<BranchDiff>>, ParrotError> {
        let diffs = try_join_all(branches.iter().map(|b| self.fetcher.fetch(b, coords))).await?;
        Ok(diffs.into_iter().flatten().map(Arc::new).collect())
    }
}
