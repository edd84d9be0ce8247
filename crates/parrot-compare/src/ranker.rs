use parrot_core::{BranchComparison, RepoCoordinates};
use serde::Serialize;

/// Comparisons sorted ascending by ratio, most similar last.
///
/// # Examples
///
/// ```
/// use parrot_compare::ranker::rank;
///
/// let ranked = rank(Vec::new());
/// assert!(ranked.is_empty());
/// assert!(ranked.most_similar().is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Ranked(Vec<BranchComparison>);

/// Sort comparisons ascending by ratio.
///
/// The sort is stable, so equal ratios keep the order they were produced in.
pub fn rank(mut comparisons: Vec<BranchComparison>) -> Ranked {
    comparisons.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));
    Ranked(comparisons)
}

impl Ranked {
    /// Every comparison, ascending.
    pub fn as_slice(&self) -> &[BranchComparison] {
        &self.0
    }

    /// Unwrap into the sorted vector.
    pub fn into_vec(self) -> Vec<BranchComparison> {
        self.0
    }

    /// Number of comparisons.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no comparisons.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate ascending by ratio.
    pub fn iter(&self) -> std::slice::Iter<'_, BranchComparison> {
        self.0.iter()
    }

    /// The `n` highest-ratio comparisons, still ascending. `0` means all.
    pub fn top(&self, n: usize) -> &[BranchComparison] {
        if n == 0 || n >= self.0.len() {
            return &self.0;
        }
        &self.0[self.0.len() - n..]
    }

    /// The highest-ratio comparison.
    pub fn most_similar(&self) -> Option<&BranchComparison> {
        self.0.last()
    }

    /// Comparisons between branches with no author in common.
    pub fn without_solo(&self) -> Vec<&BranchComparison> {
        self.0.iter().filter(|c| !c.is_solo).collect()
    }

    /// Cross-author comparisons above `threshold`, most similar first.
    pub fn alarms(&self, threshold: f64) -> Vec<&BranchComparison> {
        self.0
            .iter()
            .rev()
            .filter(|c| !c.is_solo && c.ratio > threshold)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Ranked {
    type Item = &'a BranchComparison;
    type IntoIter = std::slice::Iter<'a, BranchComparison>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Links showing each side of `comparison` against the baseline.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use parrot_core::{BranchComparison, BranchDiff, RepoCoordinates};
/// use parrot_compare::ranker::compare_links;
///
/// let c = BranchComparison {
///     base: Arc::new(BranchDiff::new("alice")),
///     comparison: Arc::new(BranchDiff::new("bob")),
///     total_overlap: 0,
///     total_additions: 0,
///     ratio: 0.0,
///     is_solo: false,
///     files: vec![],
/// };
/// let coords = RepoCoordinates::new("cohort", "todo");
/// let [a, b] = compare_links("github.com", &coords, "main", &c);
/// assert_eq!(a, "https://github.com/cohort/todo/compare/main...alice");
/// assert_eq!(b, "https://github.com/cohort/todo/compare/main...bob");
/// ```
pub fn compare_links(
    host: &str,
    coords: &RepoCoordinates,
    baseline: &str,
    comparison: &BranchComparison,
) -> [String; 2] {
    let root = compare_root(host, coords);
    [
        format!("{root}{baseline}...{}", comparison.base.name),
        format!("{root}{baseline}...{}", comparison.comparison.name),
    ]
}

/// Links comparing the two branches directly, in both directions.
pub fn head_to_head_links(
    host: &str,
    coords: &RepoCoordinates,
    comparison: &BranchComparison,
) -> [String; 2] {
    let root = compare_root(host, coords);
    let (a, b) = (&comparison.base.name, &comparison.comparison.name);
    [format!("{root}{a}...{b}"), format!("{root}{b}...{a}")]
}

fn compare_root(host: &str, coords: &RepoCoordinates) -> String {
    format!("https://{host}/{}/{}/compare/", coords.owner, coords.repo)
}

/// Render a ratio as a percentage with one decimal place.
///
/// # Examples
///
/// ```
/// use parrot_compare::ranker::percentage;
///
/// assert_eq!(percentage(2.0 / 3.0), "66.7%");
/// assert_eq!(percentage(0.0), "0.0%");
/// ```
pub fn percentage(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
