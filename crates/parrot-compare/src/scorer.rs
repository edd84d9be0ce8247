use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parrot_core::{BranchComparison, BranchDiff, FileOverlap, MatchMode};

use crate::ranker::percentage;

/// Scores two branch diffs by shared added lines.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use parrot_core::{BranchDiff, FileDiff, MatchMode};
/// use parrot_compare::scorer::OverlapScorer;
///
/// let mut base = BranchDiff::new("alice");
/// base.files.insert("app.ts".into(), FileDiff {
///     patch: None,
///     added_lines: vec!["x".into(), "y".into()],
///     addition_count: 2,
/// });
/// let mut other = BranchDiff::new("bob");
/// other.files.insert("app.ts".into(), FileDiff {
///     patch: None,
///     added_lines: vec!["y".into()],
///     addition_count: 1,
/// });
///
/// let scorer = OverlapScorer::new(MatchMode::Membership, false);
/// let result = scorer.score(&Arc::new(base), &Arc::new(other));
/// assert_eq!(result.total_overlap, 1);
/// assert_eq!(result.ratio, 0.5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapScorer {
    mode: MatchMode,
    verbose: bool,
}

impl OverlapScorer {
    /// Create a scorer. `verbose` logs a per-file breakdown of every pair.
    pub fn new(mode: MatchMode, verbose: bool) -> Self {
        Self { mode, verbose }
    }

    /// Score `base` against `comparison`.
    ///
    /// Only files present on both sides contribute to the overlap. The ratio
    /// denominator is the larger of the two branches' total additions, and
    /// the ratio is `0.0` when both branches added nothing.
    pub fn score(&self, base: &Arc<BranchDiff>, comparison: &Arc<BranchDiff>) -> BranchComparison {
        let mut files = Vec::new();
        let mut total_overlap = 0;

        for (filename, base_file) in &base.files {
            let Some(other_file) = comparison.files.get(filename) else {
                continue;
            };

            let overlap = count_overlap(&base_file.added_lines, &other_file.added_lines, self.mode);
            if self.verbose {
                tracing::info!(
                    base = %base.name,
                    comparison = %comparison.name,
                    file = %filename,
                    "{overlap}/{}",
                    base_file.addition_count
                );
            }

            total_overlap += overlap;
            files.push(FileOverlap {
                filename: filename.clone(),
                overlap,
                additions: base_file.addition_count,
            });
        }

        let total_additions = base.total_additions().max(comparison.total_additions());
        let ratio = overlap_ratio(total_overlap, total_additions);

        if self.verbose {
            tracing::info!(
                "{} <-> {}: {total_overlap}/{total_additions} :: {}",
                base.name,
                comparison.name,
                percentage(ratio)
            );
        }

        BranchComparison {
            base: Arc::clone(base),
            comparison: Arc::clone(comparison),
            total_overlap,
            total_additions,
            ratio,
            is_solo: base.shares_author_with(comparison),
            files,
        }
    }
}

/// Score `base` against `comparison` with membership matching.
pub fn compare_two_branches(
    base: &Arc<BranchDiff>,
    comparison: &Arc<BranchDiff>,
    verbose: bool,
) -> BranchComparison {
    OverlapScorer::new(MatchMode::Membership, verbose).score(base, comparison)
}

fn overlap_ratio(overlap: u64, additions: u64) -> f64 {
    if additions == 0 {
        return 0.0;
    }
    (overlap as f64 / additions as f64).clamp(0.0, 1.0)
}

/// Count base lines that also occur among `other`'s lines.
fn count_overlap(base: &[String], other: &[String], mode: MatchMode) -> u64 {
    let matched = match mode {
        MatchMode::Membership => {
            let present: HashSet<&str> = other.iter().map(String::as_str).collect();
            base.iter().filter(|l| present.contains(l.as_str())).count()
        }
        MatchMode::Consuming => {
            let mut available: HashMap<&str, usize> = HashMap::new();
            for line in other {
                *available.entry(line.as_str()).or_default() += 1;
            }
            base.iter()
                .filter(|l| match available.get_mut(l.as_str()) {
                    Some(left) if *left > 0 => {
                        *left -= 1;
                        true
                    }
                    _ => false,
                })
                .count()
        }
    };
    matched as u64
}
