//! Pairwise overlap scoring and comparison strategies.
//!
//! [`scorer`] measures how many added lines two branch diffs share,
//! [`comparator`] drives fetching and scoring across a repository's branches,
//! [`ranker`] orders the results, and [`cohort`] sweeps an organization's
//! recently active exercise repositories.

pub mod cohort;
pub mod comparator;
pub mod ranker;
pub mod scorer;

pub use comparator::{Comparator, RepoComparisons};
pub use ranker::{rank, Ranked};
pub use scorer::{compare_two_branches, OverlapScorer};
