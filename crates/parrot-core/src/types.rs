use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Owner and name of a hosted repository.
///
/// # Examples
///
/// ```
/// use parrot_core::RepoCoordinates;
///
/// let coords = RepoCoordinates::new("dev-academy", "todo-full-stack");
/// assert_eq!(coords.to_string(), "dev-academy/todo-full-stack");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoCoordinates {
    /// Organization or user that owns the repository.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl RepoCoordinates {
    /// Build coordinates from an owner and repository name.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One file's changes within a [`BranchDiff`].
///
/// `addition_count` is the provider's own tally and stays authoritative even
/// when the provider omits `patch` for large files, in which case
/// `added_lines` is empty.
///
/// # Examples
///
/// ```
/// use parrot_core::FileDiff;
///
/// let file = FileDiff {
///     patch: None,
///     added_lines: vec![],
///     addition_count: 1200,
/// };
/// assert!(file.added_lines.len() as u64 <= file.addition_count);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// Raw unified-diff text for the file, if the provider sent one.
    pub patch: Option<String>,
    /// Content of every added line, marker stripped, in patch order.
    pub added_lines: Vec<String>,
    /// Number of added lines as reported by the provider.
    pub addition_count: u64,
}

/// A branch's changes relative to the baseline.
///
/// Renamed files are keyed by their pre-rename path so they still line up
/// with the same key on another branch.
///
/// # Examples
///
/// ```
/// use parrot_core::{BranchDiff, FileDiff};
///
/// let mut diff = BranchDiff::new("alice");
/// diff.files.insert(
///     "src/app.ts".into(),
///     FileDiff { patch: None, added_lines: vec![], addition_count: 7 },
/// );
/// diff.authors.insert("alice".into());
/// assert_eq!(diff.total_additions(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDiff {
    /// Branch name.
    pub name: String,
    /// Per-file changes keyed by filename.
    pub files: BTreeMap<String, FileDiff>,
    /// Distinct commit authors since the branch diverged from the baseline.
    pub authors: BTreeSet<String>,
    /// Authored date of the most recent commit.
    pub pushed_at: Option<DateTime<Utc>>,
}

impl BranchDiff {
    /// An empty diff for `name`, to be filled in by the fetcher.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
            authors: BTreeSet::new(),
            pushed_at: None,
        }
    }

    /// Sum of provider-reported additions across every file.
    pub fn total_additions(&self) -> u64 {
        self.files.values().map(|f| f.addition_count).sum()
    }

    /// Returns `true` if any author contributed to both branches.
    ///
    /// # Examples
    ///
    /// ```
    /// use parrot_core::BranchDiff;
    ///
    /// let mut a = BranchDiff::new("alice");
    /// a.authors.insert("alice".into());
    /// let mut b = BranchDiff::new("alice-v2");
    /// b.authors.insert("alice".into());
    /// assert!(a.shares_author_with(&b));
    /// ```
    pub fn shares_author_with(&self, other: &BranchDiff) -> bool {
        !self.authors.is_disjoint(&other.authors)
    }
}

/// Overlap for a single file present on both sides of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOverlap {
    /// Filename shared by both branches.
    pub filename: String,
    /// Base-side added lines also found on the comparison side.
    pub overlap: u64,
    /// Base-side provider-reported additions for the file.
    pub additions: u64,
}

/// Result of scoring two branches against each other.
///
/// `ratio` is always within `[0, 1]` and is `0.0` when `total_additions` is 0.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchComparison {
    /// Branch whose added lines were looked up.
    #[serde(serialize_with = "serialize_branch_name")]
    pub base: Arc<BranchDiff>,
    /// Branch the lines were looked up in.
    #[serde(serialize_with = "serialize_branch_name")]
    pub comparison: Arc<BranchDiff>,
    /// Number of matched added lines.
    pub total_overlap: u64,
    /// Ratio denominator: the larger of the two branches' total additions.
    pub total_additions: u64,
    /// `total_overlap / total_additions`.
    pub ratio: f64,
    /// Both branches share an author, so the overlap is not cross-student.
    pub is_solo: bool,
    /// Per-file breakdown, in filename order.
    pub files: Vec<FileOverlap>,
}

fn serialize_branch_name<S: Serializer>(diff: &Arc<BranchDiff>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&diff.name)
}

/// How base-side lines are matched against the comparison side.
///
/// # Examples
///
/// ```
/// use parrot_core::MatchMode;
///
/// let mode: MatchMode = "consuming".parse().unwrap();
/// assert_eq!(mode, MatchMode::Consuming);
/// assert_eq!(MatchMode::default(), MatchMode::Membership);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// A base line matches if it appears anywhere on the other side.
    /// Duplicated base lines can match one comparison line repeatedly.
    #[default]
    Membership,
    /// Each comparison line can be matched at most once.
    Consuming,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Membership => write!(f, "membership"),
            MatchMode::Consuming => write!(f, "consuming"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "membership" => Ok(MatchMode::Membership),
            "consuming" | "multiset" => Ok(MatchMode::Consuming),
            other => Err(format!("unknown match mode: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use parrot_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable ranked list.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown table.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
