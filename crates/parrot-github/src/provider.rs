use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parrot_core::{ParrotError, RepoCoordinates};
use serde::Deserialize;

/// Operations Parrot needs from a git hosting provider.
///
/// [`crate::client::GitHubClient`] is the production implementation; tests
/// substitute an in-memory provider.
pub trait GitProvider: Sync {
    /// Compare `head` against `base` in `coords`.
    fn compare(
        &self,
        coords: &RepoCoordinates,
        base: &str,
        head: &str,
    ) -> impl Future<Output = Result<Comparison, ProviderError>> + Send;

    /// Every branch name in the repository, in provider order.
    fn list_branches(
        &self,
        coords: &RepoCoordinates,
    ) -> impl Future<Output = Result<Vec<String>, ProviderError>> + Send;

    /// Every repository owned by `org`.
    fn list_org_repos(
        &self,
        org: &str,
    ) -> impl Future<Output = Result<Vec<OrgRepo>, ProviderError>> + Send;

    /// Entry names of the directory at `path` in the default branch.
    fn list_directory(
        &self,
        coords: &RepoCoordinates,
        path: &str,
    ) -> impl Future<Output = Result<Vec<String>, ProviderError>> + Send;
}

/// Failure reported by a [`GitProvider`].
///
/// # Examples
///
/// ```
/// use parrot_github::provider::ProviderError;
/// use std::time::Duration;
///
/// let err = ProviderError::RateLimited { retry_after: Duration::from_secs(3) };
/// assert!(err.to_string().contains("3s"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Missing ref, or two refs with no common ancestor.
    #[error("not found or no common history")]
    NotFound,

    /// Secondary rate limit; the request may be retried after the delay.
    #[error("rate limited, retry after {}s", .retry_after.as_secs())]
    RateLimited {
        /// Provider-requested wait before retrying.
        retry_after: Duration,
    },

    /// Any other non-success response.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or provider message.
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<ProviderError> for ParrotError {
    fn from(err: ProviderError) -> Self {
        ParrotError::Provider(err.to_string())
    }
}

/// Result of comparing a branch against the baseline.
///
/// # Examples
///
/// ```
/// use parrot_github::provider::Comparison;
///
/// let json = r#"{"files": [], "commits": []}"#;
/// let comparison: Comparison = serde_json::from_str(json).unwrap();
/// assert!(comparison.files.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Comparison {
    /// Changed files, in provider order.
    #[serde(default)]
    pub files: Vec<ChangedFile>,
    /// Commits in the range, oldest first.
    #[serde(default)]
    pub commits: Vec<CommitSummary>,
}

/// One changed file in a [`Comparison`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangedFile {
    /// Path on the head side.
    pub filename: String,
    /// Kind of change.
    pub status: FileStatus,
    /// Path on the base side, for renames.
    #[serde(default)]
    pub previous_filename: Option<String>,
    /// Unified-diff text; omitted by the provider for large changes.
    #[serde(default)]
    pub patch: Option<String>,
    /// Provider-reported added line count.
    #[serde(default)]
    pub additions: u64,
}

impl ChangedFile {
    /// Key the file under its pre-rename path when it was renamed.
    ///
    /// # Examples
    ///
    /// ```
    /// use parrot_github::provider::{ChangedFile, FileStatus};
    ///
    /// let file = ChangedFile {
    ///     filename: "src/Main.tsx".into(),
    ///     status: FileStatus::Renamed,
    ///     previous_filename: Some("src/App.tsx".into()),
    ///     patch: None,
    ///     additions: 0,
    /// };
    /// assert_eq!(file.match_key(), "src/App.tsx");
    /// ```
    pub fn match_key(&self) -> &str {
        match (&self.status, &self.previous_filename) {
            (FileStatus::Renamed, Some(previous)) => previous,
            _ => &self.filename,
        }
    }
}

/// Change status of a file as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// New file.
    Added,
    /// Deleted file.
    Removed,
    /// Edited in place.
    Modified,
    /// Moved, possibly with edits.
    Renamed,
    /// Copied from another path.
    Copied,
    /// Mode or type change.
    Changed,
    /// Listed without changes.
    Unchanged,
    /// Anything newer than this client knows about.
    #[serde(other)]
    Unknown,
}

/// A commit in the compared range.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitSummary {
    /// Linked provider account, when the author email maps to one.
    #[serde(default)]
    pub author: Option<AccountRef>,
    /// Raw git commit metadata.
    pub commit: CommitDetail,
}

impl CommitSummary {
    /// Account login, falling back to the free-text git author name.
    ///
    /// # Examples
    ///
    /// ```
    /// use parrot_github::provider::CommitSummary;
    ///
    /// let json = r#"{"author": null, "commit": {"author": {"name": "Ada", "date": "2024-03-01T10:00:00Z"}}}"#;
    /// let commit: CommitSummary = serde_json::from_str(json).unwrap();
    /// assert_eq!(commit.identity(), Some("Ada"));
    /// ```
    pub fn identity(&self) -> Option<&str> {
        self.author
            .as_ref()
            .map(|a| a.login.as_str())
            .or_else(|| self.commit.author.as_ref()?.name.as_deref())
    }

    /// Authored date of the commit.
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref()?.date
    }
}

/// Provider account reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountRef {
    /// Account username.
    pub login: String,
}

/// Git-level commit metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitDetail {
    /// Git author signature.
    #[serde(default)]
    pub author: Option<GitSignature>,
}

/// Git author or committer signature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitSignature {
    /// Free-text author name.
    #[serde(default)]
    pub name: Option<String>,
    /// Signature timestamp.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Repository entry from an organization listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgRepo {
    /// Repository name.
    pub name: String,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last metadata update.
    pub updated_at: Option<DateTime<Utc>>,
    /// Last push to any branch.
    pub pushed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_response_deserializes() {
        let json = r#"{
            "status": "ahead",
            "files": [
                {"filename": "a.ts", "status": "modified", "additions": 2, "deletions": 0,
                 "patch": "@@ -1 +1,3 @@\n a\n+b\n+c"},
                {"filename": "b.ts", "status": "renamed", "previous_filename": "old.ts", "additions": 0}
            ],
            "commits": [
                {"author": {"login": "alice"},
                 "commit": {"author": {"name": "Alice A", "date": "2024-05-01T09:00:00Z"}}}
            ]
        }"#;
        let comparison: Comparison = serde_json::from_str(json).unwrap();
        assert_eq!(comparison.files.len(), 2);
        assert_eq!(comparison.files[0].additions, 2);
        assert_eq!(comparison.files[1].match_key(), "old.ts");
        assert_eq!(comparison.commits[0].identity(), Some("alice"));
        assert!(comparison.commits[0].authored_at().is_some());
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let json = r#"{"filename": "x", "status": "teleported"}"#;
        let file: ChangedFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.status, FileStatus::Unknown);
        assert_eq!(file.additions, 0);
        assert!(file.patch.is_none());
    }

    #[test]
    fn renamed_without_previous_keeps_filename() {
        let file = ChangedFile {
            filename: "new.ts".into(),
            status: FileStatus::Renamed,
            previous_filename: None,
            patch: None,
            additions: 0,
        };
        assert_eq!(file.match_key(), "new.ts");
    }

    #[test]
    fn commit_without_any_identity() {
        let json = r#"{"author": null, "commit": {"author": null}}"#;
        let commit: CommitSummary = serde_json::from_str(json).unwrap();
        assert_eq!(commit.identity(), None);
        assert_eq!(commit.authored_at(), None);
    }

    #[test]
    fn provider_error_converts_to_parrot_error() {
        let err: ParrotError = ProviderError::Api {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(err, ParrotError::Provider(_)));
        assert!(err.to_string().contains("500"));
    }
}
