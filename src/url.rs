use parrot_core::{ParrotError, RepoCoordinates};

/// A repository, and optionally a branch, named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub coords: RepoCoordinates,
    pub branch: Option<String>,
}

/// Parse a repository reference.
///
/// Accepts `https://github.com/org/repo`, the same with a `.git` suffix or a
/// `/tree/<branch>` tail, a scheme-less `github.com/org/repo`, or a bare
/// `org/repo`. Branch names may contain slashes.
pub fn parse_repo_url(input: &str) -> Result<RepoTarget, ParrotError> {
    let trimmed = input.trim().trim_end_matches('/');
    let invalid = || {
        ParrotError::Parse(format!(
            "expected a repository URL or owner/repo, got '{input}'"
        ))
    };

    let path = match trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
    {
        Some(rest) => rest.split_once('/').map(|(_, path)| path).ok_or_else(invalid)?,
        None => match trimmed.split_once('/') {
            Some((host, path)) if host.contains('.') => path,
            _ => trimmed,
        },
    };

    let mut segments = path.splitn(3, '/');
    let owner = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let repo = segments
        .next()
        .map(|s| s.trim_end_matches(".git"))
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;
    let branch = segments
        .next()
        .and_then(|tail| tail.strip_prefix("tree/"))
        .filter(|b| !b.is_empty())
        .map(str::to_string);

    Ok(RepoTarget {
        coords: RepoCoordinates::new(owner, repo),
        branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(owner: &str, repo: &str, branch: Option<&str>) -> RepoTarget {
        RepoTarget {
            coords: RepoCoordinates::new(owner, repo),
            branch: branch.map(str::to_string),
        }
    }

    #[test]
    fn parses_tree_url() {
        assert_eq!(
            parse_repo_url("https://github.com/cohort/todo/tree/alice").unwrap(),
            target("cohort", "todo", Some("alice"))
        );
    }

    #[test]
    fn branch_keeps_slashes() {
        assert_eq!(
            parse_repo_url("https://github.com/cohort/todo/tree/feature/login/").unwrap(),
            target("cohort", "todo", Some("feature/login"))
        );
    }

    #[test]
    fn strips_git_suffix() {
        assert_eq!(
            parse_repo_url("https://github.com/cohort/todo.git").unwrap(),
            target("cohort", "todo", None)
        );
    }

    #[test]
    fn accepts_short_forms() {
        assert_eq!(
            parse_repo_url("cohort/todo").unwrap(),
            target("cohort", "todo", None)
        );
        assert_eq!(
            parse_repo_url("github.com/cohort/todo").unwrap(),
            target("cohort", "todo", None)
        );
    }

    #[test]
    fn ignores_other_tails() {
        assert_eq!(
            parse_repo_url("https://github.com/cohort/todo/pulls").unwrap(),
            target("cohort", "todo", None)
        );
    }

    #[test]
    fn rejects_incomplete() {
        assert!(parse_repo_url("todo").is_err());
        assert!(parse_repo_url("https://github.com/cohort").is_err());
        assert!(parse_repo_url("https://github.com").is_err());
        assert!(parse_repo_url("").is_err());
    }
}
