use std::time::Duration;

use parrot_core::{GitHubConfig, ParrotError, RepoCoordinates};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{StatusCode, Url};

use crate::provider::{Comparison, GitProvider, OrgRepo, ProviderError};

/// Wait applied when a secondary rate limit arrives without `Retry-After`.
const DEFAULT_SECONDARY_WAIT: Duration = Duration::from_secs(60);

/// GitHub REST client for comparing branches and listing repositories.
///
/// Holds its credentials explicitly; clone it to share between tasks.
///
/// # Examples
///
/// ```no_run
/// use parrot_github::client::GitHubClient;
///
/// let client = GitHubClient::new("ghp_xxxx", "https://api.github.com").unwrap();
/// ```
#[derive(Clone)]
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    /// Create a client for the API rooted at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::Config`] if the client cannot be built.
    pub fn new(token: &str, api_url: &str) -> Result<Self, ParrotError> {
        let api_url = api_url.trim_end_matches('/').to_string();

        let octocrab = octocrab::Octocrab::builder()
            .base_uri(api_url.as_str())
            .map_err(|e| ParrotError::Config(format!("invalid GitHub API url '{api_url}': {e}")))?
            .personal_token(token.to_string())
            .build()
            .map_err(|e| ParrotError::Config(format!("failed to create GitHub client: {e}")))?;

        Ok(Self {
            octocrab,
            http: reqwest::Client::new(),
            token: token.to_string(),
            api_url,
        })
    }

    /// Create a client from configuration, with an optional token override.
    ///
    /// # Errors
    ///
    /// Returns [`ParrotError::Config`] if no token is available or the
    /// client cannot be built.
    pub fn from_config(config: &GitHubConfig, token: Option<&str>) -> Result<Self, ParrotError> {
        let token = config.resolve_token(token)?;
        Self::new(&token, &config.api_url)
    }
}

impl GitProvider for GitHubClient {
    async fn compare(
        &self,
        coords: &RepoCoordinates,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ProviderError> {
        let url = compare_url(&self.api_url, coords, base, head)?;

        let response = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "parrot")
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to compare {head}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, retry_after, body));
        }

        response
            .json::<Comparison>()
            .await
            .map_err(|e| ProviderError::Decode(format!("compare {base}...{head}: {e}")))
    }

    async fn list_branches(&self, coords: &RepoCoordinates) -> Result<Vec<String>, ProviderError> {
        let page = self
            .octocrab
            .repos(&coords.owner, &coords.repo)
            .list_branches()
            .per_page(100)
            .send()
            .await
            .map_err(octocrab_error)?;
        let branches = self.octocrab.all_pages(page).await.map_err(octocrab_error)?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn list_org_repos(&self, org: &str) -> Result<Vec<OrgRepo>, ProviderError> {
        let page = self
            .octocrab
            .orgs(org)
            .list_repos()
            .per_page(100)
            .send()
            .await
            .map_err(octocrab_error)?;
        let repos = self.octocrab.all_pages(page).await.map_err(octocrab_error)?;
        Ok(repos
            .into_iter()
            .map(|r| OrgRepo {
                name: r.name,
                created_at: r.created_at,
                updated_at: r.updated_at,
                pushed_at: r.pushed_at,
            })
            .collect())
    }

    async fn list_directory(
        &self,
        coords: &RepoCoordinates,
        path: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let contents = self
            .octocrab
            .repos(&coords.owner, &coords.repo)
            .get_content()
            .path(path)
            .send()
            .await
            .map_err(octocrab_error)?;
        Ok(contents.items.into_iter().map(|c| c.name).collect())
    }
}

/// Build `{api_url}/repos/{owner}/{repo}/compare/{base}...{head}`.
///
/// Each part is percent-encoded as a path segment, so `#`, `?` and `%` in
/// branch names reach the API intact. Slashes inside a ref stay separators,
/// which is how the compare endpoint expects `feature/x` style names.
pub(crate) fn compare_url(
    api_url: &str,
    coords: &RepoCoordinates,
    base: &str,
    head: &str,
) -> Result<Url, ProviderError> {
    let invalid = || ProviderError::Transport(format!("invalid GitHub API url '{api_url}'"));
    let mut url = Url::parse(api_url).map_err(|_| invalid())?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| invalid())?;
        segments
            .pop_if_empty()
            .push("repos")
            .push(&coords.owner)
            .push(&coords.repo)
            .push("compare");
        let range = format!("{base}...{head}");
        segments.extend(range.split('/'));
    }
    Ok(url)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map a non-success response onto a [`ProviderError`].
///
/// 404 covers both missing refs and "No common ancestor" responses. A 403 or
/// 429 is a retryable secondary limit when it carries `Retry-After` or says
/// so in the body; primary quota exhaustion is reported as an API error.
pub(crate) fn classify_failure(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: String,
) -> ProviderError {
    let mentions_secondary = body.to_lowercase().contains("secondary rate limit");
    match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound,
        StatusCode::UNPROCESSABLE_ENTITY if body.contains("common ancestor") => {
            ProviderError::NotFound
        }
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            if retry_after.is_some() || mentions_secondary =>
        {
            ProviderError::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_SECONDARY_WAIT),
            }
        }
        _ => ProviderError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}

fn octocrab_error(err: octocrab::Error) -> ProviderError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            if status == 404 {
                ProviderError::NotFound
            } else {
                ProviderError::Api {
                    status,
                    message: source.message.to_string(),
                }
            }
        }
        other => ProviderError::Transport(other.to_string()),
    }
}
