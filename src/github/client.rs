//! Octocrab-backed release fetching.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use tracing::{debug, warn};

use crate::retry::{RetryConfig, retry_with_backoff};
use crate::types::{ReleaseInfo, RepoId, RepositoryTarget};

use super::cache::ResponseCache;
use super::error::FetchError;
use super::rate::RateBudget;

/// The fetch seam between the scheduler and the provider.
///
/// The octocrab-backed [`ReleaseClient`] is the production implementation;
/// tests substitute mocks.
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    /// Fetches the most recently published release for a repository.
    ///
    /// `Ok(None)` means the repository has no releases (or does not exist) -
    /// a normal terminal outcome for the cycle, not an error.
    async fn fetch_latest_release(
        &self,
        target: &RepositoryTarget,
    ) -> Result<Option<ReleaseInfo>, FetchError>;

    /// Called once at the start of each check cycle.
    ///
    /// The default implementation does nothing; the production client uses
    /// it to resize the rate budget from the advertised quota.
    async fn begin_cycle(&self) {}
}

/// A rate-limited, caching release client.
pub struct ReleaseClient {
    client: Octocrab,
    budget: RateBudget,
    cache: ResponseCache,
    fetch_timeout: Duration,
    retry: RetryConfig,
}

impl ReleaseClient {
    /// Creates a client from a personal access token.
    pub fn from_token(
        token: impl Into<String>,
        cache_ttl: Duration,
        rate_limit_max_wait: Duration,
        fetch_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, FetchError> {
        let client = Octocrab::builder()
            .personal_token(token.into())
            .build()
            .map_err(FetchError::from_octocrab)?;
        Ok(Self::new(
            client,
            cache_ttl,
            rate_limit_max_wait,
            fetch_timeout,
            retry,
        ))
    }

    /// Creates a client from a pre-configured Octocrab instance.
    ///
    /// Use this for custom authentication (e.g. GitHub App installation
    /// tokens) or for anonymous access.
    pub fn new(
        client: Octocrab,
        cache_ttl: Duration,
        rate_limit_max_wait: Duration,
        fetch_timeout: Duration,
        retry: RetryConfig,
    ) -> Self {
        ReleaseClient {
            client,
            budget: RateBudget::new(rate_limit_max_wait),
            cache: ResponseCache::new(cache_ttl),
            fetch_timeout,
            retry,
        }
    }

    /// Current rate budget (diagnostics and tests).
    pub fn budget_remaining(&self) -> u64 {
        self.budget.remaining()
    }

    /// Resizes the token budget from the provider's rate-limit endpoint.
    ///
    /// Failures leave the current budget in place; a stale budget is safe
    /// because the provider enforces the real limit anyway.
    async fn refresh_budget(&self) {
        match self.client.ratelimit().get().await {
            Ok(limits) => {
                let remaining = limits.rate.remaining as u64;
                debug!(remaining, "refreshed rate budget from advertised quota");
                self.budget.set_remaining(remaining);
            }
            Err(err) => {
                warn!(error = %err, "could not read advertised rate limit, keeping current budget");
            }
        }
    }

    /// One uncached, unretried fetch of the release list.
    async fn fetch_release_page(&self, repo: &RepoId) -> Result<Vec<ReleaseInfo>, FetchError> {
        let repos = self.client.repos(repo.owner.clone(), repo.repo.clone());
        let releases = repos.releases();
        let request = releases.list().per_page(30).send();

        let page = match tokio::time::timeout(self.fetch_timeout, request).await {
            Ok(result) => result.map_err(FetchError::from_octocrab)?,
            Err(_) => {
                return Err(FetchError::transient(format!(
                    "release list request for {repo} timed out after {:?}",
                    self.fetch_timeout
                )));
            }
        };

        let releases = page
            .items
            .into_iter()
            .filter(|release| !release.draft)
            .map(|release| ReleaseInfo {
                tag: release.tag_name,
                name: release.name.unwrap_or_default(),
                published_at: release
                    .published_at
                    .or(release.created_at)
                    .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC),
                is_prerelease: release.prerelease,
                html_url: release.html_url.to_string(),
                body: release.body.unwrap_or_default(),
            })
            .collect();

        Ok(releases)
    }
}

/// The cache, budget, and retry orchestration around one page fetch.
///
/// Factored out of the trait impl so the whole path short of the octocrab
/// call itself is exercisable with a closure in place of the network.
async fn fetch_with_budget<F, Fut>(
    repo: &RepoId,
    cache: &ResponseCache,
    budget: &RateBudget,
    retry: RetryConfig,
    fetch_page: F,
) -> Result<Option<ReleaseInfo>, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<ReleaseInfo>, FetchError>>,
{
    if let Some(cached) = cache.get(repo) {
        debug!(%repo, "release cache hit");
        return Ok(cached);
    }

    // One token per logical fetch; in-place retries of the same request
    // do not spend additional tokens.
    budget.acquire().await?;

    let result = retry_with_backoff(retry, fetch_page, |err: &FetchError| {
        err.kind.is_retriable()
    })
    .await
    .into_result();

    let releases = match result {
        Ok(releases) => releases,
        Err(err) if err.is_not_found() => {
            warn!(%repo, "repository not found or has no releases endpoint");
            cache.insert(repo.clone(), None);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    let latest = latest_by_published_at(releases);
    cache.insert(repo.clone(), latest.clone());
    Ok(latest)
}

/// Picks the most recently published release, ties broken by API ordering
/// (the earlier item wins).
fn latest_by_published_at(releases: Vec<ReleaseInfo>) -> Option<ReleaseInfo> {
    let mut latest: Option<ReleaseInfo> = None;
    for release in releases {
        match &latest {
            Some(current) if release.published_at <= current.published_at => {}
            _ => latest = Some(release),
        }
    }
    latest
}

#[async_trait]
impl ReleaseFetcher for ReleaseClient {
    async fn fetch_latest_release(
        &self,
        target: &RepositoryTarget,
    ) -> Result<Option<ReleaseInfo>, FetchError> {
        let repo = &target.repo;
        fetch_with_budget(repo, &self.cache, &self.budget, self.retry, || {
            self.fetch_release_page(repo)
        })
        .await
    }

    async fn begin_cycle(&self) {
        self.refresh_budget().await;
        self.cache.purge_expired();
    }
}
