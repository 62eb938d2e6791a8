//! Application-facing facade over the pagination engine.

use std::sync::Arc;

use log::{debug, info};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::convert::{
    commit_from_raw, repository_from_raw, RawCommit, RawPullRequest, RawRepository,
};
use crate::error::{FetchError, ResultExt};
use crate::http::RestClient;
use crate::pager::{PageCursor, RestPages};
use crate::rate::RateGovernor;
use crate::stream::FilteredStream;
use crate::types::{Commit, DateRange, PullRequest, RepoRef, Repository};
use crate::window::{collect_all, collect_window, Window, WindowRequest};

pub type RepoCache = TtlCache<Vec<Repository>>;

/// Lists one authenticated user's repositories, commits and pull requests.
pub struct ActivityService {
    client: RestClient,
    governor: RateGovernor,
    cache: Arc<RepoCache>,
    login: String,
}

impl ActivityService {
    /// Build the client and resolve the token's login.
    ///
    /// An invalid token fails here with an authentication error.
    pub async fn connect(cfg: Config, cache: Arc<RepoCache>) -> Result<Self, FetchError> {
        let client = RestClient::new(cfg)?;
        let login = client
            .authenticated_login()
            .await
            .context("authenticate with GitHub", "the configured token")?;
        info!("authenticated as {}", login);
        Ok(Self {
            client,
            governor: RateGovernor::default(),
            cache,
            login,
        })
    }

    pub fn config(&self) -> &Config {
        self.client.config()
    }

    /// Every repository the user owns, collaborates on, or reaches through an
    /// organization, most recently updated first. Cached per caller.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>, FetchError> {
        let cfg = self.client.config();
        let key = cfg.caller_key();
        self.cache
            .get_or_fetch(&key, cfg.repo_cache_ttl(), || self.fetch_repositories())
            .await
    }

    async fn fetch_repositories(&self) -> Result<Vec<Repository>, FetchError> {
        self.governor.ensure_quota(&self.client).await;
        let pages = RestPages::<RawRepository>::new(
            self.client.clone(),
            "/user/repos",
            vec![
                ("affiliation", "owner,collaborator,organization_member".to_string()),
                ("visibility", "all".to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
            ],
        );
        let raw = PageCursor::new(pages)
            .collect_remaining()
            .await
            .context("fetch repositories", self.login.clone())?;
        debug!("fetched {} repositories", raw.len());
        Ok(raw.into_iter().map(repository_from_raw).collect())
    }

    /// Commits authored by the user; author and dates are filtered remotely.
    pub async fn list_commits(
        &self,
        repo: &str,
        range: &DateRange,
    ) -> Result<Vec<Commit>, FetchError> {
        self.governor.ensure_quota(&self.client).await;
        let repo_ref = self.resolve_repository(repo).await?;
        let mut params = vec![("author", self.login.clone())];
        if let Some(start) = range.start {
            params.push(("since", start.to_rfc3339()));
        }
        if let Some(end) = range.end {
            params.push(("until", end.to_rfc3339()));
        }
        let path = format!(
            "{}/commits",
            RestClient::repo_path(&repo_ref.owner, &repo_ref.name)
        );
        let pages = RestPages::<RawCommit>::new(self.client.clone(), path, params);
        let raw = PageCursor::new(pages)
            .collect_remaining()
            .await
            .context("fetch commits", repo_ref.full_name())?;
        Ok(raw.into_iter().map(commit_from_raw).collect())
    }

    /// All of the user's pull requests in `range`.
    pub async fn list_pull_requests(
        &self,
        repo: &str,
        range: &DateRange,
    ) -> Result<Vec<PullRequest>, FetchError> {
        self.governor.ensure_quota(&self.client).await;
        let repo_ref = self.resolve_repository(repo).await?;
        let stream = self.pull_request_stream(&repo_ref, range);
        collect_all(stream.into_stream())
            .await
            .context("fetch pull requests", repo_ref.full_name())
    }

    /// One window of the user's pull requests plus a lookahead `has_more`.
    pub async fn list_pull_requests_window(
        &self,
        repo: &str,
        range: &DateRange,
        request: WindowRequest,
    ) -> Result<Window<PullRequest>, FetchError> {
        self.governor.ensure_quota(&self.client).await;
        let repo_ref = self.resolve_repository(repo).await?;
        let stream = self.pull_request_stream(&repo_ref, range);
        let window = collect_window(stream.into_stream(), request)
            .await
            .context("fetch pull requests", repo_ref.full_name())?;
        debug!(
            "{} page {} (per_page {}): {} items, has_more={}",
            repo_ref,
            request.page,
            request.per_page,
            window.items.len(),
            window.has_more
        );
        Ok(window)
    }

    fn pull_request_stream(
        &self,
        repo_ref: &RepoRef,
        range: &DateRange,
    ) -> FilteredStream<RestPages<RawPullRequest>> {
        let path = format!(
            "{}/pulls",
            RestClient::repo_path(&repo_ref.owner, &repo_ref.name)
        );
        let pages = RestPages::new(
            self.client.clone(),
            path,
            vec![
                ("state", "all".to_string()),
                ("sort", "created".to_string()),
                ("direction", "desc".to_string()),
            ],
        );
        FilteredStream::new(pages, self.login.clone(), *range)
    }

    /// Parse `owner/name` and confirm the repository is visible to the caller.
    async fn resolve_repository(&self, repo: &str) -> Result<RepoRef, FetchError> {
        let repo_ref = RepoRef::parse(repo)?;
        let path = RestClient::repo_path(&repo_ref.owner, &repo_ref.name);
        match self.client.get_json::<serde_json::Value>(&path, &[]).await {
            Ok(_) => Ok(repo_ref),
            Err(FetchError::NotFound { endpoint, status, .. }) => Err(FetchError::NotFound {
                resource: format!("Repository '{}'", repo_ref),
                endpoint,
                status,
            }),
            Err(e) => Err(e.context("look up repository", repo_ref.full_name())),
        }
    }
}
