use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::FetchError,
    types::{PullRequest, PullState, Repo},
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Largest page size the `pulls` endpoint accepts.
pub const PER_PAGE: u32 = 100;

const API_VERSION: &str = "2022-11-28";

/// A source of pull request pages, newest-created first.
#[async_trait]
pub trait Forge {
    /// Fetches one page (1-based) of pull requests in `state` for `repo`.
    async fn fetch_page(
        &self,
        repo: &Repo,
        state: PullState,
        page: u32,
    ) -> Result<Vec<PullRequest>, FetchError>;
}

/// Picks the token to authenticate with: the configured one, then
/// `GITHUB_TOKEN`, then `GH_TOKEN`.
pub fn resolve_token(configured: &str) -> Option<String> {
    resolve_token_with(configured, |name| std::env::var(name).ok())
}

fn resolve_token_with<F>(configured: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let configured = configured.trim();
    if !configured.is_empty() {
        return Some(configured.to_string());
    }

    ["GITHUB_TOKEN", "GH_TOKEN"]
        .into_iter()
        .filter_map(lookup)
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GitHub {
    client: reqwest::Client,
    api_url: Url,
    token: Option<String>,
}

impl GitHub {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        let mut api_url =
            Url::parse(api_url).with_context(|| format!("Invalid API URL: '{}'", api_url))?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("API URL must be hierarchical, got: '{}'", api_url);
        }
        // Url::join drops the last path segment unless it ends in '/'.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        if token.is_none() {
            warn!("No GitHub token configured; requests are unauthenticated and heavily rate limited");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let client = reqwest::Client::builder()
            .user_agent(concat!("pr-checker/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    fn pulls_url(&self, repo: &Repo) -> Result<Url, FetchError> {
        self.api_url
            .join(&format!("repos/{}/{}/pulls", repo.owner(), repo.name()))
            .map_err(|source| FetchError::InvalidUrl {
                repo: repo.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn fetch_page(
        &self,
        repo: &Repo,
        state: PullState,
        page: u32,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let url = self.pulls_url(repo)?;
        let per_page = PER_PAGE.to_string();
        let page_number = page.to_string();

        debug!(%repo, %state, page, "requesting pull requests");

        let mut request = self.client.get(url).query(&[
            ("state", state.as_str()),
            ("sort", "created"),
            ("direction", "desc"),
            ("per_page", per_page.as_str()),
            ("page", page_number.as_str()),
        ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let transport = |source: reqwest::Error| FetchError::Transport {
            repo: repo.to_string(),
            state,
            page,
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(FetchError::RemoteService {
                repo: repo.to_string(),
                state,
                page,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::MalformedResponse {
            repo: repo.to_string(),
            state,
            page,
            source,
        })
    }
}
