use std::env;
use std::time::Duration;

/// Runtime configuration for the GitHub client and the summary payload.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub repo_cache_ttl_secs: u64,
    pub summary_model: String,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [required]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_HTTP_MAX_RETRIES (default: 5)
    /// - GITHUB_USER_AGENT (default: repo2resume/<version>)
    /// - REPO_CACHE_TTL_SECS (default: 300)
    /// - SUMMARY_MODEL (default: gpt-4o-mini)
    pub fn from_env() -> Result<Self, String> {
        let token = env::var("GITHUB_TOKEN")
            .or_else(|_| env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| "Missing GITHUB_TOKEN or GH_TOKEN".to_string())?;

        let api_url = env::var("GITHUB_API_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_url).map_err(|e| format!("Invalid GITHUB_API_URL '{api_url}': {e}"))?;

        let api_version =
            env::var("GITHUB_API_VERSION").unwrap_or_else(|_| "2022-11-28".to_string());
        let default_ua = format!("repo2resume/{}", env!("CARGO_PKG_VERSION"));
        let user_agent = env::var("GITHUB_USER_AGENT").unwrap_or(default_ua);
        let summary_model = env::var("SUMMARY_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs: parse_env("GITHUB_HTTP_TIMEOUT_SECS").unwrap_or(30),
            max_retries: parse_env("GITHUB_HTTP_MAX_RETRIES").unwrap_or(5),
            repo_cache_ttl_secs: parse_env("REPO_CACHE_TTL_SECS").unwrap_or(300),
            summary_model,
        })
    }

    /// Configuration pointing at an arbitrary API root; used by tests and embedders.
    pub fn for_api(api_url: &str, token: &str) -> Self {
        Self {
            token: token.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_version: "2022-11-28".to_string(),
            user_agent: format!("repo2resume/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            max_retries: 0,
            repo_cache_ttl_secs: 300,
            summary_model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn repo_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.repo_cache_ttl_secs)
    }

    /// Cache key for per-caller memoization; only a short token prefix is retained.
    pub fn caller_key(&self) -> String {
        self.token.chars().take(10).collect()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}
