use crate::config::Config;
use crate::error::FetchError;
use crate::rate::DEFAULT_MAX_WAIT;
use crate::types::Quota;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Quota state reported in the `x-ratelimit-*` headers of a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateMeta {
    pub remaining: Option<i64>,
    /// Epoch seconds at which the quota refills.
    pub reset: Option<i64>,
}

impl RateMeta {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    fn reset_rfc3339(&self) -> Option<String> {
        self.reset
            .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
            .map(|dt| dt.to_rfc3339())
    }
}

pub fn build_client(cfg: &Config) -> Result<Client, FetchError> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .unwrap_or_else(|_| HeaderValue::from_static("repo2resume"));
    default_headers.insert(USER_AGENT, ua);
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
        .map_err(|e| FetchError::Transport {
            endpoint: cfg.api_url.clone(),
            status: None,
            message: format!("failed to build HTTP client: {e}"),
        })
}

fn auth_header(token: &str, endpoint: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| FetchError::Authentication {
        endpoint: endpoint.to_string(),
        status: None,
        message: "token contains characters not allowed in a header".into(),
    })
}

/// GitHub's `{"message": ...}` from an error body, or the body itself.
fn error_message(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body)
}

/// Classify a non-2xx response. A 403 only means rate limiting when GitHub
/// reports an exhausted quota alongside it.
pub fn map_status_to_error(
    status: StatusCode,
    headers: &HeaderMap,
    endpoint: &str,
    message: String,
) -> FetchError {
    let rate = extract_rate_from_rest(headers);
    let endpoint = endpoint.to_string();
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED => FetchError::Authentication {
            endpoint,
            status: Some(code),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => rate_limited(endpoint, code, message, &rate),
        StatusCode::FORBIDDEN if rate.is_exhausted() => rate_limited(endpoint, code, message, &rate),
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => FetchError::NotFound {
            resource: "Resource".to_string(),
            endpoint: Some(endpoint),
            status: Some(code),
        },
        _ => FetchError::Transport {
            endpoint,
            status: Some(code),
            message,
        },
    }
}

fn rate_limited(endpoint: String, status: u16, message: String, rate: &RateMeta) -> FetchError {
    let message = match rate.reset_rfc3339() {
        Some(reset) => format!("{message} (quota resets at {reset})"),
        None => message,
    };
    FetchError::RateLimited {
        endpoint,
        status,
        message,
    }
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
    };
    RateMeta {
        remaining: header("x-ratelimit-remaining"),
        reset: header("x-ratelimit-reset"),
    }
}

fn compute_backoff(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(d) = retry_after {
        return d.min(MAX_RETRY_AFTER);
    }
    // Exponential backoff with jitter: base 200ms * 2^attempt, max 5s.
    let base = 200u64.saturating_mul(1u64 << attempt.min(5));
    let max = 5_000u64.min(base);
    let jitter = fastrand::u64(0..=max / 2);
    Duration::from_millis(max / 2 + jitter)
}

/// Upper bound on a server-requested `Retry-After` pause.
pub const MAX_RETRY_AFTER: Duration = DEFAULT_MAX_WAIT;

/// Percent-encode a single URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Authenticated GitHub REST client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    cfg: Arc<Config>,
}

impl RestClient {
    pub fn new(cfg: Config) -> Result<Self, FetchError> {
        let client = build_client(&cfg)?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// GET `path` with query parameters and decode the JSON body.
    ///
    /// Network errors, 429 and 5xx are retried up to `max_retries` times;
    /// everything else is returned to the caller as a typed failure.
    pub async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.cfg.api_url, path);
        let auth = auth_header(&self.cfg.token, path)?;
        let mut attempt: u32 = 0;
        loop {
            let res = self
                .client
                .get(&url)
                .query(query)
                .header(AUTHORIZATION, auth.clone())
                .header("X-GitHub-Api-Version", &self.cfg.api_version)
                .header(
                    ACCEPT,
                    HeaderValue::from_static("application/vnd.github+json"),
                )
                .send()
                .await;

            let res = match res {
                Ok(r) => r,
                Err(e) => {
                    warn!("REST GET {} error sending request: {}", path, e);
                    if attempt < self.cfg.max_retries {
                        tokio::time::sleep(compute_backoff(attempt, None)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Transport {
                        endpoint: path.to_string(),
                        status: None,
                        message: e.to_string(),
                    });
                }
            };

            let status = res.status();
            let headers = res.headers().clone();
            let rate = extract_rate_from_rest(&headers);
            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);

            if status.is_success() {
                debug!("REST GET {} -> {} (remaining {:?})", path, status, rate.remaining);
                let bytes = res.bytes().await.map_err(|e| FetchError::Transport {
                    endpoint: path.to_string(),
                    status: Some(status.as_u16()),
                    message: e.to_string(),
                })?;
                let value =
                    serde_json::from_slice::<T>(&bytes).map_err(|e| FetchError::MalformedRecord {
                        endpoint: path.to_string(),
                        message: e.to_string(),
                    })?;
                return Ok(value);
            }

            // Retry on 429/5xx
            if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
                && attempt < self.cfg.max_retries
            {
                let backoff = compute_backoff(attempt, retry_after);
                warn!(
                    "REST GET {} retrying (status {}, remaining {:?}), backoff {:?}",
                    path, status, rate.remaining, backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }
            let text = res.text().await.unwrap_or_default();
            return Err(map_status_to_error(status, &headers, path, error_message(text)));
        }
    }

    /// Login of the user the token belongs to.
    pub async fn authenticated_login(&self) -> Result<String, FetchError> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }
        let user = self.get_json::<User>("/user", &[]).await?;
        Ok(user.login)
    }

    /// Current core quota as reported by `GET /rate_limit`.
    pub async fn rate_limit(&self) -> Result<Quota, FetchError> {
        #[derive(Deserialize)]
        struct RateLimit {
            rate: Quota,
        }
        let limits = self.get_json::<RateLimit>("/rate_limit", &[]).await?;
        Ok(limits.rate)
    }

    /// Path prefix for a repository, with both segments encoded.
    pub fn repo_path(owner: &str, name: &str) -> String {
        format!(
            "/repos/{}/{}",
            encode_path_segment(owner),
            encode_path_segment(name)
        )
    }
}
