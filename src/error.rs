use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    RateLimited,
    NotFound,
    Transport,
    MalformedRecord,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GitHub rejected the credential for {endpoint}{}: {message}", status_suffix(.status))]
    Authentication {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("GitHub API rate limit exceeded on {endpoint} with status {status}, try again later: {message}")]
    RateLimited {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// `endpoint` and `status` are absent when the reference was rejected
    /// before any request was made.
    #[error("{resource} not found or you don't have access{}", request_suffix(.endpoint, .status))]
    NotFound {
        resource: String,
        endpoint: Option<String>,
        status: Option<u16>,
    },

    #[error("request to {endpoint} failed{}: {message}", status_suffix(.status))]
    Transport {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("malformed record from {endpoint}: {message}")]
    MalformedRecord { endpoint: String, message: String },

    #[error("failed to {operation} for {target}: {source}")]
    Context {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            Self::Context { source, .. } => source.kind(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Authentication => "unauthorized",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transport => "upstream_error",
            ErrorKind::MalformedRecord => "malformed_record",
        }
    }

    /// Whether a later attempt may succeed without the caller changing anything.
    pub fn retriable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Transport { status, .. } => status.map_or(true, |s| s >= 500),
            Self::Context { source, .. } => source.retriable(),
            _ => false,
        }
    }

    /// Attach the operation name and repository reference.
    pub fn context(self, operation: &'static str, target: impl Into<String>) -> Self {
        Self::Context {
            operation,
            target: target.into(),
            source: Box::new(self),
        }
    }

    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code().to_string(),
            message: self.to_string(),
            retriable: self.retriable(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

fn request_suffix(endpoint: &Option<String>, status: &Option<u16>) -> String {
    match (endpoint, status) {
        (Some(e), Some(s)) => format!(" ({e} returned {s})"),
        (Some(e), None) => format!(" ({e})"),
        (None, Some(s)) => format!(" (status {s})"),
        (None, None) => String::new(),
    }
}

/// Serializable error shape returned to front-end callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

pub trait ResultExt<T> {
    fn context(self, operation: &'static str, target: impl Into<String>) -> Result<T, FetchError>;
}

impl<T> ResultExt<T> for Result<T, FetchError> {
    fn context(self, operation: &'static str, target: impl Into<String>) -> Result<T, FetchError> {
        self.map_err(|e| e.context(operation, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_preserves_kind_and_retriability() {
        let inner = FetchError::Transport {
            endpoint: "/repos/o/r/pulls".into(),
            status: Some(502),
            message: "bad gateway".into(),
        };
        let wrapped = inner.context("fetch pull requests", "o/r");
        assert_eq!(wrapped.kind(), ErrorKind::Transport);
        assert!(wrapped.retriable());
        let msg = wrapped.to_string();
        assert!(msg.contains("fetch pull requests"));
        assert!(msg.contains("o/r"));
        assert!(msg.contains("502"));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        let e = FetchError::Transport {
            endpoint: "/x".into(),
            status: Some(422),
            message: "unprocessable".into(),
        };
        assert!(!e.retriable());
        let network = FetchError::Transport {
            endpoint: "/x".into(),
            status: None,
            message: "connection reset".into(),
        };
        assert!(network.retriable());
        let missing = FetchError::NotFound {
            resource: "Repository 'o/r'".into(),
            endpoint: Some("/repos/o/r".into()),
            status: Some(404),
        };
        assert!(!missing.retriable());
        assert_eq!(
            missing.to_string(),
            "Repository 'o/r' not found or you don't have access (/repos/o/r returned 404)"
        );
    }

    #[test]
    fn codes_follow_kind() {
        let e = FetchError::Authentication {
            endpoint: "/user".into(),
            status: Some(401),
            message: "Bad credentials".into(),
        };
        assert_eq!(e.to_info().code, "unauthorized");
        assert!(e.to_string().contains("/user with status 401"));
        let e = FetchError::RateLimited {
            endpoint: "/user/repos".into(),
            status: 429,
            message: "slow down".into(),
        }
        .context("list repositories", "user");
        assert_eq!(e.to_info().code, "rate_limited");
        assert!(e.to_info().retriable);
        assert!(e.to_string().contains("/user/repos with status 429"));
    }
}
