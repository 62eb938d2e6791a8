//! Raw GitHub REST payloads and their conversion to domain records.
//!
//! Optional fields default instead of failing so one odd record never sinks
//! a whole page. Identifiers (`sha`, `number`, `name`) stay required: a page
//! missing them fails to decode as a malformed record.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{Commit, PullRequest, Repository};

#[derive(Debug, Clone, Deserialize)]
pub struct RawRepository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    #[serde(default)]
    pub commit: RawCommitDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<RawGitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<RawLabel>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<RawUser>,
}

impl RawPullRequest {
    /// Login of the PR author; deleted accounts have none.
    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

pub fn repository_from_raw(raw: RawRepository) -> Repository {
    Repository {
        name: raw.name,
        full_name: raw.full_name,
        description: raw.description,
        language: raw.language,
        is_fork: raw.fork,
        is_private: raw.private,
        url: raw.html_url,
    }
}

/// A commit without an author date is stamped with the current time.
pub fn commit_from_raw(raw: RawCommit) -> Commit {
    let (author, date) = match raw.commit.author {
        Some(a) => (a.name.unwrap_or_default(), a.date),
        None => (String::new(), None),
    };
    Commit {
        sha: raw.sha,
        message: raw.commit.message,
        author,
        date: date.unwrap_or_else(Utc::now),
    }
}

pub fn pull_request_from_raw(raw: RawPullRequest) -> PullRequest {
    PullRequest {
        number: raw.number,
        title: raw.title,
        body: raw.body,
        state: raw.state,
        labels: raw.labels.into_iter().map(|l| l.name).collect(),
        created_at: raw.created_at,
        merged_at: raw.merged_at,
    }
}
