//! Author- and date-filtered pull request stream with early termination.

use futures::stream::{self, Stream};
use log::debug;

use crate::convert::{pull_request_from_raw, RawPullRequest};
use crate::error::FetchError;
use crate::pager::{PageCursor, PageSource};
use crate::types::{DateRange, PullRequest};

/// Lazily filters a newest-first PR listing down to one author's PRs in a
/// date range.
///
/// The remote list must be sorted by `created_at` descending: the first
/// record older than `range.start` ends the stream and no further pages are
/// requested. Each stream owns a fresh cursor starting at page 1.
pub struct FilteredStream<S: PageSource<Item = RawPullRequest>> {
    cursor: PageCursor<S>,
    author: String,
    range: DateRange,
}

impl<S: PageSource<Item = RawPullRequest>> FilteredStream<S> {
    pub fn new(source: S, author: impl Into<String>, range: DateRange) -> Self {
        Self {
            cursor: PageCursor::new(source),
            author: author.into(),
            range,
        }
    }

    pub async fn next(&mut self) -> Result<Option<PullRequest>, FetchError> {
        while let Some(raw) = self.cursor.next().await? {
            if raw.author_login() != Some(self.author.as_str()) {
                continue;
            }
            if self.range.end.is_some_and(|end| raw.created_at > end) {
                continue;
            }
            if self.range.start.is_some_and(|start| raw.created_at < start) {
                debug!(
                    "PR #{} created {} is before window start; stopping after {} pages",
                    raw.number,
                    raw.created_at,
                    self.cursor.pages_fetched()
                );
                self.cursor.close();
                return Ok(None);
            }
            return Ok(Some(pull_request_from_raw(raw)));
        }
        Ok(None)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<PullRequest, FetchError>> {
        stream::try_unfold(self, |mut s| async move {
            Ok::<_, FetchError>(s.next().await?.map(|pr| (pr, s)))
        })
    }
}
