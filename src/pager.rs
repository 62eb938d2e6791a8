//! Page-at-a-time access to GitHub list endpoints.

use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;

use log::debug;
use serde::Deserialize;

use crate::error::FetchError;
use crate::http::RestClient;

/// GitHub's maximum `per_page` for list endpoints.
pub const MAX_PER_PAGE: u32 = 100;

/// One decoded page. An empty page ends the list, whatever its index.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.records.is_empty()
    }
}

/// Something that can produce page `n` (1-based) of a list.
pub trait PageSource {
    type Item;

    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<Page<Self::Item>, FetchError>> + Send;
}

/// A REST list endpoint with fixed filter parameters.
#[derive(Debug, Clone)]
pub struct RestPages<T> {
    client: RestClient,
    path: String,
    params: Vec<(&'static str, String)>,
    _record: PhantomData<fn() -> T>,
}

impl<T> RestPages<T> {
    pub fn new(client: RestClient, path: impl Into<String>, params: Vec<(&'static str, String)>) -> Self {
        Self {
            client,
            path: path.into(),
            params,
            _record: PhantomData,
        }
    }
}

impl<T> PageSource for RestPages<T>
where
    T: for<'de> Deserialize<'de> + Send,
{
    type Item = T;

    async fn fetch_page(&self, page: u32) -> Result<Page<T>, FetchError> {
        let mut query = self.params.clone();
        query.push(("page", page.to_string()));
        query.push(("per_page", MAX_PER_PAGE.to_string()));
        let records = self.client.get_json::<Vec<T>>(&self.path, &query).await?;
        debug!("{} page {} -> {} records", self.path, page, records.len());
        Ok(Page { records })
    }
}

/// Explicit cursor over a paged list: the current page buffer, the next
/// page number, and whether the end sentinel has been seen.
pub struct PageCursor<S: PageSource> {
    source: S,
    buffer: VecDeque<S::Item>,
    next_page: u32,
    exhausted: bool,
    pages_fetched: u32,
}

impl<S: PageSource> PageCursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            next_page: 1,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Next raw record, fetching the following page only when the buffer is drained.
    pub async fn next(&mut self) -> Result<Option<S::Item>, FetchError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }
            let page = match self.source.fetch_page(self.next_page).await {
                Ok(p) => p,
                Err(e) => {
                    self.exhausted = true;
                    return Err(e);
                }
            };
            self.pages_fetched += 1;
            if page.is_last() {
                self.exhausted = true;
                return Ok(None);
            }
            self.next_page += 1;
            self.buffer.extend(page.records);
        }
    }

    /// Stop without fetching anything further.
    pub fn close(&mut self) {
        self.exhausted = true;
        self.buffer.clear();
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Drain every remaining record.
    pub async fn collect_remaining(mut self) -> Result<Vec<S::Item>, FetchError> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await? {
            out.push(item);
        }
        Ok(out)
    }
}
