//! Collecting a filtered stream in full or as one offset window.

use futures::{Stream, TryStreamExt};
use serde::Serialize;

use crate::pager::MAX_PER_PAGE;

/// A clamped (page, per_page) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub page: u32,
    pub per_page: u32,
}

impl WindowRequest {
    /// Clamp `per_page` into 1..=100 and `page` to be non-negative.
    pub fn new(page: i64, per_page: i64) -> Self {
        let page = u32::try_from(page.max(0)).unwrap_or(u32::MAX);
        let per_page = per_page.clamp(1, i64::from(MAX_PER_PAGE)) as u32;
        Self { page, per_page }
    }

    pub fn start_index(&self) -> u64 {
        u64::from(self.page) * u64::from(self.per_page)
    }
}

/// One window of results. `has_more` is true only if an item past the
/// window was actually observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

/// Drain the stream, keeping remote order.
pub async fn collect_all<T, E, S>(stream: S) -> Result<Vec<T>, E>
where
    S: Stream<Item = Result<T, E>>,
{
    stream.try_collect().await
}

/// Skip `start_index` filtered items, then buffer up to `per_page + 1`.
///
/// Pulling stops as soon as the lookahead item is buffered, so no page past
/// the one holding it is requested. Stream end and date-boundary
/// termination both fall through to the same truncation.
pub async fn collect_window<T, E, S>(stream: S, request: WindowRequest) -> Result<Window<T>, E>
where
    S: Stream<Item = Result<T, E>>,
{
    let mut stream = std::pin::pin!(stream);
    let start_index = request.start_index();
    let limit = request.per_page as usize;
    let mut filtered_index: u64 = 0;
    let mut buffer = Vec::with_capacity(limit + 1);

    while let Some(item) = stream.try_next().await? {
        if filtered_index < start_index {
            filtered_index += 1;
            continue;
        }
        buffer.push(item);
        filtered_index += 1;
        if buffer.len() > limit {
            break;
        }
    }

    let has_more = buffer.len() > limit;
    buffer.truncate(limit);
    Ok(Window {
        items: buffer,
        has_more,
    })
}
