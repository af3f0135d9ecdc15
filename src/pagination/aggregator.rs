//! Cursor-walking helpers
//!
//! All three walk the same way: start with no cursor, hand each page's
//! token back verbatim, stop on an empty or missing token. Errors from the
//! page source propagate untouched; retries belong to the client.

use super::types::Page;
use crate::error::{Error, Result};
use futures::stream::{self, Stream, TryStreamExt};
use std::future::Future;
use tracing::debug;

/// Fetch pages until the source is exhausted or `max_results` items are held.
///
/// `fetch_page(n, cursor)` is asked for at most `per_call_cap` items per call,
/// and for no more than the remaining budget once `max_results` is set. No page
/// is fetched after the budget is reached, so `Some(0)` makes no calls.
///
/// The returned page holds the aggregated items and, when the walk stopped on
/// the budget rather than on exhaustion, the cursor to resume from. Items a
/// source returns beyond the requested count are truncated so the bound holds.
pub async fn aggregate<T, F, Fut>(
    mut fetch_page: F,
    per_call_cap: usize,
    max_results: Option<usize>,
) -> Result<Page<T>>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    if per_call_cap == 0 {
        return Err(Error::invalid_parameter(
            "per-call page size must be greater than zero",
        ));
    }

    let mut items: Vec<T> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let count = match max_results {
            Some(max) => {
                let remaining = max.saturating_sub(items.len());
                if remaining == 0 {
                    break;
                }
                remaining.min(per_call_cap)
            }
            None => per_call_cap,
        };

        let page = fetch_page(count, cursor.take()).await?;
        pages += 1;
        debug!(
            page = pages,
            requested = count,
            received = page.items.len(),
            "Fetched page"
        );

        cursor = page.token.filter(|t| !t.is_empty());
        items.extend(page.items);

        if let Some(max) = max_results {
            if items.len() >= max {
                items.truncate(max);
                break;
            }
        }
        if cursor.is_none() {
            break;
        }
    }

    Ok(Page::new(items, cursor))
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazily stream items across pages of `per_call_cap` items.
///
/// Pages are fetched only as the stream is polled. The first error is
/// yielded and ends the stream.
pub fn paginate<T, F, Fut>(fetch_page: F, per_call_cap: usize) -> impl Stream<Item = Result<T>>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let per_call_cap = per_call_cap.max(1);

    stream::try_unfold(
        (fetch_page, Cursor::Start),
        move |(mut fetch_page, cursor)| async move {
            let token = match cursor {
                Cursor::Done => return Ok(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let page = fetch_page(per_call_cap, token).await?;
            let next = match page.token.filter(|t| !t.is_empty()) {
                Some(token) => Cursor::Next(token),
                None => Cursor::Done,
            };

            let items = stream::iter(page.items.into_iter().map(Ok::<T, Error>));
            Ok::<_, Error>(Some((items, (fetch_page, next))))
        },
    )
    .try_flatten()
}

/// Walk every page with the source's default page size, keeping the items
/// `keep` accepts.
pub async fn collect_all<T, F, Fut, P>(mut fetch_page: F, mut keep: P) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
    P: FnMut(&T) -> bool,
{
    let mut kept = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch_page(cursor.take()).await?;
        cursor = page.token.filter(|t| !t.is_empty());
        kept.extend(page.items.into_iter().filter(|item| keep(item)));

        if cursor.is_none() {
            return Ok(kept);
        }
    }
}
