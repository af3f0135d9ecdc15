//! Tests for pagination module

use super::*;
use crate::error::{Error, Result};
use futures::future::{ready, Ready};
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use test_case::test_case;

/// Serves a fixed script of pages, recording every call
struct ScriptedSource {
    pages: Vec<Result<Page<&'static str>>>,
    calls: Vec<(usize, Option<String>)>,
}

impl ScriptedSource {
    fn new(pages: Vec<Result<Page<&'static str>>>) -> Self {
        Self {
            pages,
            calls: Vec::new(),
        }
    }

    fn fetch(&mut self, count: usize, cursor: Option<String>) -> Ready<Result<Page<&'static str>>> {
        self.calls.push((count, cursor));
        let next = if self.pages.is_empty() {
            Err(Error::Other("script exhausted".to_string()))
        } else {
            self.pages.remove(0)
        };
        ready(next)
    }
}

/// Serves `total` numbered items honoring the requested count; the cursor
/// is the index of the next item
struct ListSource {
    total: usize,
    calls: Vec<(usize, Option<String>)>,
}

impl ListSource {
    fn new(total: usize) -> Self {
        Self {
            total,
            calls: Vec::new(),
        }
    }

    fn fetch(&mut self, count: usize, cursor: Option<String>) -> Ready<Result<Page<usize>>> {
        self.calls.push((count, cursor.clone()));
        let start: usize = cursor.map_or(0, |c| c.parse().unwrap());
        let end = (start + count).min(self.total);
        let token = (end < self.total).then(|| end.to_string());
        ready(Ok(Page::new((start..end).collect(), token)))
    }
}

fn abc_pages() -> Vec<Result<Page<&'static str>>> {
    vec![
        Ok(Page::with_token(vec!["a", "b"], "x")),
        Ok(Page::last(vec!["c"])),
    ]
}

// ============================================================================
// Page Tests
// ============================================================================

#[test]
fn test_page_empty_token_means_no_more() {
    let page = Page::new(vec![1, 2], Some(String::new()));
    assert!(!page.has_more());
    assert_eq!(page.next_token(), None);

    let page = Page::with_token(vec![1], "opaque==/+");
    assert!(page.has_more());
    assert_eq!(page.next_token(), Some("opaque==/+"));
}

#[test]
fn test_page_map_keeps_token() {
    let page = Page::with_token(vec![1, 2], "t").map(|n| n * 10);
    assert_eq!(page.items, vec![10, 20]);
    assert_eq!(page.token.as_deref(), Some("t"));
}

// ============================================================================
// Aggregate Tests
// ============================================================================

#[tokio::test]
async fn test_aggregate_unbounded_concatenates_pages() {
    let mut source = ScriptedSource::new(abc_pages());

    let result = aggregate(|n, c| source.fetch(n, c), 100, None)
        .await
        .unwrap();

    assert_eq!(result.items, vec!["a", "b", "c"]);
    assert!(result.token.is_none());
    assert_eq!(
        source.calls,
        vec![(100, None), (100, Some("x".to_string()))]
    );
}

#[tokio::test]
async fn test_aggregate_stops_at_max_without_second_fetch() {
    let mut source = ScriptedSource::new(abc_pages());

    let result = aggregate(|n, c| source.fetch(n, c), 100, Some(2))
        .await
        .unwrap();

    assert_eq!(result.items, vec!["a", "b"]);
    assert_eq!(result.token.as_deref(), Some("x"));
    assert_eq!(source.calls, vec![(2, None)]);
}

#[tokio::test]
async fn test_aggregate_zero_max_makes_no_calls() {
    let mut source = ScriptedSource::new(abc_pages());

    let result = aggregate(|n, c| source.fetch(n, c), 100, Some(0))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(source.calls.is_empty());
}

#[tokio::test]
async fn test_aggregate_error_on_second_page_discards_first() {
    let mut source = ScriptedSource::new(vec![
        Ok(Page::with_token(vec!["a", "b"], "x")),
        Err(Error::http_status(503, "unavailable")),
    ]);

    let err = aggregate(|n, c| source.fetch(n, c), 2, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert_eq!(source.calls.len(), 2);
}

#[tokio::test]
async fn test_aggregate_truncates_oversized_page() {
    let mut source = ScriptedSource::new(vec![Ok(Page::with_token(vec!["a", "b", "c"], "x"))]);

    let result = aggregate(|n, c| source.fetch(n, c), 10, Some(2))
        .await
        .unwrap();

    assert_eq!(result.items, vec!["a", "b"]);
    assert_eq!(source.calls.len(), 1);
}

#[tokio::test]
async fn test_aggregate_empty_string_token_stops() {
    let mut source = ScriptedSource::new(vec![
        Ok(Page::new(vec!["a"], Some(String::new()))),
        Ok(Page::last(vec!["never"])),
    ]);

    let result = aggregate(|n, c| source.fetch(n, c), 10, None)
        .await
        .unwrap();

    assert_eq!(result.items, vec!["a"]);
    assert_eq!(source.calls.len(), 1);
}

#[tokio::test]
async fn test_aggregate_rejects_zero_page_size() {
    let mut source = ScriptedSource::new(abc_pages());

    let err = aggregate(|n, c| source.fetch(n, c), 0, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Registry { .. }));
    assert!(source.calls.is_empty());
}

#[test_case(10, 3, None, 10, 4 ; "unbounded walks to exhaustion")]
#[test_case(10, 3, Some(7), 7, 3 ; "bounded stops mid source")]
#[test_case(10, 5, Some(10), 10, 2 ; "bound equals total")]
#[test_case(4, 10, Some(100), 4, 1 ; "bound above total")]
#[test_case(0, 10, None, 0, 1 ; "empty source still fetched once")]
#[tokio::test]
async fn test_aggregate_minimal_fetches(
    total: usize,
    cap: usize,
    max: Option<usize>,
    expected_items: usize,
    expected_calls: usize,
) {
    let mut source = ListSource::new(total);

    let result = aggregate(|n, c| source.fetch(n, c), cap, max)
        .await
        .unwrap();

    assert_eq!(result.items, (0..expected_items).collect::<Vec<_>>());
    assert_eq!(source.calls.len(), expected_calls);
    assert!(source.calls.iter().all(|(n, _)| *n <= cap));
}

#[tokio::test]
async fn test_aggregate_last_request_asks_for_remainder() {
    let mut source = ListSource::new(100);

    aggregate(|n, c| source.fetch(n, c), 4, Some(10))
        .await
        .unwrap();

    let counts: Vec<usize> = source.calls.iter().map(|(n, _)| *n).collect();
    assert_eq!(counts, vec![4, 4, 2]);
}

// ============================================================================
// Stream Tests
// ============================================================================

#[tokio::test]
async fn test_paginate_streams_all_items() {
    let mut source = ListSource::new(7);

    let items: Vec<usize> = paginate(|n, c| source.fetch(n, c), 3)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(items, (0..7).collect::<Vec<_>>());
    assert_eq!(source.calls.len(), 3);
}

#[tokio::test]
async fn test_paginate_yields_error_then_ends() {
    let mut source = ScriptedSource::new(vec![
        Ok(Page::with_token(vec!["a"], "x")),
        Err(Error::not_found("gone")),
    ]);

    let results: Vec<Result<&str>> = {
        use futures::StreamExt;
        paginate(|n, c| source.fetch(n, c), 1).collect().await
    };

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap(), &"a");
    assert!(results[1].as_ref().unwrap_err().is_not_found());
}

// ============================================================================
// Collect Tests
// ============================================================================

#[tokio::test]
async fn test_collect_all_filters_across_pages() {
    let mut source = ScriptedSource::new(vec![
        Ok(Page::with_token(vec!["keep-1", "drop"], "p2")),
        Ok(Page::with_token(vec!["drop"], "p3")),
        Ok(Page::last(vec!["keep-2"])),
    ]);

    let kept = collect_all(|c| source.fetch(0, c), |item| item.starts_with("keep"))
        .await
        .unwrap();

    assert_eq!(kept, vec!["keep-1", "keep-2"]);
    let cursors: Vec<Option<String>> = source.calls.into_iter().map(|(_, c)| c).collect();
    assert_eq!(
        cursors,
        vec![None, Some("p2".to_string()), Some("p3".to_string())]
    );
}
