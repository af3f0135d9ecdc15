//! Pagination types
//!
//! A `Page` is one response of a cursor-paginated listing call. The cursor
//! is opaque: it is handed back to the source exactly as received.

/// One page of results plus the cursor for the next one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in the order the source returned them
    pub items: Vec<T>,
    /// Continuation cursor; `None` or empty means there are no more pages
    pub token: Option<String>,
}

impl<T> Page<T> {
    /// Create a page with an optional continuation cursor
    pub fn new(items: Vec<T>, token: Option<String>) -> Self {
        Self { items, token }
    }

    /// Create a final page (no continuation)
    pub fn last(items: Vec<T>) -> Self {
        Self { items, token: None }
    }

    /// Create a page followed by another one at `token`
    pub fn with_token(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            token: Some(token.into()),
        }
    }

    /// Cursor for the next page, treating an empty token as absent
    pub fn next_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Check if the source has more pages
    pub fn has_more(&self) -> bool {
        self.next_token().is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop the cursor and keep the items
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Map items, keeping the cursor
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            token: self.token,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            token: None,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Size and position of a single page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of items to return in this page
    pub max_results: usize,
    /// Cursor returned by the previous page
    pub page_token: Option<String>,
}

impl PageRequest {
    /// Request a page from the given cursor
    pub fn new(max_results: usize, page_token: Option<String>) -> Self {
        Self {
            max_results,
            page_token,
        }
    }
}
