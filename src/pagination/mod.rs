//! Pagination module
//!
//! Drives cursor-based listing calls: aggregate to a bounded `Vec`, stream
//! lazily, or collect everything through a filter.
//!
//! # Overview
//!
//! Every registry search endpoint returns a `Page` with an opaque
//! continuation token. The helpers here take a page-fetching closure so the
//! same walk serves registered models, model versions, prompts and logged
//! models alike.

mod aggregator;
mod types;

pub use aggregator::{aggregate, collect_all, paginate};
pub use types::{Page, PageRequest};

#[cfg(test)]
mod tests;
