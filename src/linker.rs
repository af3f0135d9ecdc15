//! Best-effort background linking
//!
//! `link_async` detaches one task per call and returns immediately. Whatever
//! the task does (error or panic) is logged with its correlation id and then
//! dropped; it never reaches the caller. There is no pooling, throttling,
//! retry or cancellation, and no ordering with respect to later calls.

use crate::error::Result;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// A unit of best-effort work, named for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTask {
    /// Kind of link, e.g. `link_prompt`
    pub kind: String,
    /// Correlates log lines of one link; never used for deduplication
    pub correlation_id: String,
    /// What is being linked, e.g. `prompt 'p' version 1 -> model 'm-1'`
    pub target: String,
}

impl LinkTask {
    /// Create a task with a fresh correlation id of the form `<kind>-<8 hex>`
    pub fn new(kind: &str, target: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            correlation_id: new_correlation_id(kind),
            target: target.into(),
        }
    }
}

/// Short random id used to correlate log lines
pub fn new_correlation_id(kind: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{kind}-{}", &id[..8])
}

/// Handle to a scheduled link. Dropping it does not cancel the work.
#[derive(Debug)]
pub struct LinkHandle {
    correlation_id: String,
    handle: Option<JoinHandle<()>>,
}

impl LinkHandle {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Whether the work was handed to the runtime
    pub fn is_scheduled(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait for the background work to finish. Its outcome has already been
    /// logged; there is nothing to return.
    pub async fn join(self) {
        if let Some(handle) = self.handle {
            if let Err(e) = handle.await {
                debug!(correlation_id = %self.correlation_id, "Link task did not complete: {e}");
            }
        }
    }
}

/// Run `do_link` in the background, absorbing any failure.
///
/// Must be called from within a tokio runtime; otherwise the link is skipped
/// with a warning, as failing to schedule is just another best-effort failure.
pub fn link_async<Fut>(task: LinkTask, do_link: Fut) -> LinkHandle
where
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let LinkTask {
        kind,
        correlation_id,
        target,
    } = task;

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(
            kind = %kind,
            correlation_id = %correlation_id,
            "No async runtime available, skipping link of {target}"
        );
        return LinkHandle {
            correlation_id,
            handle: None,
        };
    };

    let span = info_span!(
        "link",
        kind = %kind,
        correlation_id = %correlation_id,
        target = %target
    );
    let handle = runtime.spawn(
        async move {
            match AssertUnwindSafe(do_link).catch_unwind().await {
                Ok(Ok(())) => debug!("Linked {target}"),
                Ok(Err(e)) => warn!(error = %e, "Failed to link {target}"),
                Err(_) => warn!("Link of {target} panicked"),
            }
        }
        .instrument(span),
    );

    LinkHandle {
        correlation_id,
        handle: Some(handle),
    }
}
