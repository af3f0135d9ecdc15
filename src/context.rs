//! Ambient state consulted by the facade
//!
//! The active run, active model and active trace are set by the caller's
//! own tracking code; the facade only reads them to decide what to link a
//! loaded prompt to.

use crate::types::PromptVersion;
use parking_lot::RwLock;
use std::sync::Arc;

/// Receives prompts loaded while a trace is active
pub trait TraceRecorder: Send + Sync {
    fn register_prompt(&self, trace_id: &str, prompt: &PromptVersion);
}

#[derive(Debug, Default)]
struct ContextState {
    run_id: Option<String>,
    model_id: Option<String>,
    trace_id: Option<String>,
}

/// Shared, cheaply cloneable view of the active run/model/trace
#[derive(Clone, Default)]
pub struct ActiveContext {
    state: Arc<RwLock<ContextState>>,
    recorder: Option<Arc<dyn TraceRecorder>>,
}

impl ActiveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the recorder for prompts loaded under an active trace
    #[must_use]
    pub fn with_trace_recorder(mut self, recorder: Arc<dyn TraceRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn set_active_run(&self, run_id: Option<String>) {
        self.state.write().run_id = run_id;
    }

    pub fn active_run_id(&self) -> Option<String> {
        self.state.read().run_id.clone()
    }

    pub fn set_active_model(&self, model_id: Option<String>) {
        self.state.write().model_id = model_id;
    }

    pub fn active_model_id(&self) -> Option<String> {
        self.state.read().model_id.clone()
    }

    pub fn set_active_trace(&self, trace_id: Option<String>) {
        self.state.write().trace_id = trace_id;
    }

    pub fn active_trace_id(&self) -> Option<String> {
        self.state.read().trace_id.clone()
    }

    pub fn trace_recorder(&self) -> Option<&Arc<dyn TraceRecorder>> {
        self.recorder.as_ref()
    }
}

impl std::fmt::Debug for ActiveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveContext")
            .field("state", &*self.state.read())
            .field("has_trace_recorder", &self.recorder.is_some())
            .finish()
    }
}
