use std::sync::{Mutex, PoisonError};

/// A recoverable problem observed while analysing a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Operation that produced the diagnostic, e.g. `"identify_patterns"`.
    pub source: &'static str,
    pub message: String,
}

/// Sink for failures that an operation swallows instead of returning.
///
/// Owned by the caller and handed to the analyser, so embedders decide where
/// degraded results get reported.
pub trait Diagnostics: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at warn level.
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(source = diagnostic.source, "{}", diagnostic.message);
    }
}

/// Keeps diagnostics in memory for later inspection.
#[derive(Default)]
pub struct CollectingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
