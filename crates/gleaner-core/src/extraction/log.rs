//! Leveled log sink for pipeline events.
//!
//! The evaluator reports through this trait instead of calling `tracing`
//! directly so tests can count warnings and errors.

/// Fire-and-forget leveled logger.
pub trait ExtractionLog: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl ExtractionLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!(target: "gleaner::extraction", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "gleaner::extraction", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "gleaner::extraction", "{message}");
    }
}
