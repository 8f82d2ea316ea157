//! Analysis error types.

/// Analysis error type. The scanner keeps the previous analysis state on any
/// of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("no emitted opportunities in the analysis window")]
    EmptyHistory,
    #[error("malformed history row {id}: {reason}")]
    MalformedRow { id: String, reason: String },
}
