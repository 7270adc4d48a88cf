use thiserror::Error;

/// Failures that stop a generation run. Partial placement and budget
/// exhaustion are not errors; they show up in the report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("invalid input: {0}")]
    InputInvalid(String),
    #[error("schedule invariant violated: {0}")]
    InvariantViolation(String),
}
