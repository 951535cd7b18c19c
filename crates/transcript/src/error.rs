use thiserror::Error;

/// Result type for transcript operations
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Errors raised by the transcript store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    /// A caller broke an operation precondition
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// Index outside the current entry range
    #[error("Index {index} out of range (count={count})")]
    OutOfRange { index: usize, count: usize },
}

/// Precondition breaches the caller is responsible for preventing.
///
/// The unchecked store operations panic with these messages; the `try_*` variants return
/// them instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("source update needs at least 2 entries, store holds {count}")]
    TooFewEntries { count: usize },

    #[error("entry {index} must be a {expected} entry, found {found}")]
    WrongRole {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
}
