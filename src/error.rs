//! Fatal engine errors and their process exit codes.
//!
//! The engine treats every variant here as unrecoverable: once raised
//! during pattern compilation there is no local fallback, only a caller
//! that chooses to validate patterns ahead of time. `exit_code` mirrors
//! the codes a caller (the `ca_cli` binary) is expected to exit with.

use thiserror::Error;

/// An error produced while compiling a pattern into a [`crate::ca::Ca`]
/// or while a [`crate::csa::Matcher`] drives it.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An lvalue row received conflicting `ID` and `Plus` entries, or a
    /// `CanIncr`/`CanExit` guard was evaluated on a counter state with a
    /// non-empty `postponed` set.
    #[error("double increment: {0}")]
    DoubleIncr(String),

    /// An impossible transition shape was reached at runtime (e.g. a
    /// `Move` instruction inside a `KeepSets` program).
    #[error("internal failure: {0}")]
    InternalFailure(String),

    /// The builder encountered a counted `Repeat` nested inside another
    /// counted `Repeat`.
    #[error("nested counted repetition is not supported")]
    NestedRepetition,

    /// The AST contains a construct the builder refuses: capture
    /// back-references, look-around, word boundaries, and so on.
    #[error("unsupported regex construct: {0}")]
    UnsupportedOperation(String),

    /// A rune could not be re-encoded as UTF-8 while building the CA.
    #[error("invalid UTF-8 while encoding rune: {0}")]
    InvalidUtf8(String),

    /// The pattern failed to parse.
    #[error("failed to parse pattern: {0}")]
    FailedToParse(String),

    /// `^`/`$` appeared somewhere other than the outermost
    /// concatenation's boundaries.
    #[error("anchor used outside the outermost concatenation's edge: {0}")]
    WeirdAnchor(String),
}

impl EngineError {
    /// The process exit code this error corresponds to, per the
    /// engine's error table.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::DoubleIncr(_) => 10,
            EngineError::InternalFailure(_) => 11,
            EngineError::NestedRepetition => 12,
            EngineError::UnsupportedOperation(_) => 13,
            EngineError::InvalidUtf8(_) => 14,
            EngineError::FailedToParse(_) => 15,
            EngineError::WeirdAnchor(_) => 16,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
