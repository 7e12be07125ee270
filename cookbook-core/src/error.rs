//! Error type for the recipe ledger and fixture lookup.

use arrow_schema::ArrowError;
use thiserror::Error;

/// Recoverable failures of the recipe output harness.
///
/// Contract violations while bracketing a recipe (empty names, nested or
/// mismatched start/end) are not represented here; they panic.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// The persisted table does not have the two Utf8 recipe columns.
    #[error("Invalid recipe table: {0}")]
    InvalidTable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
