//! Error taxonomy for the scanning pass.
//!
//! Scan errors are file-scoped: a malformed source file is skipped with a
//! warning and the remaining files are still processed. Nothing in here
//! aborts a whole run.

use thiserror::Error;

/// Per-file scan failures. Offsets are byte positions into the file's text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    /// A `/* ... */` comment that never closes.
    #[error("unterminated block comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },

    /// A requirement marker appeared before any plugin declaration in its file.
    #[error("requirement marker at byte {offset} has no preceding plugin declaration")]
    OrphanRequirement { offset: usize },
}
