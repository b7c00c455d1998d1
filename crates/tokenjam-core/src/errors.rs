//! Core error types.

use thiserror::Error;

/// Errors raised while loading or validating a puzzle catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog file from disk.
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    /// The catalog file is not valid catalog JSON.
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The catalog contains no puzzles.
    #[error("catalog contains no puzzles")]
    Empty,
    /// A puzzle has no tokens to arrange.
    #[error("puzzle {puzzle} has no tokens")]
    NoTokens {
        /// Index of the offending puzzle.
        puzzle: usize,
    },
    /// A token's starting position is NaN or infinite.
    #[error("puzzle {puzzle} token {token} has a non-finite position")]
    NonFinitePosition {
        /// Index of the offending puzzle.
        puzzle: usize,
        /// Index of the offending token.
        token: usize,
    },
}
