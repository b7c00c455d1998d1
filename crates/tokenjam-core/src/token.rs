//! Tokens and puzzles.

use serde::{Deserialize, Serialize};

/// One draggable code fragment.
///
/// Coordinates are normalized to the unit square of the shared workspace.
/// A token's identity is its index in the current puzzle's token list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Display label (the code fragment itself).
    pub label: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Token {
    /// Create a token at the given position.
    pub fn new(label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            label: label.into(),
            x,
            y,
        }
    }

    /// Move the token.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }
}

/// A goal description plus the layout every session starts the puzzle from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    /// What the arranged expression should evaluate to.
    pub goal: String,
    /// Starting layout.
    pub tokens: Vec<Token>,
}

impl Puzzle {
    /// Create a puzzle from `(label, x, y)` triples.
    pub fn new(goal: impl Into<String>, tokens: &[(&str, f64, f64)]) -> Self {
        Self {
            goal: goal.into(),
            tokens: tokens
                .iter()
                .map(|&(label, x, y)| Token::new(label, x, y))
                .collect(),
        }
    }

    /// Number of tokens in the puzzle.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}
