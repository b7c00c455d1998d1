//! The puzzle catalog: an immutable, ordered list fixed at process start.

use std::path::Path;

use crate::errors::CatalogError;
use crate::token::Puzzle;

/// Ordered, non-empty list of puzzles.
#[derive(Clone, Debug)]
pub struct Catalog {
    puzzles: Vec<Puzzle>,
}

impl Catalog {
    /// Build a catalog, rejecting empty lists, empty puzzles, and
    /// non-finite starting positions.
    pub fn new(puzzles: Vec<Puzzle>) -> Result<Self, CatalogError> {
        if puzzles.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (pi, puzzle) in puzzles.iter().enumerate() {
            if puzzle.tokens.is_empty() {
                return Err(CatalogError::NoTokens { puzzle: pi });
            }
            if let Some(ti) = puzzle
                .tokens
                .iter()
                .position(|t| !t.x.is_finite() || !t.y.is_finite())
            {
                return Err(CatalogError::NonFinitePosition {
                    puzzle: pi,
                    token: ti,
                });
            }
        }
        Ok(Self { puzzles })
    }

    /// Parse a catalog from JSON: `[{"goal": "...", "tokens": [{"label", "x", "y"}]}]`.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let puzzles: Vec<Puzzle> = serde_json::from_str(json)?;
        Self::new(puzzles)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The puzzle at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Puzzle> {
        self.puzzles.get(index)
    }

    /// Number of puzzles. Always at least one.
    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    /// Index of the last puzzle.
    pub fn last_index(&self) -> usize {
        self.puzzles.len() - 1
    }

    /// The built-in Haskell puzzle set.
    pub fn builtin() -> Self {
        Self {
            puzzles: builtin_puzzles(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_puzzles() -> Vec<Puzzle> {
    vec![
        Puzzle::new(
            "[0,1,2,3,4]",
            &[
                ("take", 0.76, 0.58),
                ("5", 0.17, 0.56),
                ("$", 0.36, 0.7),
                ("iterate", 0.62, 0.21),
                ("(+1)", 0.28, 0.24),
                ("0", 0.5, 0.5),
            ],
        ),
        Puzzle::new(
            "32",
            &[
                ("iterate", 0.7, 0.25),
                ("(", 0.71, 0.44),
                ("join", 0.27, 0.29),
                ("(+)", 0.59, 0.62),
                (")", 0.5, 0.18),
                ("1", 0.14, 0.59),
                ("!!", 0.44, 0.46),
                ("5", 0.14, 0.25),
            ],
        ),
        Puzzle::new(
            "e",
            &[
                ("succ", 0.14, 0.77),
                ("$", 0.45, 0.49),
                ("sum", 0.79, 0.18),
                ("$", 0.52, 0.48),
                ("scanl1", 0.76, 0.79),
                ("(/)", 0.45, 0.85),
                ("[1..100]", 0.15, 0.25),
            ],
        ),
        Puzzle::new(
            "8",
            &[
                ("let", 0.582, 0.957),
                ("a", 0.683, 0.686),
                ("+", 0.635, 0.815),
                ("b", 0.796, 0.952),
                ("=", 0.738, 0.812),
                ("a", 0.706, 0.945),
                ("*", 0.391, 0.376),
                ("b", 0.687, 0.817),
                ("in", 0.594, 0.691),
                ("2 + 2", 0.245, 0.367),
                ("+", 0.765, 0.705),
                ("2", 0.459, 0.367),
            ],
        ),
        Puzzle::new(
            "\"fin\"",
            &[
                ("take", 0.76, 0.65),
                ("3", 0.65, 0.31),
                ("$", 0.13, 0.82),
                ("drop", 0.87, 0.79),
                ("2", 0.58, 0.31),
                ("$", 0.19, 0.76),
                ("show", 0.69, 0.83),
                ("$", 0.2, 0.88),
                ("1", 0.5, 0.31),
                ("/", 0.8, 0.9),
                ("0", 0.41, 0.31),
            ],
        ),
    ]
}
