//! Reading-order reconstruction of a token layout.
//!
//! Tokens whose vertical position lies within [`BAND`] of [`BASELINE`] are
//! on the workspace line; they are read left to right. Everything else is
//! off the workspace and excluded from the expression.

use crate::token::Token;

/// Vertical position of the workspace line.
pub const BASELINE: f64 = 0.5;

/// Half-height of the band around [`BASELINE`] (exclusive).
pub const BAND: f64 = 0.1;

/// Whether a token sits on the workspace line.
pub fn on_workspace(token: &Token) -> bool {
    (token.y - BASELINE).abs() < BAND
}

/// Indices of the on-workspace tokens in reading order.
///
/// Sorted by ascending `x`; the sort is stable, so ties keep index order.
pub fn arrange(tokens: &[Token]) -> Vec<usize> {
    let mut order: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| on_workspace(t))
        .map(|(i, _)| i)
        .collect();
    order.sort_by(|&a, &b| tokens[a].x.total_cmp(&tokens[b].x));
    order
}

/// Space-joined labels of the arranged tokens.
pub fn expression(tokens: &[Token]) -> String {
    arrange(tokens)
        .into_iter()
        .map(|i| tokens[i].label.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether every token is on the workspace and the reading order equals
/// the raw index order `0..n`.
pub fn is_reading_order(tokens: &[Token]) -> bool {
    let order = arrange(tokens);
    order.len() == tokens.len() && order.iter().enumerate().all(|(pos, &i)| pos == i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(label: &str, x: f64, y: f64) -> Token {
        Token::new(label, x, y)
    }

    #[test]
    fn sorts_left_to_right() {
        let tokens = vec![tok("b", 0.6, 0.5), tok("a", 0.2, 0.5), tok("c", 0.9, 0.5)];
        assert_eq!(arrange(&tokens), vec![1, 0, 2]);
        assert_eq!(expression(&tokens), "a b c");
    }

    #[test]
    fn excludes_tokens_off_the_line() {
        let tokens = vec![
            tok("take", 0.3, 0.5),
            tok("5", 0.4, 0.61),
            tok("$", 0.5, 0.39),
            tok("0", 0.6, 0.45),
        ];
        assert_eq!(arrange(&tokens), vec![0, 3]);
        assert_eq!(expression(&tokens), "take 0");
    }

    #[test]
    fn far_tokens_are_off_workspace() {
        assert!(!on_workspace(&tok("a", 0.1, 0.75)));
        assert!(!on_workspace(&tok("b", 0.2, 0.25)));
        assert!(on_workspace(&tok("c", 0.3, 0.5)));
    }

    #[test]
    fn ties_keep_index_order() {
        let tokens = vec![tok("x", 0.5, 0.5), tok("y", 0.5, 0.5), tok("z", 0.1, 0.5)];
        assert_eq!(arrange(&tokens), vec![2, 0, 1]);
    }

    #[test]
    fn empty_layout_gives_empty_expression() {
        assert_eq!(expression(&[]), "");
        let off = vec![tok("a", 0.5, 0.9)];
        assert_eq!(expression(&off), "");
    }

    #[test]
    fn reading_order_requires_every_token() {
        let tokens = vec![tok("take", 0.1, 0.5), tok("5", 0.2, 0.5), tok("$", 0.3, 0.9)];
        assert!(!is_reading_order(&tokens));
    }

    #[test]
    fn reading_order_compares_indices_not_labels() {
        // Same labels, swapped positions: the expression matches but the
        // index order does not.
        let tokens = vec![tok("$", 0.4, 0.5), tok("$", 0.2, 0.5)];
        assert_eq!(expression(&tokens), "$ $");
        assert!(!is_reading_order(&tokens));
    }

    #[test]
    fn reading_order_holds_when_assembled() {
        let tokens = vec![tok("take", 0.1, 0.5), tok("5", 0.2, 0.45), tok("$", 0.3, 0.55)];
        assert!(is_reading_order(&tokens));
    }

    #[test]
    fn reading_order_of_empty_layout() {
        assert!(is_reading_order(&[]));
    }
}
