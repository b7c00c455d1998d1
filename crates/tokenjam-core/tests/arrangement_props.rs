//! Property tests for the arrangement function.

use proptest::prelude::*;
use tokenjam_core::arrangement::{BAND, BASELINE};
use tokenjam_core::{Token, arrange, expression, is_reading_order};

fn token_strategy() -> impl Strategy<Value = Token> {
    ("[a-z$+()0-9]{1,6}", 0.0f64..1.0, 0.0f64..1.0).prop_map(|(l, x, y)| Token::new(l, x, y))
}

fn layout_strategy() -> impl Strategy<Value = Vec<Token>> {
    prop::collection::vec(token_strategy(), 0..16)
}

/// Reference: filter, then insertion-sort by x keeping index order on ties.
fn reference_order(tokens: &[Token]) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::new();
    for (i, t) in tokens.iter().enumerate() {
        if (t.y - BASELINE).abs() >= BAND {
            continue;
        }
        let pos = out
            .iter()
            .position(|&j| tokens[j].x > t.x)
            .unwrap_or(out.len());
        out.insert(pos, i);
    }
    out
}

proptest! {
    #[test]
    fn matches_reference_order(tokens in layout_strategy()) {
        prop_assert_eq!(arrange(&tokens), reference_order(&tokens));
    }

    #[test]
    fn expression_joins_arranged_labels(tokens in layout_strategy()) {
        let expected = reference_order(&tokens)
            .into_iter()
            .map(|i| tokens[i].label.clone())
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(expression(&tokens), expected);
    }

    #[test]
    fn arrangement_is_pure(tokens in layout_strategy()) {
        prop_assert_eq!(arrange(&tokens), arrange(&tokens));
        prop_assert_eq!(expression(&tokens), expression(&tokens));
    }

    #[test]
    fn arranged_x_is_non_decreasing(tokens in layout_strategy()) {
        let order = arrange(&tokens);
        for pair in order.windows(2) {
            prop_assert!(tokens[pair[0]].x <= tokens[pair[1]].x);
        }
    }

    #[test]
    fn increasing_x_on_baseline_is_reading_order(n in 0usize..12) {
        let tokens: Vec<Token> = (0..n)
            .map(|i| Token::new(format!("t{i}"), i as f64 / 16.0, BASELINE))
            .collect();
        prop_assert!(is_reading_order(&tokens));
    }
}
