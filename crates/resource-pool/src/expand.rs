//! Range and template expansion for enumerable pool definitions
//!
//! Turns compact definitions into explicit value sequences:
//! - `"0-1,3-6"` → `[0, 1, 3, 4, 5, 6]`
//! - `["et-[0-1]/0/0"]` → `["et-0/0/0", "et-1/0/0"]`

use crate::{Error, Result};
use regex::Regex;
use std::collections::VecDeque;

/// Bracketed numeric-range expression inside a template, e.g. `[0-3,8]`.
const BRACKET_EXPR: &str = r"\[([0-9,\-]+)\]";

/// Expand a comma-separated range specification into explicit values.
///
/// Each token is a single integer or an inclusive `low-high` range. Values
/// are concatenated in token order with ranges ascending; duplicates across
/// tokens are preserved. An inverted range (`"6-3"`) contributes nothing.
pub fn expand_range(spec: &str) -> Result<Vec<u64>> {
    let parse = |token: &str| -> Result<u64> {
        token
            .trim()
            .parse()
            .map_err(|_| Error::InvalidRangeExpr(spec.to_string()))
    };

    let mut values = Vec::new();
    for token in spec.split(',') {
        match token.split_once('-') {
            Some((low, high)) => values.extend(parse(low)?..=parse(high)?),
            None => values.push(parse(token)?),
        }
    }
    Ok(values)
}

/// Expand bracket templates into one string per substituted value.
///
/// A template without brackets passes through unchanged. A bracketed range
/// expression is expanded with [`expand_range`] and substituted in place,
/// leftmost bracket first; templates that still contain brackets after one
/// substitution are re-queued at the front of the work list, so the output
/// order matches a depth-first expansion without recursing.
pub fn expand_list<S: AsRef<str>>(templates: &[S]) -> Result<Vec<String>> {
    let bracket = Regex::new(BRACKET_EXPR).map_err(|e| Error::InvalidRangeExpr(e.to_string()))?;

    let mut expanded = Vec::new();
    let mut pending: VecDeque<String> = templates
        .iter()
        .map(|t| t.as_ref().to_string())
        .collect();

    while let Some(template) = pending.pop_front() {
        let Some(found) = bracket.find(&template) else {
            expanded.push(template);
            continue;
        };
        let values = expand_range(&template[found.start() + 1..found.end() - 1])?;
        for value in values.iter().rev() {
            pending.push_front(format!(
                "{}{}{}",
                &template[..found.start()],
                value,
                &template[found.end()..]
            ));
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_range_mixed_tokens() {
        assert_eq!(expand_range("0-1,3-6").unwrap(), vec![0, 1, 3, 4, 5, 6]);
        assert_eq!(expand_range("0-1,3").unwrap(), vec![0, 1, 3]);
        assert_eq!(expand_range("0-1,6,7,10").unwrap(), vec![0, 1, 6, 7, 10]);
        assert_eq!(expand_range("4").unwrap(), vec![4]);
    }

    #[test]
    fn test_expand_range_preserves_token_order_and_duplicates() {
        assert_eq!(expand_range("5,2,2-3").unwrap(), vec![5, 2, 2, 3]);
    }

    #[test]
    fn test_expand_range_inverted_token_is_empty() {
        assert_eq!(expand_range("6-3").unwrap(), Vec::<u64>::new());
        assert_eq!(expand_range("6-3,1").unwrap(), vec![1]);
    }

    #[test]
    fn test_expand_range_rejects_non_numeric() {
        assert!(matches!(
            expand_range("a-b"),
            Err(Error::InvalidRangeExpr(_))
        ));
        assert!(expand_range("1,").is_err());
    }

    #[test]
    fn test_expand_list_literal_passthrough() {
        let out = expand_list(&["lo0", "fxp0"]).unwrap();
        assert_eq!(out, vec!["lo0", "fxp0"]);
    }

    #[test]
    fn test_expand_list_single_bracket() {
        let out = expand_list(&["et-[0-1]/0/0"]).unwrap();
        assert_eq!(out, vec!["et-0/0/0", "et-1/0/0"]);
    }

    #[test]
    fn test_expand_list_multiple_templates() {
        let out = expand_list(&["t1[0-2]", "t2[12,14]"]).unwrap();
        assert_eq!(out, vec!["t10", "t11", "t12", "t212", "t214"]);
    }

    #[test]
    fn test_expand_list_order_follows_expansion_not_sorting() {
        let out = expand_list(&["t[5,2,1,6]"]).unwrap();
        assert_eq!(out, vec!["t5", "t2", "t1", "t6"]);
    }

    #[test]
    fn test_expand_list_nested_brackets_depth_first() {
        let out = expand_list(&["a[0-1]b[2-3]"]).unwrap();
        assert_eq!(out, vec!["a0b2", "a0b3", "a1b2", "a1b3"]);
    }

    #[test]
    fn test_expand_list_propagates_range_errors() {
        assert!(expand_list(&["et-[0-]/0/0"]).is_err());
    }
}
