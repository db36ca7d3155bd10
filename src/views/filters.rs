//! Custom Tera filters

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tera::{to_value, try_get_value, Value};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Word limit used when the template passes none
pub const DEFAULT_WORD_LIMIT: usize = 30;

/// Cut `text` down to its first `num_words` words.
///
/// Words are separated by runs of whitespace. Longer text is rejoined with
/// single spaces and suffixed with `...`; shorter text is returned as is.
pub fn truncate_text(text: &str, num_words: usize) -> String {
    let words: Vec<&str> = WHITESPACE_RUN.split(text).collect();
    if words.len() > num_words {
        format!("{}...", words[..num_words].join(" "))
    } else {
        text.to_string()
    }
}

/// `{{ post.summary | truncate_words(num_words=20) }}`
pub fn truncate_words(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = try_get_value!("truncate_words", "value", String, value);
    let num_words = match args.get("num_words") {
        Some(n) => try_get_value!("truncate_words", "num_words", usize, n),
        None => DEFAULT_WORD_LIMIT,
    };

    Ok(to_value(truncate_text(&text, num_words))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate_text("one two three", 3), "one two three");
        assert_eq!(truncate_text("keeps   its\tspacing", 5), "keeps   its\tspacing");
    }

    #[test]
    fn test_long_text_truncated() {
        assert_eq!(truncate_text("one two three four", 2), "one two...");
        assert_eq!(truncate_text("a\n\nb   c", 2), "a b...");
    }

    #[test]
    fn test_leading_whitespace_counts_as_empty_word() {
        assert_eq!(truncate_text("  a b c", 2), " a...");
    }

    #[test]
    fn test_zero_limit() {
        assert_eq!(truncate_text("word", 0), "...");
    }

    #[test]
    fn test_filter_with_and_without_argument() {
        let long = vec!["w"; 40].join(" ");
        let value = to_value(&long).unwrap();

        let default = truncate_words(&value, &HashMap::new()).unwrap();
        assert_eq!(default.as_str().unwrap(), format!("{}...", vec!["w"; 30].join(" ")));

        let mut args = HashMap::new();
        args.insert("num_words".to_string(), to_value(3).unwrap());
        let three = truncate_words(&value, &args).unwrap();
        assert_eq!(three.as_str().unwrap(), "w w w...");
    }

    #[test]
    fn test_filter_rejects_non_string() {
        let result = truncate_words(&to_value(42).unwrap(), &HashMap::new());
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn truncated_output_has_at_most_limit_words(
            words in prop::collection::vec("[a-z]{1,8}", 0..60),
            limit in 1usize..40,
        ) {
            let text = words.join(" ");
            let out = truncate_text(&text, limit);

            if words.len() > limit {
                prop_assert!(out.ends_with("..."));
                let kept = out.trim_end_matches("...");
                prop_assert_eq!(kept.split(' ').count(), limit);
                prop_assert!(text.starts_with(kept));
            } else {
                prop_assert_eq!(out, text);
            }
        }
    }
}
