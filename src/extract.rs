//! Normalization of page extracts returned by the text-extraction API.

use std::borrow::Cow;

const ELLIPSIS: &str = "...";

/// Turns a raw extract into display-ready text.
///
/// Parentheticals are removed first, then a trailing ellipsis. Returns `None`
/// when the input is missing or nothing is left after processing.
pub fn process_extract(extract: Option<&str>) -> Option<String> {
    let extract = extract.filter(|text| !text.is_empty())?;
    let without_parens = remove_parentheticals(extract);
    let result = remove_ellipsis(&without_parens);
    if result.is_empty() {
        None
    } else {
        Some(result.to_string())
    }
}

/// Strips a single trailing `...` from the extract, if present.
pub fn remove_ellipsis(extract: &str) -> &str {
    extract.strip_suffix(ELLIPSIS).unwrap_or(extract)
}

/// Removes every `(...)` span, including nested ones.
///
/// A space directly before an opening parenthesis is dropped as well. When the
/// parentheses are unbalanced or out of order the extract is returned as is.
pub fn remove_parentheticals(extract: &str) -> Cow<'_, str> {
    let mut result = String::with_capacity(extract.len());
    let mut level = 0usize;
    let mut chars = extract.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ')' if level == 0 => return Cow::Borrowed(extract),
            '(' => level += 1,
            ')' => level -= 1,
            _ if level > 0 => {}
            ' ' if chars.peek() == Some(&'(') => {}
            _ => result.push(ch),
        }
    }

    if level == 0 {
        Cow::Owned(result)
    } else {
        Cow::Borrowed(extract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn removes_simple_parenthetical() {
        assert_eq!(remove_parentheticals("foo (bar) baz"), "foo baz");
    }

    #[test]
    fn removes_nested_parentheticals() {
        assert_eq!(remove_parentheticals("a (b (c) d) e"), "a e");
    }

    #[test]
    fn unclosed_paren_leaves_text_untouched() {
        assert_eq!(remove_parentheticals("foo (bar baz"), "foo (bar baz");
    }

    #[test]
    fn unmatched_closer_leaves_text_untouched() {
        assert_eq!(remove_parentheticals("foo) bar"), "foo) bar");
        assert_eq!(remove_parentheticals("foo (bar)) baz"), "foo (bar)) baz");
    }

    #[test]
    fn only_the_space_before_the_paren_is_dropped() {
        assert_eq!(remove_parentheticals("foo  (bar)  baz"), "foo   baz");
        assert_eq!(remove_parentheticals("foo(bar) baz"), "foo baz");
    }

    #[test]
    fn parentheticals_keep_multibyte_text() {
        assert_eq!(
            remove_parentheticals("Zürich (/ˈzjʊərɪk/) ist eine Stadt"),
            "Zürich ist eine Stadt"
        );
    }

    #[test]
    fn strips_one_trailing_ellipsis() {
        assert_eq!(remove_ellipsis("Hello world..."), "Hello world");
        assert_eq!(remove_ellipsis("Hello world.."), "Hello world..");
        assert_eq!(remove_ellipsis("Hello world......"), "Hello world...");
        assert_eq!(remove_ellipsis("Hello... world"), "Hello... world");
    }

    #[test]
    fn process_extract_applies_both_steps() {
        assert_eq!(
            process_extract(Some("Hello world...")).as_deref(),
            Some("Hello world")
        );
        assert_eq!(
            process_extract(Some("Cats (Felis catus) are small...")).as_deref(),
            Some("Cats are small")
        );
    }

    #[test]
    fn missing_or_empty_extract_is_absent() {
        assert_eq!(process_extract(None), None);
        assert_eq!(process_extract(Some("")), None);
    }

    #[test]
    fn extract_that_is_only_noise_is_absent() {
        assert_eq!(process_extract(Some("(only parens)")), None);
        assert_eq!(process_extract(Some("...")), None);
        assert_eq!(process_extract(Some("(aside)...")), None);
    }

    #[test]
    fn text_without_parens_only_loses_the_ellipsis() {
        let samples = [
            "Plain sentence.",
            "Trailing dots...",
            "  padded  ",
            "Two. Sentences...",
            "Ends with four....",
        ];
        for sample in samples {
            let expected = sample.strip_suffix("...").unwrap_or(sample);
            let processed = process_extract(Some(sample));
            if expected.is_empty() {
                assert_eq!(processed, None);
            } else {
                assert_eq!(processed.as_deref(), Some(expected), "sample {sample:?}");
            }
        }
    }

    #[test]
    fn unbalanced_text_still_gets_ellipsis_removed() {
        assert_eq!(
            process_extract(Some("foo (bar baz...")).as_deref(),
            Some("foo (bar baz")
        );
    }

    proptest! {
        #[test]
        fn paren_free_text_only_loses_the_ellipsis(text in "[^()]*") {
            let expected = text.strip_suffix("...").unwrap_or(&text);
            let processed = process_extract(Some(&text));
            if expected.is_empty() {
                prop_assert_eq!(processed, None);
            } else {
                prop_assert_eq!(processed.as_deref(), Some(expected));
            }
        }

        #[test]
        fn processed_extract_is_never_empty(text in any::<String>()) {
            if let Some(processed) = process_extract(Some(&text)) {
                prop_assert!(!processed.is_empty());
            }
        }
    }
}
