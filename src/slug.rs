//! Heading text to anchor slug conversion.

use std::sync::LazyLock;

use regex::Regex;

/// Everything that is not a letter (`L`), a decimal digit (`Nd`), whitespace,
/// or a hyphen.
#[allow(clippy::expect_used, reason = "constant pattern")]
static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"[^\p{L}\p{Nd}\s-]").expect("valid regex"));

/// Convert heading text to an anchor slug.
///
/// Lowercase, drop everything that is not a letter, decimal digit,
/// whitespace, or hyphen, turn each whitespace character into one hyphen
/// (runs are not collapsed), then trim hyphens from both ends. Letters
/// outside ASCII are kept as they are; other numerals (`½`, `①`, `Ⅻ`) and
/// letter-like symbols (`ⓐ`) are dropped. The result is empty when the text
/// has no letters or digits.
///
/// # Panics
///
/// Panics if the hardcoded character-class regex is invalid (compile-time invariant).
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept = NON_SLUG.replace_all(&lowered, "");
    let slug: String = kept
        .chars()
        .map(|c| return if c.is_whitespace() { '-' } else { c })
        .collect();
    return slug.trim_matches('-').to_string();
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::slugify;

    #[test]
    fn simple_heading() {
        assert_eq!(slugify("Architecture"), "architecture");
    }

    #[test]
    fn multi_word() {
        assert_eq!(slugify("Getting Started"), "getting-started");
    }

    #[test]
    fn removed_punctuation_leaves_double_hyphen() {
        assert_eq!(slugify("Open / remap ports"), "open--remap-ports");
    }

    #[test]
    fn unicode_letters_are_preserved() {
        assert_eq!(
            slugify("Struktura záznamu v úložišti"),
            "struktura-záznamu-v-úložišti"
        );
    }

    #[test]
    fn uppercase_outside_ascii_folds() {
        assert_eq!(slugify("ÚVOD Ärger"), "úvod-ärger");
    }

    #[test]
    fn whitespace_runs_are_not_collapsed() {
        assert_eq!(slugify("a \t b"), "a---b");
    }

    #[test]
    fn edges_are_trimmed() {
        assert_eq!(slugify("  -Hello World-  "), "hello-world");
    }

    #[test]
    fn existing_hyphens_survive() {
        assert_eq!(slugify("Step-by-step"), "step-by-step");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(slugify("?!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn only_decimal_digits_count_as_digits() {
        assert_eq!(slugify("Step ½"), "step");
        assert_eq!(slugify("Krok ①"), "krok");
        assert_eq!(slugify("Chapter Ⅻ"), "chapter");
        assert_eq!(slugify("Level ٣"), "level-٣");
    }

    #[test]
    fn letter_like_symbols_are_dropped() {
        assert_eq!(slugify("Option ⓐ"), "option");
    }

    #[test]
    fn digits_are_kept() {
        assert_eq!(slugify("Version 2.0 (beta)"), "version-20-beta");
    }

    proptest! {
        #[test]
        fn deterministic(text in "\\PC*") {
            prop_assert_eq!(slugify(&text), slugify(&text));
        }

        #[test]
        fn never_starts_or_ends_with_hyphen(text in "\\PC*") {
            let slug = slugify(&text);
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        }
    }
}
