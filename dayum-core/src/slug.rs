//! Slug helpers shared by the seed tool, route resolution and the reader.

use std::sync::OnceLock;

use regex::Regex;

pub const SEPARATOR: char = '-';

fn non_alphanumeric_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

/// Lowercases, collapses every non-alphanumeric run into a single `-` and trims
/// separators from both ends. `slugify("The Haunted House") == "the-haunted-house"`.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    non_alphanumeric_runs()
        .replace_all(&lowered, "-")
        .trim_matches(SEPARATOR)
        .to_string()
}

/// A slug usable as a lookup key: non-empty after trimming and made only of URL-safe
/// characters (ASCII alphanumerics, `-`, `_`, `.`, `~`).
pub fn is_valid_slug(slug: &str) -> bool {
    let trimmed = slug.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

/// Display title derived from a slug: `"virtual-art"` becomes `"Virtual Art"`.
/// Every separator becomes one space. Only ever used for display.
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_examples() {
        assert_eq!(slugify("The Haunted House"), "the-haunted-house");
        assert_eq!(slugify("  Space -- Adventures!! "), "space-adventures");
        assert_eq!(slugify("3-D"), "3-d");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn slugify_is_idempotent_and_clean() {
        let inputs = [
            "The Secret Garden",
            "--already-a-slug--",
            "Émile's Café, No. 5",
            "MiXeD_case__under_scores",
            "",
            "a",
            "tabs\tand\nnewlines",
        ];
        for input in inputs {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
            assert!(once
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            assert!(!once.starts_with('-') && !once.ends_with('-'));
            assert!(!once.contains("--"));
        }
    }

    #[test]
    fn title_from_slug_capitalizes_words() {
        assert_eq!(title_from_slug("virtual-art"), "Virtual Art");
        assert_eq!(title_from_slug("coding"), "Coding");
        assert_eq!(title_from_slug("the_haunted-house"), "The Haunted House");
        assert_eq!(title_from_slug("a--b"), "A  B");
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("the-haunted-house"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("   "));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("slash/inside"));
    }
}
