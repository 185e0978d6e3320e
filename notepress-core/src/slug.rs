//! Slugs for URL path segments.

use regex::Regex;
use std::sync::OnceLock;

static HYPHEN_RUNS: OnceLock<Regex> = OnceLock::new();

fn hyphen_runs() -> &'static Regex {
    HYPHEN_RUNS.get_or_init(|| Regex::new(r"-+").unwrap())
}

/// Turn a note title or file stem into a path segment.
///
/// The text is lowercased, spaces and underscores become `-`, anything
/// outside `[a-z0-9-]` is dropped (non-ASCII letters included), hyphen runs
/// collapse to one and edge hyphens are trimmed. `slugify(slugify(x))`
/// equals `slugify(x)`.
///
/// ```
/// use notepress_core::slugify;
///
/// assert_eq!(slugify("Four Modes of AI_Assistance"), "four-modes-of-ai-assistance");
/// assert_eq!(slugify("Tips & Tricks!"), "tips-tricks");
/// ```
pub fn slugify(input: &str) -> String {
    let kept: String = input
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
        .collect();

    hyphen_runs()
        .replace_all(&kept, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_titles() {
        assert_eq!(slugify("Weekly Review 2024-03"), "weekly-review-2024-03");
        assert_eq!(slugify("git_rebase_notes"), "git-rebase-notes");
        assert_eq!(slugify("Why I Use Vim (Still)"), "why-i-use-vim-still");
    }

    #[test]
    fn test_punctuation_is_dropped() {
        assert_eq!(slugify("v1.2: what's changed?"), "v12-whats-changed");
        assert_eq!(slugify("a/b\\c"), "abc");
    }

    #[test]
    fn test_only_ascii_survives() {
        assert_eq!(slugify("Über Café"), "ber-caf");
        assert_eq!(slugify("日本語 notes"), "notes");
    }

    #[test]
    fn test_other_whitespace_is_not_a_separator() {
        assert_eq!(slugify("tab\tseparated\nlines"), "tabseparatedlines");
    }

    #[test]
    fn test_hyphen_cleanup() {
        assert_eq!(slugify(" -- spaced -- "), "spaced");
        assert_eq!(slugify("x _ - _ y"), "x-y");
        assert_eq!(slugify("_index"), "index");
    }

    #[test]
    fn test_degenerate_inputs() {
        for input in ["", "   ", "???", "___"] {
            assert_eq!(slugify(input), "", "input {input:?}");
        }
    }

    #[test]
    fn test_idempotent_and_alphabet() {
        let inputs = [
            "Four Modes of AI Assistance",
            "--a__b--",
            "Ünïcödé & stuff",
            "MiXeD_case-With 123",
            "#$%^&*()",
            "a-_-b",
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
}
