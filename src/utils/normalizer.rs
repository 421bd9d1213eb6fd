//! Word normalization and chunking.
//!
//! Both the import path and the lookup path run words through [`normalize`]
//! before touching the bucket, so stored and checked forms always agree.
//! [`chunk`] splits a normalized word into fixed-size substrings for substring
//! containment checks: a password matches if any of its chunks is stored.
//!
//! # Examples
//!
//! ```
//! use wordlist::config::WordlistConfiguration;
//! use wordlist::utils::normalizer::{chunk, normalize};
//!
//! let config = WordlistConfiguration { min_word_size: 3, max_word_size: 6, ..Default::default() };
//! assert_eq!(normalize("  PassWord  ", &config).as_deref(), Some("passwo"));
//! assert_eq!(normalize("ab", &config), None);
//!
//! let chunks = chunk("abcd", 3);
//! assert!(chunks.contains("abc") && chunks.contains("bcd"));
//! ```

use std::collections::HashSet;

use crate::config::WordlistConfiguration;

/// Trims, case folds and length-bounds a word.
///
/// Returns `None` for blank words and for words shorter than `min_word_size`
/// characters. Words longer than `max_word_size` characters are truncated.
pub fn normalize(word: &str, config: &WordlistConfiguration) -> Option<String> {
    let trimmed = word.trim();
    if trimmed.is_empty() {
        return None;
    }

    let folded = if config.case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    };

    let bounded = truncate_chars(&folded, config.max_word_size).trim_end();
    if bounded.is_empty() || bounded.chars().count() < config.min_word_size {
        return None;
    }
    Some(bounded.to_string())
}

fn truncate_chars(word: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return word;
    }
    match word.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &word[..byte_index],
        None => word,
    }
}

/// Splits `word` into its distinct substrings of exactly `chunk_size` characters.
///
/// A `chunk_size` of 0, or one at least as long as the word, yields the whole word.
pub fn chunk(word: &str, chunk_size: usize) -> HashSet<String> {
    let chars: Vec<char> = word.chars().collect();
    if chunk_size == 0 || chunk_size >= chars.len() {
        return HashSet::from([word.to_string()]);
    }
    chars
        .windows(chunk_size)
        .map(|window| window.iter().collect::<String>())
        .collect()
}

/// Number of windows [`chunk`] would examine for `word`, before de-duplication.
pub fn chunk_count(word: &str, chunk_size: usize) -> usize {
    let len = word.chars().count();
    if chunk_size == 0 || chunk_size >= len {
        1
    } else {
        len - chunk_size + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(min: usize, max: usize, case_sensitive: bool) -> WordlistConfiguration {
        WordlistConfiguration {
            min_word_size: min,
            max_word_size: max,
            case_sensitive,
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_bounds_and_case() {
        let cfg = config(4, 64, false);
        assert_eq!(normalize("Password1", &cfg).as_deref(), Some("password1"));
        assert_eq!(normalize("  ", &cfg), None);
        assert_eq!(normalize("abc", &cfg), None);
        assert_eq!(normalize(" qwerty\t", &cfg).as_deref(), Some("qwerty"));

        let sensitive = config(1, 3, true);
        assert_eq!(normalize("ABCDEF", &sensitive).as_deref(), Some("ABC"));
    }

    #[test]
    fn test_truncation_does_not_leave_trailing_space() {
        let cfg = config(1, 4, false);
        assert_eq!(normalize("abc def", &cfg).as_deref(), Some("abc"));
    }

    #[test]
    fn test_chunk_sliding_window() {
        let chunks = chunk("password", 5);
        let expected: HashSet<String> = ["passw", "asswo", "sswor", "sword"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(chunks, expected);
        assert_eq!(chunk_count("password", 5), 4);
    }

    #[test]
    fn test_chunk_whole_word() {
        assert_eq!(chunk("abc", 0), HashSet::from(["abc".to_string()]));
        assert_eq!(chunk("abc", 3), HashSet::from(["abc".to_string()]));
        assert_eq!(chunk("abc", 10), HashSet::from(["abc".to_string()]));
    }

    #[test]
    fn test_chunk_deduplicates() {
        assert_eq!(chunk("aaaa", 2), HashSet::from(["aa".to_string()]));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(word in "[ -~À-ÿ\t]{0,80}", min in 0usize..6, max in 1usize..40, cs in any::<bool>()) {
            let cfg = config(min, max, cs);
            if let Some(once) = normalize(&word, &cfg) {
                prop_assert_eq!(normalize(&once, &cfg), Some(once.clone()));
            }
        }

        #[test]
        fn prop_single_char_chunks_cover_word(word in "[a-z0-9]{1,30}") {
            let chunks = chunk(&word, 1);
            if word.chars().count() > 1 {
                for c in word.chars() {
                    prop_assert!(chunks.contains(&c.to_string()));
                }
            } else {
                prop_assert_eq!(chunks, HashSet::from([word.clone()]));
            }
        }
    }
}
