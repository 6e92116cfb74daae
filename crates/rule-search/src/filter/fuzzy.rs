//! Fuzzy name matching for rule, group, and namespace filters.
//!
//! Short, mostly-ASCII needles are split into terms; every term must occur in
//! the haystack (in any order), and terms of [`TYPO_MIN_TERM_CHARS`] or more
//! characters may carry a single typo. Anything else falls back to a plain
//! case-insensitive substring match.

/// Needles longer than this fall back to substring matching.
pub const FUZZY_MAX_CHARS: usize = 25;
/// Needles with more terms than this fall back to substring matching.
pub const FUZZY_MAX_TERMS: usize = 5;
/// Share of non-ASCII characters above which fuzzy matching is disabled.
pub const FUZZY_MAX_NON_ASCII_RATIO: f32 = 0.2;
/// Minimum term length for which one edit is tolerated.
pub const TYPO_MIN_TERM_CHARS: usize = 4;

pub fn fuzzy_matches(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let haystack = haystack.to_lowercase();

    if !uses_fuzzy_mode(&needle) {
        return haystack.contains(needle.as_str());
    }

    needle.split_whitespace().all(|term| {
        if term.chars().count() >= TYPO_MIN_TERM_CHARS {
            contains_within_one_edit(&haystack, term)
        } else {
            haystack.contains(term)
        }
    })
}

fn uses_fuzzy_mode(needle: &str) -> bool {
    let total = needle.chars().count();
    if total > FUZZY_MAX_CHARS {
        return false;
    }
    if needle.split_whitespace().count() > FUZZY_MAX_TERMS {
        return false;
    }
    let non_ascii = needle.chars().filter(|ch| !ch.is_ascii()).count();
    (non_ascii as f32) <= (total as f32) * FUZZY_MAX_NON_ASCII_RATIO
}

fn contains_within_one_edit(haystack: &str, term: &str) -> bool {
    if haystack.contains(term) {
        return true;
    }
    approximate_substring_distance(haystack, term, 1).is_some()
}

/// Smallest optimal-string-alignment distance between `pattern` and any
/// substring of `text`, or `None` once it is known to exceed `threshold`.
///
/// Columns run over `text`; row 0 is always zero so a match may start anywhere.
#[allow(clippy::needless_range_loop)]
fn approximate_substring_distance(text: &str, pattern: &str, threshold: usize) -> Option<usize> {
    let pattern: Vec<char> = pattern.chars().collect();
    let len = pattern.len();
    if len <= threshold {
        return Some(len);
    }

    let mut before_prev: Vec<usize> = (0..=len).collect();
    let mut prev: Vec<usize> = (0..=len).collect();
    let mut current = vec![0; len + 1];
    let mut prev_char: Option<char> = None;
    let mut best = len;

    for ch in text.chars() {
        current[0] = 0;
        for i in 1..=len {
            let cost = usize::from(pattern[i - 1] != ch);
            let mut value = (prev[i - 1] + cost)
                .min(prev[i] + 1)
                .min(current[i - 1] + 1);

            // Transposition of two adjacent characters.
            if i > 1 && prev_char == Some(pattern[i - 1]) && ch == pattern[i - 2] {
                value = value.min(before_prev[i - 2] + 1);
            }
            current[i] = value;
        }

        best = best.min(current[len]);
        if best == 0 {
            return Some(0);
        }

        std::mem::swap(&mut before_prev, &mut prev);
        std::mem::swap(&mut prev, &mut current);
        prev_char = Some(ch);
    }

    (best <= threshold).then_some(best)
}
