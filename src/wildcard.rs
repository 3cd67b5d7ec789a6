// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Glob-style matching of words
//!
//! `*` matches any run of chars (including none), `?` matches exactly one
//! char. There is no escaping.
//!
//! The matcher walks the literal segment before the first `*`, then tries
//! every following segment at each name position, backtracking one char at
//! a time on a mismatch. It is quadratic in the worst case.

/// Wildcard matching any run of chars
pub const MANY: char = '*';

/// Wildcard matching a single char
pub const ONE: char = '?';

/// A compiled wildcard pattern
#[derive(Clone, Debug)]
pub struct WildcardPattern {
    chars: Vec<char>,
    case_sensitive: bool,
}

/// Compares two chars, optionally ignoring case.
///
/// Case is folded per char, so one char never turns into several.
fn chars_eq(a: char, b: char, case_sensitive: bool) -> bool {
    a == b || (!case_sensitive && a.to_lowercase().eq(b.to_lowercase()))
}

impl WildcardPattern {
    /// Compiles a pattern.
    #[must_use]
    pub fn new(pattern: &str, case_sensitive: bool) -> Self {
        Self {
            chars: pattern.chars().collect(),
            case_sensitive,
        }
    }

    /// Returns `true` if the pattern contains `*` or `?`.
    #[must_use]
    pub fn has_wildcards(&self) -> bool {
        self.chars.iter().any(|&c| c == MANY || c == ONE)
    }

    /// Returns `true` if `name` matches the pattern.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        let name = name.chars().collect::<Vec<_>>();
        match_chars(&self.chars, &name, self.case_sensitive)
    }
}

/// Returns the literal part of `pattern` before its first wildcard.
#[must_use]
pub fn literal_prefix(pattern: &str) -> &str {
    pattern
        .find([MANY, ONE])
        .and_then(|idx| pattern.get(..idx))
        .unwrap_or(pattern)
}

/// Matches `name` against `pattern`.
///
/// A missing name never matches, a missing pattern matches everything.
#[must_use]
pub fn matches(pattern: Option<&str>, name: Option<&str>, case_sensitive: bool) -> bool {
    let Some(name) = name else {
        return false;
    };
    let Some(pattern) = pattern else {
        return true;
    };

    WildcardPattern::new(pattern, case_sensitive).is_match(name)
}

/// Returns `true` if `word` starts with `prefix`, ignoring case.
#[must_use]
pub fn starts_with_ignore_case(word: &str, prefix: &str) -> bool {
    let mut word = word.chars();

    prefix
        .chars()
        .all(|c| word.next().is_some_and(|w| chars_eq(c, w, false)))
}

fn match_chars(pattern: &[char], name: &[char], case_sensitive: bool) -> bool {
    let pattern_end = pattern.len();
    let name_end = name.len();

    let mut i_pattern = 0;
    let mut i_name = 0;

    // Literal segment before the first *
    while let Some(&c) = pattern.get(i_pattern) {
        if c == MANY {
            break;
        }

        let Some(&n) = name.get(i_name) else {
            return false;
        };
        if c != ONE && !chars_eq(c, n, case_sensitive) {
            return false;
        }

        i_pattern += 1;
        i_name += 1;
    }

    if i_pattern == pattern_end {
        return i_name == name_end;
    }

    // pattern[i_pattern] is *
    i_pattern += 1;
    let mut segment_start = i_pattern;
    let mut prefix_start = i_name;

    while i_name < name_end {
        let Some(&c) = pattern.get(i_pattern) else {
            // Segment matched but the name goes on, retry one char later
            i_pattern = segment_start;
            prefix_start += 1;
            i_name = prefix_start;
            continue;
        };

        if c == MANY {
            i_pattern += 1;
            segment_start = i_pattern;

            if segment_start == pattern_end {
                return true;
            }

            prefix_start = i_name;
            continue;
        }

        if c != ONE && name.get(i_name).is_some_and(|&n| !chars_eq(c, n, case_sensitive)) {
            i_pattern = segment_start;
            prefix_start += 1;
            i_name = prefix_start;
            continue;
        }

        i_name += 1;
        i_pattern += 1;
    }

    segment_start == pattern_end
        || (i_name == name_end && i_pattern == pattern_end)
        || (i_pattern + 1 == pattern_end && pattern.get(i_pattern) == Some(&MANY))
}
