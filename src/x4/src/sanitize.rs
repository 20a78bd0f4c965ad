//! Cleanup of resolved display text
//!
//! Game strings carry escaped brackets, spoken-pronunciation hints for the
//! voice system, and `(Label)Label` duplicates where a comment prefix repeats
//! the visible name. None of that belongs in a catalog.

use crate::text::REFERENCE;
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_COLLAPSE_PASSES: usize = 3;

const ASIDE_KEYWORDS: &[&str] = &[
    "pronounce",
    "pronounced",
    "pronunciation",
    "hashtag is not spoken",
    "see pronunciation",
    "same as",
    "the letters",
    "speak as letter names",
    "speak normally as numbers",
    "spoken as",
    "stands for",
];

static ASIDE: Lazy<Regex> = Lazy::new(|| {
    let keywords: Vec<String> = ASIDE_KEYWORDS.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"(?i)\([^)]*(?:{})[^)]*\)", keywords.join("|")))
        .expect("valid aside pattern")
});

static LEADING_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([^)]+\)([A-Z][^,]*)").expect("valid alias pattern"));

pub fn sanitize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut text = unescape(text);
    text = strip_references(&text);
    text = ASIDE.replace_all(&text, "").into_owned();

    for _ in 0..MAX_COLLAPSE_PASSES {
        if let Some(collapsed) = collapse_duplicate(&text) {
            text = collapsed;
            continue;
        }
        let stripped = LEADING_ALIAS.replace(&text, "$1");
        if stripped == text {
            break;
        }
        text = stripped.into_owned();
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '(' | ')' | '{' | '}' | '[' | ']') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Drop unresolved references, unless they are all there is
fn strip_references(text: &str) -> String {
    if !REFERENCE.is_match(text) {
        return text.to_string();
    }
    let stripped = REFERENCE.replace_all(text, " ");
    if stripped.trim().is_empty() {
        text.to_string()
    } else {
        stripped.into_owned()
    }
}

/// Byte index of the `)` closing the `(` at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Length of the prefix of `rest` equal to `inner` when whitespace is ignored
fn equivalent_prefix(inner: &str, rest: &str) -> Option<usize> {
    let mut wanted = inner.chars().filter(|c| !c.is_whitespace()).peekable();
    wanted.peek()?;

    let mut end = 0;
    for (index, c) in rest.char_indices() {
        let Some(&expected) = wanted.peek() else {
            break;
        };
        if c.is_whitespace() {
            continue;
        }
        if c != expected {
            return None;
        }
        wanted.next();
        end = index + c.len_utf8();
    }
    if wanted.peek().is_some() {
        return None;
    }
    let at_boundary = rest[end..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric());
    at_boundary.then_some(end)
}

/// Replace the first `(Label)Label` with the better-spaced label
fn collapse_duplicate(text: &str) -> Option<String> {
    for (open, _) in text.match_indices('(') {
        let Some(close) = matching_paren(text, open) else {
            continue;
        };
        let inner = &text[open + 1..close];
        let rest = &text[close + 1..];
        let Some(len) = equivalent_prefix(inner, rest) else {
            continue;
        };
        let outer = &rest[..len];
        let keep = if inner.contains(' ') { inner } else { outer };
        return Some(format!("{}{}{}", &text[..open], keep, &rest[len..]));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescapes_brackets() {
        assert_eq!(sanitize(r"\(Gas\)"), "(Gas)");
        assert_eq!(sanitize(r"Ship \{Name\} \[1\]"), "Ship {Name} [1]");
        assert_eq!(sanitize(r"back\slash"), r"back\slash");
    }

    #[test]
    fn test_strips_residual_references() {
        assert_eq!(sanitize("Argon {9999,1} Fighter"), "Argon Fighter");
        assert_eq!(sanitize("{9999,1}"), "{9999,1}");
        assert_eq!(sanitize("{9999,1} {9999,2}"), "{9999,1} {9999,2}");
    }

    #[test]
    fn test_strips_pronunciation_asides() {
        assert_eq!(
            sanitize(r#"PE(pronounce the letters "P" and "E" separately)"#),
            "PE"
        );
        assert_eq!(sanitize("#dace(Pronounced Day-S)"), "#dace");
        assert_eq!(sanitize("Ship A(speak as letter names)"), "Ship A");
        assert_eq!(sanitize("Shield (Mk1)"), "Shield (Mk1)");
    }

    #[test]
    fn test_collapses_duplicated_labels() {
        assert_eq!(
            sanitize("(Chthonios E (Gas))Chthonios E (Gas)"),
            "Chthonios E (Gas)"
        );
        assert_eq!(sanitize("(ARG 1)ARG1"), "ARG 1");
        assert_eq!(sanitize("(Drone 1)Drone1"), "Drone 1");
        assert_eq!(
            sanitize("(Xenon Shield Generator)XenonShield Generator"),
            "Xenon Shield Generator"
        );
    }

    #[test]
    fn test_partial_word_is_not_a_duplicate() {
        assert_eq!(sanitize("(Gas)Gasoline"), "Gasoline");
        assert_eq!(sanitize("x (Gas)Gasoline"), "x (Gas)Gasoline");
    }

    #[test]
    fn test_drops_leading_alias() {
        assert_eq!(
            sanitize("(Speed Upgrade Mk1)Spacesuit Thrusters Mk1"),
            "Spacesuit Thrusters Mk1"
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(sanitize("  Argon \n  Fighter\t"), "Argon Fighter");
        assert_eq!(sanitize(""), "");
    }
}
