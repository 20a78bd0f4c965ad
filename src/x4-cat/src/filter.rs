//! Include/exclude path patterns
//!
//! Patterns are regular expressions over forward-slash relative paths. The
//! catalog tool receives them verbatim; [`PathFilter`] evaluates them
//! locally. The `regex` crate has no look-around, so a trailing negative
//! look-ahead on a plain literal (`^assets/fx/(?!weaponfx)`) is handled here.

use crate::{Error, Result};
use regex::Regex;

/// Every document the pipeline reads
pub const DOCUMENT_INCLUDE: &[&str] = &[
    r"^libraries/.*\.xml$",
    r"^index/.*\.xml$",
    r"^assets/.*\.xml$",
    r"^t/.*\.xml$",
];

/// Bulky asset trees with nothing the pipeline reads (weapon effects are kept)
pub const DOCUMENT_EXCLUDE: &[&str] = &[
    r"^assets/fx/(?!weaponfx)",
    r"^assets/environments/",
    r"^assets/characters/",
    r"^assets/audio/",
];

/// Anchored pattern matching exactly one relative path
pub fn single_file_pattern(relative: &str) -> String {
    format!("^{}$", regex::escape(&relative.replace('\\', "/")))
}

#[derive(Debug, Clone)]
pub struct PathPattern {
    head: Regex,
    not_followed_by: Option<String>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let (head, not_followed_by) = match split_lookahead(pattern) {
            Some((head, literal)) => (head, Some(literal.to_string())),
            None => (pattern, None),
        };
        let head = Regex::new(head).map_err(|source| Error::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            head,
            not_followed_by,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        match &self.not_followed_by {
            None => self.head.is_match(path),
            Some(literal) => self
                .head
                .find_iter(path)
                .any(|m| !path[m.end()..].starts_with(literal.as_str())),
        }
    }
}

/// `head(?!literal)` where the literal has no regex syntax
fn split_lookahead(pattern: &str) -> Option<(&str, &str)> {
    let body = pattern.strip_suffix(')')?;
    let start = body.rfind("(?!")?;
    let literal = &body[start + 3..];
    let plain = !literal.is_empty()
        && literal
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '/'));
    plain.then(|| (&pattern[..start], literal))
}

/// A path is selected when it matches any include (or there are none) and
/// no exclude.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<PathPattern>,
    exclude: Vec<PathPattern>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        let compile = |patterns: &[S]| {
            patterns
                .iter()
                .map(|p| PathPattern::new(p.as_ref()))
                .collect::<Result<Vec<_>>>()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        (self.include.is_empty() || self.include.iter().any(|p| p.is_match(path)))
            && !self.exclude.iter().any(|p| p.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documents() -> PathFilter {
        PathFilter::new(DOCUMENT_INCLUDE, DOCUMENT_EXCLUDE).unwrap()
    }

    #[test]
    fn test_document_filter() {
        let filter = documents();
        assert!(filter.matches("libraries/wares.xml"));
        assert!(filter.matches("index/macros.xml"));
        assert!(filter.matches("t/0001-l044.xml"));
        assert!(filter.matches("assets/units/size_s/macros/ship_arg_s_fighter_01_a_macro.xml"));
        assert!(filter.matches("assets/fx/weaponfx/macros/bullet_gen_s_laser_01_mk1_macro.xml"));
        assert!(!filter.matches("assets/fx/explosions/macros/expl_macro.xml"));
        assert!(!filter.matches("assets/audio/sounds.xml"));
        assert!(!filter.matches("assets/units/size_s/ship.xmf"));
        assert!(!filter.matches("md/setup.xml"));
    }

    #[test]
    fn test_lookahead_with_unsupported_syntax_is_an_error() {
        assert!(PathPattern::new(r"^a(?!b.*)").is_err());
        assert!(PathPattern::new(r"^a(?=b)").is_err());
    }

    #[test]
    fn test_single_file_pattern_is_exact() {
        let pattern = single_file_pattern(r"libraries\wares.xml");
        assert_eq!(pattern, r"^libraries/wares\.xml$");
        let filter = PathFilter::new(&[pattern.as_str()], &[]).unwrap();
        assert!(filter.matches("libraries/wares.xml"));
        assert!(!filter.matches("libraries/waresxxml"));
        assert!(!filter.matches("libraries/wares.xml.bak"));
    }

    #[test]
    fn test_empty_include_selects_everything_not_excluded() {
        let filter = PathFilter::new::<&str>(&[], &["^assets/"]).unwrap();
        assert!(filter.matches("libraries/wares.xml"));
        assert!(!filter.matches("assets/x.xml"));
    }
}
