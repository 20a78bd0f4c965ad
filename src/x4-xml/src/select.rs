//! Location-path selectors
//!
//! The subset of XPath that game documents and their patches actually use:
//!
//! - absolute `/a/b`, anywhere `//a`, relative `a/b`, `./a`, `.//a`, `.`
//! - wildcard `*`
//! - predicates `[@k='v']`, `[@k="v"]`, `[@k]`, `[not(@k)]`, `[n]`, `[last()]`,
//!   combined with `and`
//! - a trailing `/@attr` naming an attribute of the matched elements
//!
//! Matches resolve to index paths (child positions from the evaluation root)
//! in document order, which lets the diff engine mutate through parents.

use crate::document::{Element, Node};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector `{selector}`: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name(String),
}

impl NameTest {
    fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Any => true,
            Self::Name(name) => element.name == *name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    AttrEquals(String, String),
    HasAttr(String),
    LacksAttr(String),
    Position(usize),
    Last,
}

impl Predicate {
    fn holds(&self, element: &Element, position: usize, len: usize) -> bool {
        match self {
            Self::AttrEquals(name, value) => element.attr(name) == Some(value.as_str()),
            Self::HasAttr(name) => element.attr(name).is_some(),
            Self::LacksAttr(name) => element.attr(name).is_none(),
            Self::Position(n) => position == *n,
            Self::Last => position == len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    /// One entry per bracket; each bracket is a conjunction
    filters: Vec<Vec<Predicate>>,
}

/// A parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    absolute: bool,
    steps: Vec<Step>,
    attribute: Option<String>,
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse()
    }
}

impl Selector {
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Attribute named by a trailing `/@attr` step
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Index paths of every matched element, relative to `root`, in document order.
    ///
    /// Absolute selectors treat `root` as the document element.
    pub fn paths(&self, root: &Element) -> Vec<Vec<usize>> {
        let mut steps = self.steps.iter();
        let mut current = if self.absolute {
            match steps.next() {
                Some(first) => from_document(root, first),
                None => vec![Vec::new()],
            }
        } else {
            vec![Vec::new()]
        };

        for step in steps {
            if current.is_empty() {
                break;
            }
            current = apply_step(root, &current, step);
        }
        current
    }

    pub fn select<'a>(&self, root: &'a Element) -> Vec<&'a Element> {
        self.paths(root)
            .iter()
            .filter_map(|path| root.at_path(path))
            .collect()
    }

    pub fn first<'a>(&self, root: &'a Element) -> Option<&'a Element> {
        self.paths(root).first().and_then(|path| root.at_path(path))
    }
}

/// Evaluate the first step of an absolute path, whose context is the
/// document node with `root` as its only child.
fn from_document(root: &Element, first: &Step) -> Vec<Vec<usize>> {
    let root_matches = first.test.matches(root)
        && first
            .filters
            .iter()
            .all(|conj| conj.iter().all(|p| p.holds(root, 1, 1)));

    let mut out = Vec::new();
    match first.axis {
        Axis::Current => out.push(Vec::new()),
        Axis::Child => {
            if root_matches {
                out.push(Vec::new());
            }
        }
        Axis::Descendant => {
            if root_matches {
                out.push(Vec::new());
            }
            out.extend(apply_step(root, &[Vec::new()], first));
            out.sort();
            out.dedup();
        }
    }
    out
}

fn apply_step(root: &Element, contexts: &[Vec<usize>], step: &Step) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    for context in contexts {
        let Some(element) = root.at_path(context) else {
            continue;
        };
        match step.axis {
            Axis::Current => {
                let keep = step.test.matches(element)
                    && step
                        .filters
                        .iter()
                        .all(|conj| conj.iter().all(|p| p.holds(element, 1, 1)));
                if keep {
                    out.push(context.clone());
                }
            }
            Axis::Child => collect_children(element, context, step, &mut out),
            Axis::Descendant => {
                let mut path = context.clone();
                collect_descendants(element, &mut path, step, &mut out);
            }
        }
    }
    out.sort();
    out.dedup();
    out
}

fn collect_descendants(
    element: &Element,
    path: &mut Vec<usize>,
    step: &Step,
    out: &mut Vec<Vec<usize>>,
) {
    collect_children(element, path, step, out);
    for (index, child) in element.children.iter().enumerate() {
        if let Node::Element(child) = child {
            path.push(index);
            collect_descendants(child, path, step, out);
            path.pop();
        }
    }
}

/// Matching children of one parent. Positions in predicates count within
/// this parent's candidates, as in XPath.
fn collect_children(
    parent: &Element,
    parent_path: &[usize],
    step: &Step,
    out: &mut Vec<Vec<usize>>,
) {
    let mut group: Vec<(usize, &Element)> = parent
        .children
        .iter()
        .enumerate()
        .filter_map(|(index, node)| match node {
            Node::Element(element) if step.test.matches(element) => Some((index, element)),
            _ => None,
        })
        .collect();

    for conjunction in &step.filters {
        let len = group.len();
        group = group
            .into_iter()
            .enumerate()
            .filter(|(position, (_, element))| {
                conjunction
                    .iter()
                    .all(|p| p.holds(element, position + 1, len))
            })
            .map(|(_, candidate)| candidate)
            .collect();
    }

    out.extend(group.into_iter().map(|(index, _)| {
        let mut path = parent_path.to_vec();
        path.push(index);
        path
    }));
}

struct Parser<'a> {
    source: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let trimmed = source.trim();
        Self {
            source: trimmed,
            rest: trimmed,
        }
    }

    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError {
            selector: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        if self.rest.is_empty() {
            return Err(self.error("empty selector"));
        }

        let mut axis = if self.eat("//") {
            Axis::Descendant
        } else {
            self.eat("/");
            Axis::Child
        };
        let absolute = self.source.starts_with('/');

        let mut steps = Vec::new();
        let mut attribute = None;

        loop {
            if self.eat("@") {
                let name = self.name();
                if name.is_empty() || !self.rest.is_empty() {
                    return Err(self.error("attribute step must be last"));
                }
                if axis == Axis::Descendant {
                    return Err(self.error("`//@attr` is not supported"));
                }
                attribute = Some(name.to_string());
                break;
            }

            steps.push(self.step(axis)?);

            if self.rest.is_empty() {
                break;
            }
            axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else {
                return Err(self.error(format!("unexpected `{}`", self.rest)));
            };
            if self.rest.is_empty() {
                return Err(self.error("trailing separator"));
            }
        }

        Ok(Selector {
            absolute,
            steps,
            attribute,
        })
    }

    fn step(&mut self, axis: Axis) -> Result<Step, SelectorError> {
        if self.rest.starts_with("..") {
            return Err(self.error("parent steps are not supported"));
        }

        let (axis, test) = if self.eat(".") {
            (Axis::Current, NameTest::Any)
        } else if self.eat("*") {
            (axis, NameTest::Any)
        } else {
            let name = self.name();
            if name.is_empty() {
                return Err(self.error(format!("expected a node name at `{}`", self.rest)));
            }
            if self.rest.starts_with('(') {
                return Err(self.error(format!("function `{name}()` is not supported")));
            }
            (axis, NameTest::Name(name.to_string()))
        };

        let mut filters = Vec::new();
        while self.eat("[") {
            let end = closing_bracket(self.rest).ok_or_else(|| self.error("unclosed `[`"))?;
            let body = &self.rest[..end];
            self.rest = &self.rest[end + 1..];
            filters.push(self.predicates(body)?);
        }

        Ok(Step {
            axis,
            test,
            filters,
        })
    }

    fn name(&mut self) -> &'a str {
        let end = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | ':')))
            .unwrap_or(self.rest.len());
        let (name, rest) = self.rest.split_at(end);
        self.rest = rest;
        name
    }

    fn predicates(&self, body: &str) -> Result<Vec<Predicate>, SelectorError> {
        split_and(body)
            .into_iter()
            .map(|term| self.predicate(term.trim()))
            .collect()
    }

    fn predicate(&self, term: &str) -> Result<Predicate, SelectorError> {
        if term == "last()" {
            return Ok(Predicate::Last);
        }
        if let Ok(n) = term.parse::<usize>() {
            if n == 0 {
                return Err(self.error("positions start at 1"));
            }
            return Ok(Predicate::Position(n));
        }
        if let Some(inner) = term
            .strip_prefix("not(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let name = inner.trim().strip_prefix('@').filter(|n| is_name(n));
            return name
                .map(|n| Predicate::LacksAttr(n.to_string()))
                .ok_or_else(|| self.error(format!("unsupported predicate `{term}`")));
        }
        if let Some(attr) = term.strip_prefix('@') {
            return match attr.split_once('=') {
                None if is_name(attr) => Ok(Predicate::HasAttr(attr.to_string())),
                None => Err(self.error(format!("unsupported predicate `{term}`"))),
                Some((name, value)) => {
                    let name = name.trim();
                    let value = unquote(value.trim())
                        .ok_or_else(|| self.error(format!("unquoted value in `{term}`")))?;
                    if !is_name(name) {
                        return Err(self.error(format!("bad attribute name in `{term}`")));
                    }
                    Ok(Predicate::AttrEquals(name.to_string(), value.to_string()))
                }
            };
        }
        Err(self.error(format!("unsupported predicate `{term}`")))
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':'))
}

fn unquote(s: &str) -> Option<&str> {
    let quote = s.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    s[1..].strip_suffix(quote)
}

/// Offset of the `]` closing a predicate, skipping quoted text
fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(index),
            (None, _) => {}
        }
    }
    None
}

/// Split a predicate body on ` and ` outside quotes
fn split_and(body: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut quote = None;
    let mut start = 0;
    let bytes = body.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        let c = bytes[index];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == b'\'' || c == b'"' => quote = Some(c),
            None if bytes[index..].starts_with(b" and ") => {
                terms.push(&body[start..index]);
                index += " and ".len();
                start = index;
                continue;
            }
            None => {}
        }
        index += 1;
    }
    terms.push(&body[start..]);
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_str;

    fn wares() -> Element {
        parse_str(
            r#"<wares>
                 <ware id="a" tags="ship"><price min="1"/></ware>
                 <ware id="b"><price min="2"/></ware>
                 <group><ware id="c"/></group>
               </wares>"#,
        )
        .unwrap()
        .root
    }

    fn ids(root: &Element, selector: &str) -> Vec<String> {
        selector
            .parse::<Selector>()
            .unwrap()
            .select(root)
            .iter()
            .map(|e| e.attr("id").unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn test_absolute_child_path() {
        let root = wares();
        assert_eq!(ids(&root, "/wares/ware"), vec!["a", "b"]);
        assert!(ids(&root, "/other/ware").is_empty());
    }

    #[test]
    fn test_descendant_anywhere_in_document_order() {
        let root = wares();
        assert_eq!(ids(&root, "//ware"), vec!["a", "b", "c"]);
        assert_eq!(ids(&root, ".//ware"), vec!["a", "b", "c"]);
        assert_eq!(ids(&root, "//wares"), vec!["-"]);
    }

    #[test]
    fn test_attribute_predicates() {
        let root = wares();
        assert_eq!(ids(&root, "//ware[@id='b']"), vec!["b"]);
        assert_eq!(ids(&root, r#"//ware[@id="c"]"#), vec!["c"]);
        assert_eq!(ids(&root, "//ware[@tags]"), vec!["a"]);
        assert_eq!(ids(&root, "//ware[not(@tags)]"), vec!["b", "c"]);
        assert_eq!(ids(&root, "//ware[@id='a' and @tags='ship']"), vec!["a"]);
        assert!(ids(&root, "//ware[@id='a' and @tags='x']").is_empty());
    }

    #[test]
    fn test_positional_predicates_are_per_parent() {
        let root = wares();
        assert_eq!(ids(&root, "//ware[1]"), vec!["a", "c"]);
        assert_eq!(ids(&root, "/wares/ware[last()]"), vec!["b"]);
        assert_eq!(ids(&root, "/wares/ware[2]"), vec!["b"]);
    }

    #[test]
    fn test_relative_and_wildcard() {
        let root = wares();
        let prices = "ware/price".parse::<Selector>().unwrap().select(&root);
        assert_eq!(prices.len(), 2);
        assert_eq!(ids(&root, "*/ware"), vec!["c"]);
        assert_eq!(ids(&root, "."), vec!["-"]);
    }

    #[test]
    fn test_trailing_attribute() {
        let selector: Selector = "/wares/ware[@id='a']/@tags".parse().unwrap();
        assert_eq!(selector.attribute(), Some("tags"));
        assert_eq!(selector.paths(&wares()), vec![vec![0]]);
    }

    #[test]
    fn test_paths_index_children() {
        let root = wares();
        let selector: Selector = "//ware[@id='c']".parse().unwrap();
        let paths = selector.paths(&root);
        assert_eq!(paths.len(), 1);
        assert_eq!(root.at_path(&paths[0]).and_then(|e| e.attr("id")), Some("c"));
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        for bad in [
            "",
            "/a/",
            "../a",
            "a/text()",
            "a[@x=1]",
            "a[contains(@x,'y')]",
            "a[",
            "a/@x/b",
            "a[0]",
        ] {
            assert!(bad.parse::<Selector>().is_err(), "accepted `{bad}`");
        }
    }
}
