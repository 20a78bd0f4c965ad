//! Diff-patch merging
//!
//! A patch document has a `<diff>` root whose children are operations, each
//! with a `sel` selector into the target:
//!
//! - `<add sel="...">nodes</add>` appends copies of the nodes under every
//!   match. `pos="before"|"after"|"prepend"` inserts as siblings or first
//!   children instead; `type="@name"` sets attribute `name` to the text.
//! - `<remove sel="..."/>` detaches every match, or deletes the attribute
//!   when the selector ends in `/@name`.
//! - `<replace sel="...">node</replace>` swaps each match for a copy of the
//!   node in the same sibling position, or sets the attribute named by a
//!   trailing `/@name` to the text.
//!
//! Merging never fails. Anything that cannot be applied is skipped and
//! reported as a [`MergeNote`] for the caller to log.

use crate::document::{Document, Element, Node};
use crate::select::{Selector, SelectorError};
use std::fmt;

/// Result of merging patches onto a base document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub document: Document,
    pub notes: Vec<MergeNote>,
}

/// Something in patch number `diff` that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeNote {
    pub diff: usize,
    pub kind: NoteKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteKind {
    NotADiff { root: String },
    UnknownOperation { tag: String },
    MissingSelector { operation: String },
    InvalidSelector(SelectorError),
    TargetNotFound { operation: String, selector: String },
    NoParent { operation: String, selector: String },
    EmptyReplacement { selector: String },
}

impl fmt::Display for MergeNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diff #{}: ", self.diff)?;
        match &self.kind {
            NoteKind::NotADiff { root } => {
                write!(f, "root is <{root}>, not <diff>; document skipped")
            }
            NoteKind::UnknownOperation { tag } => write!(f, "unknown operation <{tag}> ignored"),
            NoteKind::MissingSelector { operation } => {
                write!(f, "<{operation}> has no sel attribute")
            }
            NoteKind::InvalidSelector(error) => write!(f, "{error}"),
            NoteKind::TargetNotFound {
                operation,
                selector,
            } => write!(f, "<{operation}> matched nothing for `{selector}`"),
            NoteKind::NoParent {
                operation,
                selector,
            } => write!(f, "<{operation}> cannot act on the document root (`{selector}`)"),
            NoteKind::EmptyReplacement { selector } => {
                write!(f, "<replace> for `{selector}` has no replacement element")
            }
        }
    }
}

/// Apply `diffs` in order to a copy of `base`.
///
/// Later patches see the result of earlier ones. Neither `base` nor the
/// patches are modified.
pub fn merge(base: &Document, diffs: &[Document]) -> Merged {
    let mut document = base.clone();
    let mut notes = Vec::new();
    for (index, diff) in diffs.iter().enumerate() {
        notes.extend(
            apply(&mut document, diff)
                .into_iter()
                .map(|kind| MergeNote { diff: index, kind }),
        );
    }
    Merged { document, notes }
}

/// Apply one patch in place
pub fn apply(target: &mut Document, diff: &Document) -> Vec<NoteKind> {
    let mut notes = Vec::new();
    if !diff.is_diff() {
        notes.push(NoteKind::NotADiff {
            root: diff.root.name.clone(),
        });
        return notes;
    }

    for operation in diff.root.elements() {
        let name = operation.name.as_str();
        if !matches!(name, "add" | "remove" | "replace") {
            notes.push(NoteKind::UnknownOperation {
                tag: operation.name.clone(),
            });
            continue;
        }

        let Some(sel) = operation.attr("sel") else {
            notes.push(NoteKind::MissingSelector {
                operation: operation.name.clone(),
            });
            continue;
        };
        let selector: Selector = match sel.parse() {
            Ok(selector) => selector,
            Err(error) => {
                notes.push(NoteKind::InvalidSelector(error));
                continue;
            }
        };

        let mut paths = selector.paths(&target.root);
        if paths.is_empty() {
            notes.push(NoteKind::TargetNotFound {
                operation: operation.name.clone(),
                selector: sel.to_string(),
            });
            continue;
        }
        // Last match first so earlier paths stay valid while siblings shift
        paths.reverse();

        let skipped = match name {
            "add" => add(&mut target.root, operation, &selector, &paths),
            "remove" => remove(&mut target.root, &selector, &paths),
            _ => replace(&mut target.root, operation, &selector, &paths),
        };
        if let Some(kind) = skipped {
            notes.push(match kind {
                Skip::NoParent => NoteKind::NoParent {
                    operation: operation.name.clone(),
                    selector: sel.to_string(),
                },
                Skip::EmptyReplacement => NoteKind::EmptyReplacement {
                    selector: sel.to_string(),
                },
            });
        }
    }
    notes
}

enum Skip {
    NoParent,
    EmptyReplacement,
}

/// Nodes carried by an operation, excluding comments
fn payload(operation: &Element) -> Vec<Node> {
    operation
        .children
        .iter()
        .filter(|node| !matches!(node, Node::Comment(_)))
        .cloned()
        .collect()
}

fn add(
    root: &mut Element,
    operation: &Element,
    selector: &Selector,
    paths: &[Vec<usize>],
) -> Option<Skip> {
    if let Some(attribute) = selector.attribute() {
        return set_attribute(root, attribute, &operation.text(), paths);
    }
    if let Some(attribute) = operation.attr("type").and_then(|t| t.strip_prefix('@')) {
        return set_attribute(root, attribute, &operation.text(), paths);
    }

    let nodes = payload(operation);
    let mut skipped = None;
    for path in paths {
        match operation.attr("pos") {
            Some(pos @ ("before" | "after")) => {
                let Some((&index, parent_path)) = path.split_last() else {
                    skipped = Some(Skip::NoParent);
                    continue;
                };
                let Some(parent) = root.at_path_mut(parent_path) else {
                    continue;
                };
                let at = if pos == "before" { index } else { index + 1 };
                parent.children.splice(at..at, nodes.iter().cloned());
            }
            Some("prepend") => {
                if let Some(element) = root.at_path_mut(path) {
                    element.children.splice(0..0, nodes.iter().cloned());
                }
            }
            _ => {
                if let Some(element) = root.at_path_mut(path) {
                    element.children.extend(nodes.iter().cloned());
                }
            }
        }
    }
    skipped
}

fn remove(root: &mut Element, selector: &Selector, paths: &[Vec<usize>]) -> Option<Skip> {
    if let Some(attribute) = selector.attribute() {
        for path in paths {
            if let Some(element) = root.at_path_mut(path) {
                element.remove_attr(attribute);
            }
        }
        return None;
    }

    let mut skipped = None;
    for path in paths {
        let Some((&index, parent_path)) = path.split_last() else {
            skipped = Some(Skip::NoParent);
            continue;
        };
        if let Some(parent) = root.at_path_mut(parent_path) {
            parent.children.remove(index);
        }
    }
    skipped
}

fn replace(
    root: &mut Element,
    operation: &Element,
    selector: &Selector,
    paths: &[Vec<usize>],
) -> Option<Skip> {
    if let Some(attribute) = selector.attribute() {
        return set_attribute(root, attribute, &operation.text(), paths);
    }

    let Some(replacement) = operation.elements().next() else {
        return Some(Skip::EmptyReplacement);
    };

    let mut skipped = None;
    for path in paths {
        let Some((&index, parent_path)) = path.split_last() else {
            skipped = Some(Skip::NoParent);
            continue;
        };
        if let Some(parent) = root.at_path_mut(parent_path) {
            parent
                .children
                .insert(index, Node::Element(replacement.clone()));
            parent.children.remove(index + 1);
        }
    }
    skipped
}

fn set_attribute(
    root: &mut Element,
    name: &str,
    value: &str,
    paths: &[Vec<usize>],
) -> Option<Skip> {
    for path in paths {
        if let Some(element) = root.at_path_mut(path) {
            element.set_attr(name, value);
        }
    }
    None
}
