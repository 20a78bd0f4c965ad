//! Document reader built on quick-xml

use crate::document::{Document, Element, Node};
use crate::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

/// Parse a document from a file, tolerating a UTF-8 byte order mark
pub fn parse_file(path: &Path) -> Result<Document> {
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

pub fn parse_str(xml: &str) -> Result<Document> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(start_element(&start)?),
            Event::Empty(start) => {
                let element = start_element(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Malformed("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text.unescape()?;
                    if !text.is_empty() {
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&comment).into_owned();
                    parent.children.push(Node::Comment(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Malformed(format!("unclosed element <{}>", open.name)));
    }

    root.map(Document::new)
        .ok_or_else(|| Error::Malformed("no root element".to_string()))
}

fn start_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::Malformed(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let doc = parse_str(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <!-- generated -->
            <macros>
              <macro name="ship_arg_s_fighter_01_a_macro" class="ship_s">
                <properties><hull max="3200"/></properties>
              </macro>
            </macros>"#,
        )
        .unwrap();

        assert_eq!(doc.root.name, "macros");
        let macro_elem = doc.root.child("macro").unwrap();
        assert_eq!(macro_elem.attr("class"), Some("ship_s"));
        assert_eq!(
            macro_elem.find("properties/hull").and_then(|h| h.attr("max")),
            Some("3200")
        );
    }

    #[test]
    fn test_parse_text_and_entities() {
        let doc = parse_str(r#"<page id="1"><t id="2">Fish &amp; Chips</t></page>"#).unwrap();
        assert_eq!(doc.root.child("t").unwrap().text(), "Fish & Chips");
    }

    #[test]
    fn test_parse_strips_bom() {
        let doc = parse_str("\u{feff}<diff/>").unwrap();
        assert!(doc.is_diff());
    }

    #[test]
    fn test_parse_rejects_unclosed() {
        assert!(parse_str("<a><b></b>").is_err());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(parse_str(""), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_parse_file_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            parse_file(&dir.path().join("nope.xml")),
            Err(Error::Io(_))
        ));
    }
}
