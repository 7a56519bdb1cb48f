//! Schema-less XML tree.
//!
//! Package parts are decoded into a tree of [`XmlNode`] without knowing
//! anything about their schema. Each node borrows its raw inner markup from
//! the part buffer so extractors can grep it or interpret it later.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::harvest::traits::AnalysisError;

/// Deepest element nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 1_000;

/// One element of a decoded XML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode<'a> {
    /// Qualified tag name as written (`"cp:coreProperties"`)
    pub name: String,

    /// Attributes in document order, qualified names as written
    pub attrs: Vec<(String, String)>,

    /// Raw bytes between the start and end tag, nested markup included
    pub content: &'a [u8],

    /// Child elements in document order
    pub children: Vec<XmlNode<'a>>,
}

/// Strips a namespace prefix: `"w:t"` → `"t"`.
pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl<'a> XmlNode<'a> {
    /// Tag name without namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Value of the attribute whose local name is `name`.
    ///
    /// When a prefixed and an unprefixed attribute share a local name, the
    /// last one in document order wins.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .rev()
            .find(|(key, _)| local_part(key) == name)
            .map(|(_, value)| value.as_str())
    }

    /// Raw inner markup as text.
    pub fn content_str(&self) -> String {
        String::from_utf8_lossy(self.content).into_owned()
    }

    /// Inner content with entity references resolved.
    ///
    /// Falls back to the raw content when it contains an unknown entity.
    pub fn text(&self) -> String {
        let raw = self.content_str();
        match quick_xml::escape::unescape(&raw) {
            Ok(text) => text.into_owned(),
            Err(_) => raw,
        }
    }

    /// First direct child with local name `name`.
    pub fn child(&self, name: &str) -> Option<&XmlNode<'a>> {
        self.children.iter().find(|c| c.local_name() == name)
    }

    /// Text of the first direct child named `name`, or an empty string.
    pub fn child_text(&self, name: &str) -> String {
        self.child(name).map(XmlNode::text).unwrap_or_default()
    }

    /// Visits this node and every descendant in pre-order.
    pub fn walk<'n, F>(&'n self, visit: &mut F)
    where
        F: FnMut(&'n XmlNode<'a>),
    {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            visit(node);
            pending.extend(node.children.iter().rev());
        }
    }
}

/// Decodes `bytes` into its root element.
///
/// Prolog items (declaration, comments, doctype) are skipped and anything
/// after the root element is ignored.
///
/// # Errors
///
/// Returns [`AnalysisError::MalformedXml`] for mismatched or unclosed tags,
/// unreadable attributes, nesting deeper than [`MAX_DEPTH`], or a buffer
/// with no root element.
pub fn parse(bytes: &[u8]) -> Result<XmlNode<'_>, AnalysisError> {
    let mut reader = Reader::from_reader(bytes);
    // (node, offset where its inner content starts)
    let mut stack: Vec<(XmlNode<'_>, usize)> = Vec::new();

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| AnalysisError::MalformedXml(e.to_string()))?;

        match event {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(AnalysisError::MalformedXml(format!(
                        "elements nested deeper than {MAX_DEPTH}"
                    )));
                }
                let node = start_node(&start)?;
                stack.push((node, reader.buffer_position() as usize));
            }
            Event::Empty(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(AnalysisError::MalformedXml(format!(
                        "elements nested deeper than {MAX_DEPTH}"
                    )));
                }
                let node = start_node(&start)?;
                match stack.last_mut() {
                    Some((parent, _)) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::End(_) => {
                let (mut node, content_start) = stack.pop().ok_or_else(|| {
                    AnalysisError::MalformedXml("end tag without start tag".to_string())
                })?;
                node.content = bytes.get(content_start..before).unwrap_or_default();
                match stack.last_mut() {
                    Some((parent, _)) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Eof => {
                let reason = match stack.last() {
                    Some((open, _)) => format!("unclosed element <{}>", open.name),
                    None => "no root element".to_string(),
                };
                return Err(AnalysisError::MalformedXml(reason));
            }
            _ => {}
        }
    }
}

fn start_node<'a>(start: &BytesStart<'_>) -> Result<XmlNode<'a>, AnalysisError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|e| AnalysisError::MalformedXml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(value) => value.into_owned(),
            Err(_) => raw,
        };
        attrs.push((key, value));
    }
    Ok(XmlNode {
        name,
        attrs,
        ..Default::default()
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_inner_markup() {
        let xml = br#"<?xml version="1.0"?><a x="1"><b>hi</b><c/></a>"#;
        let root = parse(xml).unwrap();

        assert_eq!(root.name, "a");
        assert_eq!(root.attr("x"), Some("1"));
        assert_eq!(root.content_str(), "<b>hi</b><c/>");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].content_str(), "hi");
        assert!(root.children[1].content.is_empty());
    }

    #[test]
    fn test_namespaces_are_ignored_for_lookup() {
        let xml = br#"<cp:coreProperties xmlns:cp="urn:x" xmlns:dc="urn:y"><dc:creator r:id="7">J. Smith</dc:creator></cp:coreProperties>"#;
        let root = parse(xml).unwrap();

        assert_eq!(root.local_name(), "coreProperties");
        let creator = root.child("creator").unwrap();
        assert_eq!(creator.name, "dc:creator");
        assert_eq!(creator.attr("id"), Some("7"));
        assert_eq!(root.child_text("creator"), "J. Smith");
    }

    #[test]
    fn test_text_unescapes_entities() {
        let root = parse(b"<a>Smith &amp; Sons</a>").unwrap();
        assert_eq!(root.content_str(), "Smith &amp; Sons");
        assert_eq!(root.text(), "Smith & Sons");
    }

    #[test]
    fn test_attribute_values_unescaped() {
        let root = parse(br#"<a Target="http://x/?a=1&amp;b=2"/>"#).unwrap();
        assert_eq!(root.attr("Target"), Some("http://x/?a=1&b=2"));
    }

    #[test]
    fn test_walk_is_preorder() {
        let root = parse(b"<a><b><c/></b><d/></a>").unwrap();
        let mut seen = Vec::new();
        root.walk(&mut |n| seen.push(n.name.clone()));
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth))
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let doc = nested(MAX_DEPTH);
        let deepest = parse(doc.as_bytes()).unwrap();
        let mut count = 0;
        deepest.walk(&mut |_| count += 1);
        assert_eq!(count, MAX_DEPTH);

        assert!(matches!(
            parse(nested(MAX_DEPTH + 1).as_bytes()),
            Err(AnalysisError::MalformedXml(_))
        ));

        let empty_leaf = format!("{}<b/>{}", "<a>".repeat(MAX_DEPTH), "</a>".repeat(MAX_DEPTH));
        assert!(parse(empty_leaf.as_bytes()).is_err());
    }

    #[test]
    fn test_content_borrows_part_buffer() {
        let xml = b"<a><b>hi</b></a>".to_vec();
        let root = parse(&xml).unwrap();
        let inner = root.children[0].content;
        assert_eq!(inner, b"hi");
        assert!(std::ptr::eq(inner.as_ptr(), xml[6..].as_ptr()));
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert!(matches!(
            parse(b"<a><b></a>"),
            Err(AnalysisError::MalformedXml(_))
        ));
        assert!(matches!(
            parse(b"<a><b></b>"),
            Err(AnalysisError::MalformedXml(_))
        ));
        assert!(matches!(
            parse(b"just text"),
            Err(AnalysisError::MalformedXml(_))
        ));
    }
}
