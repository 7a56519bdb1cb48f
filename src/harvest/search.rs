//! Traversal strategies over [`XmlNode`] trees.
//!
//! All walks except [`keyword_grep`] visit every node in pre-order and keep
//! descending whether or not the current node matched. Tag and attribute
//! names are compared on their local part only.

use crate::harvest::traits::ArtifactSet;
use crate::harvest::xml::XmlNode;

/// Inner content of every element named `tag`.
pub fn find_tag_content(root: &XmlNode<'_>, tag: &str) -> ArtifactSet {
    let mut found = ArtifactSet::new();
    root.walk(&mut |node| {
        if node.local_name() == tag {
            found.insert(node.content_str());
        }
    });
    found
}

/// Value of `attr` on every element named `tag`. Empty values are skipped.
pub fn find_attr_on_tag(root: &XmlNode<'_>, tag: &str, attr: &str) -> ArtifactSet {
    let mut found = ArtifactSet::new();
    root.walk(&mut |node| {
        if node.local_name() == tag {
            if let Some(value) = node.attr(attr) {
                found.insert(value);
            }
        }
    });
    found
}

/// Value of `attr` on any element in the tree.
pub fn find_attr_anywhere(root: &XmlNode<'_>, attr: &str) -> ArtifactSet {
    let mut found = ArtifactSet::new();
    root.walk(&mut |node| {
        if let Some(value) = node.attr(attr) {
            found.insert(value);
        }
    });
    found
}

/// `Target` of every element that also carries `TargetMode="External"`.
pub fn external_links(root: &XmlNode<'_>) -> ArtifactSet {
    let mut found = ArtifactSet::new();
    root.walk(&mut |node| {
        if node.attr("TargetMode") == Some("External") {
            if let Some(target) = node.attr("Target") {
                found.insert(target);
            }
        }
    });
    found
}

/// `"<name> - (<state>)"` for every `sheet` whose `state` is `hidden` or
/// `veryHidden`.
pub fn hidden_sheets(root: &XmlNode<'_>) -> ArtifactSet {
    let mut found = ArtifactSet::new();
    root.walk(&mut |node| {
        if node.local_name() != "sheet" {
            return;
        }
        let state = match node.attr("state") {
            Some(state @ ("hidden" | "veryHidden")) => state,
            _ => return,
        };
        if let Some(name) = node.attr("name") {
            found.insert(format!("{name} - ({state})"));
        }
    });
    found
}

/// Finds the first element mentioning `keyword` and renders it as
/// `<tag>content</tag>`.
///
/// Siblings are scanned in order. A node whose tag name contains the keyword
/// ends the search on the spot. A node whose content contains it is recorded,
/// then only its own children are searched for something more specific
/// before the search ends. Nodes that match neither way are not descended
/// into.
///
/// The search stops at the first content hit's subtree, so a deeper match
/// under a later sibling is never reported.
pub fn keyword_grep(root: &XmlNode<'_>, keyword: &str) -> Option<String> {
    let mut hit = None;
    grep_siblings(std::slice::from_ref(root), keyword, &mut hit);
    hit
}

fn grep_siblings(nodes: &[XmlNode<'_>], keyword: &str, hit: &mut Option<String>) {
    for node in nodes {
        let tag = node.local_name();
        if tag.contains(keyword) {
            *hit = Some(render(node));
            return;
        }
        let content = node.content_str();
        if content.contains(keyword) {
            *hit = Some(format!("<{tag}>{content}</{tag}>"));
            grep_siblings(&node.children, keyword, hit);
            return;
        }
    }
}

fn render(node: &XmlNode<'_>) -> String {
    let tag = node.local_name();
    format!("<{tag}>{}</{tag}>", node.content_str())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::xml::parse;

    fn tree(xml: &str) -> XmlNode<'_> {
        parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_find_tag_content_recurses_into_matches() {
        let root = tree("<r><author>Ann</author><x><author>Bob</author></x><author>Ann</author></r>");
        assert_eq!(find_tag_content(&root, "author").to_vec(), vec!["Ann", "Bob"]);

        let nested = tree("<r><a>outer<a>inner</a></a></r>");
        assert_eq!(
            find_tag_content(&nested, "a").to_vec(),
            vec!["outer<a>inner</a>", "inner"]
        );
    }

    #[test]
    fn test_find_attr_on_tag_skips_empty() {
        let root = tree(r#"<r><person author="Ann"/><person author=""/><other author="Zed"/></r>"#);
        assert_eq!(find_attr_on_tag(&root, "person", "author").to_vec(), vec!["Ann"]);
    }

    #[test]
    fn test_find_attr_anywhere() {
        let root = tree(r#"<r descr="top"><pic:cNvPr descr="C:\img.png"><x descr="top"/></pic:cNvPr></r>"#);
        assert_eq!(
            find_attr_anywhere(&root, "descr").to_vec(),
            vec!["top", r"C:\img.png"]
        );
    }

    #[test]
    fn test_external_links_require_external_mode() {
        let root = tree(
            r#"<Relationships>
                <Relationship Id="1" Target="https://evil.example/x" TargetMode="External"/>
                <Relationship Id="2" Target="media/image1.png"/>
                <Relationship Id="3" Target="https://evil.example/x" TargetMode="External"/>
            </Relationships>"#,
        );
        assert_eq!(external_links(&root).to_vec(), vec!["https://evil.example/x"]);
    }

    #[test]
    fn test_hidden_sheets() {
        let root = tree(
            r#"<workbook><sheets>
                <sheet name="Secret" state="veryHidden"/>
                <sheet name="Visible" state="visible"/>
                <sheet name="Plain"/>
                <sheet name="Old" state="hidden"/>
            </sheets></workbook>"#,
        );
        assert_eq!(
            hidden_sheets(&root).to_vec(),
            vec!["Secret - (veryHidden)", "Old - (hidden)"]
        );
    }

    #[test]
    fn test_keyword_grep_first_content_hit_wins() {
        let root = tree("<a><b>password</b><c>password123</c></a>");
        assert_eq!(
            keyword_grep(&root, "password").as_deref(),
            Some("<b>password</b>")
        );
    }

    #[test]
    fn test_keyword_grep_tag_hit_stops_immediately() {
        let root = tree("<a><passwordHash>abc<x>password</x></passwordHash></a>");
        assert_eq!(
            keyword_grep(&root, "password").as_deref(),
            Some("<passwordHash>abc<x>password</x></passwordHash>")
        );
    }

    #[test]
    fn test_keyword_grep_keeps_outer_hit_when_children_miss() {
        // the keyword only lives in an attribute of the child, so the child
        // content never matches and the outer snippet stands
        let root = tree(r#"<a><b note="password">x</b></a>"#);
        assert_eq!(
            keyword_grep(&root, "password").as_deref(),
            Some(r#"<a><b note="password">x</b></a>"#)
        );
    }

    #[test]
    fn test_keyword_grep_misses_deeper_match_under_later_sibling() {
        let root = tree("<a><b><p>password</p></b><c><d><password/></d></c></a>");
        assert_eq!(
            keyword_grep(&root, "password").as_deref(),
            Some("<p>password</p>")
        );
    }

    #[test]
    fn test_keyword_grep_absent() {
        let root = tree("<a><b>nothing</b></a>");
        assert_eq!(keyword_grep(&root, "password"), None);
    }
}
