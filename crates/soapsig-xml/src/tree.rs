#![forbid(unsafe_code)]

//! Positional access to a parsed document.
//!
//! `roxmltree` records the byte range of every node in the source text.
//! Signing uses those ranges to place new content next to existing nodes
//! without re-serializing anything it did not create.

use roxmltree::{Document, Node};

/// Whether `node` is an element with the given namespace and local name.
pub fn is_element(node: Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// Find all descendant elements with the given local name and namespace.
pub fn find_elements<'a, 'input>(
    doc: &'a Document<'input>,
    ns: &str,
    local_name: &str,
) -> Vec<Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| is_element(*n, ns, local_name))
        .collect()
}

/// Find the first child element with the given local name and namespace.
pub fn find_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_element(*n, ns, local_name))
}

/// Find all child elements with the given local name and namespace.
pub fn find_child_elements<'a, 'input>(
    node: Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<Node<'a, 'input>> {
    node.children()
        .filter(|n| is_element(*n, ns, local_name))
        .collect()
}

/// The element `{ns}local_name` whose unqualified attribute `attr` is `value`.
pub fn find_by_attribute<'a, 'input>(
    doc: &'a Document<'input>,
    ns: &str,
    local_name: &str,
    attr: &str,
    value: &str,
) -> Option<Node<'a, 'input>> {
    doc.descendants()
        .find(|n| is_element(*n, ns, local_name) && n.attribute(attr) == Some(value))
}

/// Find the prefix bound to `uri` in scope at `node`, if any.
///
/// The default namespace is never returned since it cannot qualify
/// attributes.
pub fn lookup_prefix<'a>(node: Node<'a, '_>, uri: &str) -> Option<&'a str> {
    node.namespaces()
        .find(|n| n.uri() == uri && n.name().is_some())
        .and_then(|n| n.name())
}

/// The qualified name an element was written with, read from the start of
/// its range (`<soap:Body ...` gives `soap:Body`).
pub fn written_name<'t>(text: &'t str, node: Node<'_, '_>) -> &'t str {
    let tag = text
        .get(node.range().start + 1..)
        .unwrap_or_default();
    let end = tag
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    &tag[..end]
}

/// Whether `node` was written as an empty-element tag (`<a/>`).
pub fn is_empty_element_tag(text: &str, node: Node<'_, '_>) -> bool {
    text.get(node.range())
        .is_some_and(|source| source.ends_with("/>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<s:r xmlns:s="urn:s" xmlns:u="urn:u"><s:h /><s:b Id="x">t</s:b><c>
</c></s:r>"#;

    #[test]
    fn test_written_names() {
        let doc = crate::parse_tree(XML).unwrap();
        let names: Vec<&str> = doc
            .descendants()
            .filter(|n| n.is_element())
            .map(|n| written_name(XML, n))
            .collect();
        assert_eq!(names, ["s:r", "s:h", "s:b", "c"]);
    }

    #[test]
    fn test_empty_element_tags() {
        let doc = crate::parse_tree(XML).unwrap();
        let root = doc.root_element();
        let h = find_child_element(root, "urn:s", "h").unwrap();
        let b = find_child_element(root, "urn:s", "b").unwrap();
        let c = find_child_element(root, "", "c").unwrap();
        assert!(is_empty_element_tag(XML, h));
        assert!(!is_empty_element_tag(XML, b));
        assert!(!is_empty_element_tag(XML, c));
    }

    #[test]
    fn test_lookup_and_find() {
        let doc = crate::parse_tree(XML).unwrap();
        let b = find_by_attribute(&doc, "urn:s", "b", "Id", "x").unwrap();
        assert_eq!(b.text(), Some("t"));
        assert!(find_by_attribute(&doc, "urn:s", "b", "Id", "y").is_none());
        assert_eq!(lookup_prefix(b, "urn:u"), Some("u"));
        assert_eq!(lookup_prefix(b, "urn:none"), None);
        assert_eq!(find_elements(&doc, "urn:s", "h").len(), 1);
        assert_eq!(find_child_elements(doc.root_element(), "urn:s", "b").len(), 1);
    }
}
