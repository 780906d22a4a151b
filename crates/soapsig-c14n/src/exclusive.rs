#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output.  A namespace
//! is visibly utilized by an element if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList.
//!
//! A declaration is emitted only when the nearest output ancestor did not
//! already render the same binding.

use crate::escape;
use crate::render::{Attr, NsDecl};
use soapsig_core::{ns, Error};
use soapsig_xml::NodeSet;
use std::collections::{BTreeMap, BTreeSet};
use uppsala::{Document, NodeId, NodeKind};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let ctx = ExcC14nContext {
        doc,
        with_comments,
        node_set,
        inclusive_prefixes: inclusive_prefixes
            .iter()
            .map(|p| {
                if p == "#default" {
                    String::new()
                } else {
                    p.clone()
                }
            })
            .collect(),
    };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a, 'doc> {
    doc: &'a Document<'doc>,
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    /// Prefixes treated as visibly utilized on every element ("" is the
    /// default namespace).
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_, '_> {
    fn is_visible(&self, id: NodeId) -> bool {
        self.node_set.map_or(true, |set| set.contains_id(id))
    }

    fn process_node(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match self.doc.node_kind(id) {
            Some(NodeKind::Document) => {
                for child in self.doc.children(id) {
                    self.process_node(child, output, rendered_ns)?;
                }
            }
            Some(NodeKind::Element(_)) => self.process_element(id, output, rendered_ns)?,
            Some(NodeKind::Text(text)) | Some(NodeKind::CData(text)) => {
                if self.is_visible(id) {
                    output.extend_from_slice(escape::escape_text(text).as_bytes());
                }
            }
            Some(NodeKind::Comment(text)) => {
                if self.with_comments && self.is_visible(id) {
                    self.document_level_newline_before(id, output);
                    output.extend_from_slice(b"<!--");
                    output.extend_from_slice(text.as_bytes());
                    output.extend_from_slice(b"-->");
                    self.document_level_newline_after(id, output);
                }
            }
            Some(NodeKind::ProcessingInstruction(pi)) => {
                if self.is_visible(id) {
                    self.document_level_newline_before(id, output);
                    output.extend_from_slice(b"<?");
                    output.extend_from_slice(pi.target.as_bytes());
                    if let Some(value) = pi.data.as_deref().filter(|v| !v.is_empty()) {
                        output.push(b' ');
                        output.extend_from_slice(escape::escape_pi(value).as_bytes());
                    }
                    output.extend_from_slice(b"?>");
                    self.document_level_newline_after(id, output);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn document_level_newline_before(&self, id: NodeId, output: &mut Vec<u8>) {
        if is_document_level(self.doc, id) && has_preceding_element(self.doc, id) {
            output.push(b'\n');
        }
    }

    fn document_level_newline_after(&self, id: NodeId, output: &mut Vec<u8>) {
        if is_document_level(self.doc, id) && has_following_element(self.doc, id) {
            output.push(b'\n');
        }
    }

    fn process_element(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(id) {
            // Exclusive C14N renders nothing for an element outside the
            // node set; its descendants keep the ancestor's rendered context.
            for child in self.doc.children(id) {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        let Some(elem) = self.doc.element(id) else {
            return Ok(());
        };
        let elem_name = qualified_element_name(self.doc, id);
        let in_scope = collect_inscope_namespaces(self.doc, id);

        let elem_prefix = elem.name.prefix.as_deref().unwrap_or("");
        let namespaced = elem
            .name
            .namespace_uri
            .as_deref()
            .is_some_and(|uri| !uri.is_empty());
        if namespaced && !in_scope.contains_key(elem_prefix) {
            return Err(Error::Canonicalization(format!(
                "element <{elem_name}> uses an unbound prefix"
            )));
        }

        let mut utilized: BTreeSet<String> = self.inclusive_prefixes.clone();
        utilized.insert(elem_prefix.to_owned());

        let mut attrs: Vec<Attr> = Vec::new();
        for attr in &elem.attributes {
            let prefix = get_attr_prefix(attr);
            if let Some(prefix) = prefix.as_deref().filter(|p| *p != "xml") {
                utilized.insert(prefix.to_owned());
            }
            let qualified_name = match prefix {
                Some(prefix) if !prefix.is_empty() => {
                    format!("{}:{}", prefix, attr.name.local_name)
                }
                _ => attr.name.local_name.to_string(),
            };
            attrs.push(Attr {
                ns_uri: attr.name.namespace_uri.as_deref().unwrap_or("").to_owned(),
                local_name: attr.name.local_name.to_string(),
                qualified_name,
                value: attr.value.to_string(),
            });
        }
        attrs.sort();

        // Determine which namespace declarations to output.
        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            match in_scope.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        });
                    }
                }
                None if prefix.is_empty() => {
                    // The default namespace went out of scope after an
                    // ancestor rendered one.
                    if rendered_ns.get("").is_some_and(|uri| !uri.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        output.push(b'<');
        output.extend_from_slice(elem_name.as_bytes());
        for ns_decl in &ns_decls {
            ns_decl.write_to(output);
        }
        for attr in &attrs {
            attr.write_to(output);
        }
        output.push(b'>');

        let mut child_rendered_ns = rendered_ns.clone();
        for ns_decl in ns_decls {
            child_rendered_ns.insert(ns_decl.prefix, ns_decl.uri);
        }

        for child in self.doc.children(id) {
            self.process_node(child, output, &child_rendered_ns)?;
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(elem_name.as_bytes());
        output.push(b'>');
        Ok(())
    }
}

fn is_document_level(doc: &Document<'_>, id: NodeId) -> bool {
    doc.parent(id)
        .is_some_and(|p| matches!(doc.node_kind(p), Some(NodeKind::Document)))
}

/// Check if any preceding sibling is an element.
fn has_preceding_element(doc: &Document<'_>, id: NodeId) -> bool {
    let mut sib = doc.previous_sibling(id);
    while let Some(s) = sib {
        if doc.element(s).is_some() {
            return true;
        }
        sib = doc.previous_sibling(s);
    }
    false
}

/// Check if any following sibling is an element.
fn has_following_element(doc: &Document<'_>, id: NodeId) -> bool {
    let mut sib = doc.next_sibling(id);
    while let Some(s) = sib {
        if doc.element(s).is_some() {
            return true;
        }
        sib = doc.next_sibling(s);
    }
    false
}

/// The prefix of a namespaced attribute; `None` for unqualified ones.
fn get_attr_prefix(attr: &uppsala::Attribute<'_>) -> Option<String> {
    let uri = attr.name.namespace_uri.as_deref()?;
    if uri == ns::XML {
        return Some("xml".to_owned());
    }
    Some(attr.name.prefix.as_deref().unwrap_or("").to_owned())
}

/// All namespaces in scope at an element, keyed by prefix ("" for the
/// default namespace).  Undeclarations remove the binding.
fn collect_inscope_namespaces(doc: &Document<'_>, id: NodeId) -> BTreeMap<String, String> {
    let mut levels: Vec<BTreeMap<String, String>> = Vec::new();
    let mut current = Some(id);
    while let Some(n) = current {
        if let Some(elem) = doc.element(n) {
            levels.push(
                elem.namespace_declarations
                    .iter()
                    .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
                    .collect(),
            );
        }
        current = doc.parent(n);
    }

    let mut result = BTreeMap::new();
    for level in levels.into_iter().rev() {
        for (prefix, uri) in level {
            if uri.is_empty() {
                result.remove(&prefix);
            } else {
                result.insert(prefix, uri);
            }
        }
    }
    result.remove("xml");
    result
}

/// The element name as written, `prefix:local` or `local`.
fn qualified_element_name(doc: &Document<'_>, id: NodeId) -> String {
    let Some(elem) = doc.element(id) else {
        return String::new();
    };
    match elem.name.prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, elem.name.local_name),
        _ => elem.name.local_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str, with_comments: bool, prefixes: &[&str]) -> String {
        let doc = soapsig_xml::parse(xml).unwrap();
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        String::from_utf8(canonicalize(&doc, with_comments, None, &prefixes).unwrap()).unwrap()
    }

    fn c14n_subtree(xml: &str, local: &str, prefixes: &[&str]) -> String {
        let doc = soapsig_xml::parse(xml).unwrap();
        let node = doc
            .descendants(doc.root())
            .into_iter()
            .find(|id| doc.element(*id).is_some_and(|e| e.name.local_name == local))
            .unwrap();
        let set = NodeSet::tree_without_comments(node, &doc);
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        String::from_utf8(canonicalize(&doc, false, Some(&set), &prefixes).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_element_expanded() {
        assert_eq!(c14n("<a/>", false, &[]), "<a></a>");
    }

    #[test]
    fn test_attribute_order() {
        let xml = r#"<e xmlns:b="urn:b" xmlns:a="urn:a" z="1" b:x="2" a:y="3" c="4"/>"#;
        assert_eq!(
            c14n(xml, false, &[]),
            r#"<e xmlns:a="urn:a" xmlns:b="urn:b" c="4" z="1" a:y="3" b:x="2"></e>"#
        );
    }

    #[test]
    fn test_unused_namespace_dropped() {
        let xml = r#"<s:Envelope xmlns:s="urn:s" xmlns:unused="urn:u"><s:Body><p:m xmlns:p="urn:p">x</p:m></s:Body></s:Envelope>"#;
        assert_eq!(
            c14n_subtree(xml, "Body", &[]),
            r#"<s:Body xmlns:s="urn:s"><p:m xmlns:p="urn:p">x</p:m></s:Body>"#
        );
    }

    #[test]
    fn test_inclusive_prefix_rendered_when_in_scope() {
        let xml = r#"<s:Envelope xmlns:s="urn:s" xmlns:urn="urn:svc"><s:Body/></s:Envelope>"#;
        assert_eq!(
            c14n_subtree(xml, "Body", &["urn"]),
            r#"<s:Body xmlns:s="urn:s" xmlns:urn="urn:svc"></s:Body>"#
        );
        // Not in scope: nothing to render.
        let xml = r#"<s:Envelope xmlns:s="urn:s"><s:Body/></s:Envelope>"#;
        assert_eq!(
            c14n_subtree(xml, "Body", &["urn"]),
            r#"<s:Body xmlns:s="urn:s"></s:Body>"#
        );
    }

    #[test]
    fn test_default_namespace_and_undeclaration() {
        let xml = r#"<a xmlns="urn:d"><b xmlns=""><c/></b></a>"#;
        assert_eq!(
            c14n(xml, false, &[]),
            r#"<a xmlns="urn:d"><b xmlns=""><c></c></b></a>"#
        );
    }

    #[test]
    fn test_redeclared_prefix_not_repeated() {
        let xml = r#"<p:a xmlns:p="urn:p"><p:b xmlns:p="urn:p"/></p:a>"#;
        assert_eq!(
            c14n(xml, false, &[]),
            r#"<p:a xmlns:p="urn:p"><p:b></p:b></p:a>"#
        );
    }

    #[test]
    fn test_escaping_and_comments() {
        let xml = "<a t=\"x&amp;&quot;y\"><!--note-->1 &lt; 2 &gt; 0</a>";
        assert_eq!(
            c14n(xml, false, &[]),
            "<a t=\"x&amp;&quot;y\">1 &lt; 2 &gt; 0</a>"
        );
        assert_eq!(
            c14n(xml, true, &[]),
            "<a t=\"x&amp;&quot;y\"><!--note-->1 &lt; 2 &gt; 0</a>"
        );
    }

    #[test]
    fn test_document_level_comment_newlines() {
        assert_eq!(c14n("<!--x--><a/>", true, &[]), "<!--x-->\n<a></a>");
        assert_eq!(c14n("<a/><!--y-->", true, &[]), "<a></a>\n<!--y-->");
    }

    #[test]
    fn test_subtree_excludes_siblings() {
        let xml = r#"<r xmlns:w="urn:w"><w:a w:Id="1">t</w:a><w:b/></r>"#;
        assert_eq!(
            c14n_subtree(xml, "a", &[]),
            r#"<w:a xmlns:w="urn:w" w:Id="1">t</w:a>"#
        );
    }
}
