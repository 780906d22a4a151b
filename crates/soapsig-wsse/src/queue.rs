#![forbid(unsafe_code)]

//! Reference tracking for signing.
//!
//! Every element that must be signed is marked with a fresh `wsu:Id` and
//! queued.  The queue later emits one `ds:Reference` per element, in the
//! order the elements were queued, and fills in their digests once the
//! marked document has been re-parsed.

use crate::envelope::Edit;
use crate::reference;
use roxmltree::Node;
use soapsig_core::{algorithm, ns, Error, Namespace};
use soapsig_xml::{document, tree, XmlDocument, XmlWriter};
use tracing::debug;

/// A fresh identifier for a signed element or token.
pub fn new_id() -> String {
    format!("id-{}", uuid::Uuid::new_v4())
}

/// An element queued for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// The `wsu:Id` value assigned to the element.
    pub id: String,
    pub namespace: Option<String>,
    pub local_name: String,
}

impl Marker {
    /// The same-document URI pointing at the element.
    pub fn uri(&self) -> String {
        format!("#{}", self.id)
    }
}

/// Ordered queue of elements to be referenced from `SignedInfo`.
#[derive(Debug, Default)]
pub struct SignQueue {
    markers: Vec<Marker>,
}

impl SignQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `element` with a fresh `wsu:Id` and append it to the queue.
    ///
    /// Returns the edit of `source` that carries the mark.  An existing
    /// `wsu:Id` value is overwritten.  Otherwise the attribute is added
    /// using a prefix already bound to the wsu namespace, or a new
    /// declaration when none is in scope.
    pub fn enqueue(&mut self, source: &str, element: Node<'_, '_>) -> Result<Edit, Error> {
        if !element.is_element() {
            return Err(Error::XmlStructure("only elements can be signed".into()));
        }
        let id = new_id();
        let name = tree::written_name(source, element);
        let name_end = element.range().start + 1 + name.len();

        let existing = element
            .attributes()
            .find(|attr| attr.namespace() == Some(ns::WSU) && attr.name() == ns::attr::ID);
        let edit = match (existing, tree::lookup_prefix(element, ns::WSU)) {
            (Some(attr), _) => (attr.range_value(), id.clone()),
            (None, Some(prefix)) => (
                name_end..name_end,
                format!(" {prefix}:{}=\"{id}\"", ns::attr::ID),
            ),
            (None, None) => {
                let prefix = free_prefix(element, Namespace::Wsu.prefix());
                (
                    name_end..name_end,
                    format!(
                        " xmlns:{prefix}=\"{}\" {prefix}:{}=\"{id}\"",
                        ns::WSU,
                        ns::attr::ID
                    ),
                )
            }
        };

        debug!(element = name, %id, "queued element for signing");
        self.markers.push(Marker {
            id,
            namespace: element.tag_name().namespace().map(str::to_owned),
            local_name: element.tag_name().name().to_owned(),
        });
        Ok(edit)
    }

    /// Queued elements in insertion order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Write one `ds:Reference` per queued element with an empty
    /// `DigestValue`.
    ///
    /// The output expects the `ds` prefix to be bound by an ancestor.
    pub fn write_references(&self, w: &mut XmlWriter, inclusive_prefixes: &[String]) {
        let ds = Namespace::Ds;
        let ec = Namespace::Ec;
        let reference = ds.qname(ns::node::REFERENCE);
        let transforms = ds.qname(ns::node::TRANSFORMS);
        let transform = ds.qname(ns::node::TRANSFORM);
        let prefix_list = inclusive_prefixes.join(" ");

        for marker in &self.markers {
            let uri = marker.uri();
            w.start_element(&reference, &[(ns::attr::URI, uri.as_str())]);
            w.start_element(&transforms, &[]);
            w.start_element(&transform, &[(ns::attr::ALGORITHM, algorithm::EXC_C14N)]);
            if !inclusive_prefixes.is_empty() {
                w.empty_element(
                    &ec.qname(ns::node::INCLUSIVE_NAMESPACES),
                    &[
                        (ec.xmlns().as_str(), ec.uri()),
                        (ns::attr::PREFIX_LIST, prefix_list.as_str()),
                    ],
                );
            }
            w.end_element(&transform);
            w.end_element(&transforms);
            w.empty_element(
                &ds.qname(ns::node::DIGEST_METHOD),
                &[(ns::attr::ALGORITHM, algorithm::SHA1)],
            );
            w.text_element(&ds.qname(ns::node::DIGEST_VALUE), &[], "");
            w.end_element(&reference);
        }
    }

    /// Digest every queued element of the marked document `xml` and fill
    /// the `DigestValue`s of the signature with Id `signature_id`.
    pub fn fill_digests(
        &self,
        xml: &XmlDocument,
        signature_id: &str,
        log_canonical: bool,
    ) -> Result<String, Error> {
        let doc = xml.parse_doc()?;
        let id_map = xml.build_id_map(&doc);
        let signature = id_map.resolve(signature_id)?;
        let signed_info = reference::child(&doc, signature, ns::node::SIGNED_INFO)?;
        let references =
            document::find_child_elements(&doc, signed_info, ns::DSIG, ns::node::REFERENCE);
        if references.len() != self.markers.len() {
            return Err(Error::XmlStructure(format!(
                "SignedInfo has {} references for {} queued elements",
                references.len(),
                self.markers.len()
            )));
        }

        let mut values = Vec::with_capacity(references.len());
        for (marker, reference) in self.markers.iter().zip(references) {
            let digested = reference::digest_reference(&doc, &id_map, reference, log_canonical)?;
            if digested.uri != marker.uri() {
                return Err(Error::XmlStructure(format!(
                    "reference {} does not match queued element {}",
                    digested.uri, marker.id
                )));
            }
            let value = reference::encode_base64(&digested.computed);
            debug!(uri = digested.uri, digest = %value, "computed reference digest");
            values.push(value);
        }

        let source = xml.text();
        let tree = xml.parse_tree()?;
        let signature = tree::find_by_attribute(
            &tree,
            ns::DSIG,
            ns::node::SIGNATURE,
            ns::attr::ID,
            signature_id,
        )
        .ok_or(Error::MissingSignature)?;
        let signed_info = tree::find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
            .ok_or_else(|| Error::MissingElement(ns::node::SIGNED_INFO.into()))?;
        let mut edits = Vec::with_capacity(values.len());
        for (reference, value) in
            tree::find_child_elements(signed_info, ns::DSIG, ns::node::REFERENCE)
                .into_iter()
                .zip(values)
        {
            let digest_value =
                tree::find_child_element(reference, ns::DSIG, ns::node::DIGEST_VALUE)
                    .ok_or_else(|| Error::MissingElement(ns::node::DIGEST_VALUE.into()))?;
            let mut w = XmlWriter::new();
            w.text_element(tree::written_name(source, digest_value), &[], &value);
            edits.push(crate::envelope::replace_node(digest_value, w.into_string()));
        }
        crate::envelope::splice(source, edits)
    }
}

/// `base`, or `base` followed by a number, whichever is first unbound at
/// `element`.
fn free_prefix(element: Node<'_, '_>, base: &str) -> String {
    let mut candidate = base.to_owned();
    let mut n = 1;
    while element.lookup_namespace_uri(Some(candidate.as_str())).is_some() {
        candidate = format!("{base}{n}");
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::splice;
    use roxmltree::Document;

    fn find<'a, 'input>(doc: &'a Document<'input>, local: &str) -> Node<'a, 'input> {
        doc.descendants()
            .find(|n| n.is_element() && n.tag_name().name() == local)
            .unwrap()
    }

    fn wsu_id(xml: &str, local: &str) -> String {
        let doc = Document::parse(xml).unwrap();
        find(&doc, local)
            .attribute((ns::WSU, ns::attr::ID))
            .unwrap()
            .to_owned()
    }

    /// Enqueue `local` in `xml` and return the marked text and new id.
    fn mark(xml: &str, local: &str) -> (String, SignQueue) {
        let doc = Document::parse(xml).unwrap();
        let mut queue = SignQueue::new();
        let edit = queue.enqueue(xml, find(&doc, local)).unwrap();
        (splice(xml, vec![edit]).unwrap(), queue)
    }

    #[test]
    fn test_enqueue_declares_wsu() {
        let xml = "<s:Envelope xmlns:s=\"urn:s\"><s:Body>x</s:Body></s:Envelope>";
        let (out, queue) = mark(xml, "Body");
        let id = &queue.markers()[0].id;

        assert!(id.starts_with("id-"));
        assert_eq!(id.len(), "id-".len() + 36);
        assert!(out.contains(&format!(
            "<s:Body xmlns:wsu=\"{}\" wsu:Id=\"{id}\">",
            ns::WSU
        )));
        assert_eq!(&wsu_id(&out, "Body"), id);
        assert_eq!(queue.markers()[0].local_name, "Body");
        assert_eq!(queue.markers()[0].namespace.as_deref(), Some("urn:s"));
    }

    #[test]
    fn test_enqueue_reuses_bound_prefix() {
        let xml = format!("<e xmlns:u=\"{}\"><b>x</b></e>", ns::WSU);
        let (out, queue) = mark(&xml, "b");
        assert!(out.contains(&format!("<b u:Id=\"{}\">", queue.markers()[0].id)));
    }

    #[test]
    fn test_enqueue_replaces_existing_id() {
        let xml = format!(
            "<e xmlns:wsu=\"{}\"><t wsu:Id=\"TS-1\" a=\"b\"/></e>",
            ns::WSU
        );
        let (out, queue) = mark(&xml, "t");
        assert!(!out.contains("TS-1"));
        assert_eq!(out.matches("wsu:Id=").count(), 1);
        assert_eq!(wsu_id(&out, "t"), queue.markers()[0].id);
    }

    #[test]
    fn test_enqueue_avoids_conflicting_prefix() {
        let xml = "<e xmlns:wsu=\"urn:other\"><b/></e>";
        let (out, queue) = mark(xml, "b");
        let id = &queue.markers()[0].id;
        assert!(out.contains(&format!("xmlns:wsu1=\"{}\" wsu1:Id=\"{id}\"", ns::WSU)));
        assert_eq!(&wsu_id(&out, "b"), id);
    }

    #[test]
    fn test_written_references_in_queue_order() {
        let queue = SignQueue {
            markers: vec![
                Marker {
                    id: "id-1".into(),
                    namespace: None,
                    local_name: "Body".into(),
                },
                Marker {
                    id: "id-2".into(),
                    namespace: None,
                    local_name: "Timestamp".into(),
                },
            ],
        };
        let written = |prefixes: &[String]| {
            let mut w = XmlWriter::new();
            w.start_element("ds:SignedInfo", &[("xmlns:ds", ns::DSIG)]);
            queue.write_references(&mut w, prefixes);
            w.end_element("ds:SignedInfo");
            w.into_string()
        };

        let out = written(&["urn".to_owned(), "mvt".to_owned()]);
        let doc = Document::parse(&out).unwrap();
        let uris: Vec<&str> = tree::find_elements(&doc, ns::DSIG, ns::node::REFERENCE)
            .iter()
            .filter_map(|r| r.attribute(ns::attr::URI))
            .collect();
        assert_eq!(uris, ["#id-1", "#id-2"]);
        let inclusive = tree::find_elements(&doc, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES);
        assert_eq!(inclusive.len(), 2);
        assert_eq!(inclusive[0].attribute(ns::attr::PREFIX_LIST), Some("urn mvt"));
        for value in tree::find_elements(&doc, ns::DSIG, ns::node::DIGEST_VALUE) {
            assert_eq!(value.text().unwrap_or(""), "");
        }

        let bare = written(&[]);
        assert!(!bare.contains("InclusiveNamespaces"));
    }
}
