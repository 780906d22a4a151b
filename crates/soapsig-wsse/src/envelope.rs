#![forbid(unsafe_code)]

//! SOAP envelope structure and the WS-Security header fragments written
//! into it.
//!
//! Fragments are serialized with [`XmlWriter`] and placed into the
//! envelope text at byte positions taken from a positional parse, so that
//! everything signing does not create is left exactly as it was received.

use crate::queue::SignQueue;
use crate::reference;
use roxmltree::{Document, Node};
use soapsig_core::{algorithm, ns, Error, Namespace};
use soapsig_xml::{tree, XmlWriter};
use std::ops::Range;

/// A replacement of `source[range]` by new text.
pub type Edit = (Range<usize>, String);

/// The parts of a SOAP envelope that signing touches.
#[derive(Debug, Clone, Copy)]
pub struct SoapEnvelope<'a, 'input> {
    pub root: Node<'a, 'input>,
    /// `Namespace::Soap11` or `Namespace::Soap12`.
    pub version: Namespace,
    pub header: Option<Node<'a, 'input>>,
    pub body: Node<'a, 'input>,
    /// The `wsse:Security` child of `Header`, if present.
    pub security: Option<Node<'a, 'input>>,
}

impl<'a, 'input> SoapEnvelope<'a, 'input> {
    /// Locate `Envelope`, `Header`, `Body` and `Security` in `doc`.
    pub fn locate(doc: &'a Document<'input>) -> Result<Self, Error> {
        let root = doc.root_element();
        let version = root
            .tag_name()
            .namespace()
            .and_then(Namespace::from_uri)
            .filter(|v| matches!(v, Namespace::Soap11 | Namespace::Soap12))
            .filter(|_| root.tag_name().name() == ns::node::ENVELOPE)
            .ok_or_else(|| {
                Error::XmlStructure(format!(
                    "document root <{}> is not a SOAP Envelope",
                    root.tag_name().name()
                ))
            })?;

        let mut bodies = tree::find_child_elements(root, version.uri(), ns::node::BODY);
        let body = match bodies.len() {
            0 => return Err(Error::MissingBody),
            1 => bodies.remove(0),
            n => {
                return Err(Error::XmlStructure(format!(
                    "envelope has {n} Body elements"
                )))
            }
        };
        let header = tree::find_child_element(root, version.uri(), ns::node::HEADER);
        let security =
            header.and_then(|h| tree::find_child_element(h, ns::WSSE, ns::node::SECURITY));

        Ok(Self {
            root,
            version,
            header,
            body,
            security,
        })
    }

    /// `wsu:Timestamp` children of an existing `Security` header, in
    /// document order.
    pub fn timestamps(&self) -> Vec<Node<'a, 'input>> {
        self.security
            .map(|s| tree::find_child_elements(s, ns::WSU, ns::node::TIMESTAMP))
            .unwrap_or_default()
    }

    /// The qualified name for a new `Header`, using the envelope's prefix.
    pub fn header_name(&self, source: &str) -> String {
        match tree::written_name(source, self.root).split_once(':') {
            Some((prefix, _)) => format!("{prefix}:{}", ns::node::HEADER),
            None => ns::node::HEADER.to_owned(),
        }
    }
}

/// Those of `namespaces` whose usual prefix is not bound to them at `scope`.
pub fn missing_declarations(scope: Node<'_, '_>, namespaces: &[Namespace]) -> Vec<Namespace> {
    namespaces
        .iter()
        .filter(|n| scope.lookup_namespace_uri(Some(n.prefix())) != Some(n.uri()))
        .copied()
        .collect()
}

/// The `BinarySecurityToken` and signature template appended to
/// `wsse:Security`.
#[derive(Debug, Clone)]
pub struct SecurityContent<'a> {
    pub cert_der: &'a [u8],
    pub token_id: &'a str,
    pub signature_id: &'a str,
    /// Namespaces the token has to declare because no ancestor binds them.
    pub token_declarations: Vec<Namespace>,
    /// Same, for the `SecurityTokenReference`.
    pub key_info_declarations: Vec<Namespace>,
}

impl SecurityContent<'_> {
    /// Write the token followed by a `ds:Signature` whose `DigestValue`s
    /// and `SignatureValue` are empty.
    pub fn write(&self, w: &mut XmlWriter, queue: &SignQueue, inclusive_prefixes: &[String]) {
        self.write_token(w);

        let ds = Namespace::Ds;
        let signature = ds.qname(ns::node::SIGNATURE);
        let signed_info = ds.qname(ns::node::SIGNED_INFO);
        w.start_element(
            &signature,
            &[
                (ds.xmlns().as_str(), ds.uri()),
                (ns::attr::ID, self.signature_id),
            ],
        );
        w.start_element(&signed_info, &[]);
        w.empty_element(
            &ds.qname(ns::node::CANONICALIZATION_METHOD),
            &[(ns::attr::ALGORITHM, algorithm::EXC_C14N)],
        );
        w.empty_element(
            &ds.qname(ns::node::SIGNATURE_METHOD),
            &[(ns::attr::ALGORITHM, algorithm::RSA_SHA1)],
        );
        queue.write_references(w, inclusive_prefixes);
        w.end_element(&signed_info);
        w.text_element(&ds.qname(ns::node::SIGNATURE_VALUE), &[], "");
        self.write_key_info(w);
        w.end_element(&signature);
    }

    fn write_token(&self, w: &mut XmlWriter) {
        let declarations = declaration_attrs(&self.token_declarations);
        let id = Namespace::Wsu.qname(ns::attr::ID);
        let mut attrs = borrow_attrs(&declarations);
        attrs.extend([
            (ns::attr::ENCODING_TYPE, algorithm::BASE64_BINARY),
            (ns::attr::VALUE_TYPE, algorithm::X509V3_TOKEN_TYPE),
            (id.as_str(), self.token_id),
        ]);
        w.text_element(
            &Namespace::Wsse.qname(ns::node::BINARY_SECURITY_TOKEN),
            &attrs,
            &reference::encode_base64(self.cert_der),
        );
    }

    fn write_key_info(&self, w: &mut XmlWriter) {
        let wsse = Namespace::Wsse;
        let key_info = Namespace::Ds.qname(ns::node::KEY_INFO);
        let token_ref = wsse.qname(ns::node::SECURITY_TOKEN_REFERENCE);
        let token_type = wsse.qname(ns::attr::TOKEN_TYPE);
        let uri = format!("#{}", self.token_id);

        let declarations = declaration_attrs(&self.key_info_declarations);
        let mut attrs = borrow_attrs(&declarations);
        attrs.push((token_type.as_str(), algorithm::X509V3_TOKEN_TYPE));

        w.start_element(&key_info, &[]);
        w.start_element(&token_ref, &attrs);
        w.empty_element(
            &wsse.qname(ns::node::WSSE_REFERENCE),
            &[
                (ns::attr::URI, uri.as_str()),
                (ns::attr::VALUE_TYPE, algorithm::X509V3_TOKEN_TYPE),
            ],
        );
        w.end_element(&token_ref);
        w.end_element(&key_info);
    }
}

/// Write a new `wsse:Security` holding `content`.
pub fn write_security(
    w: &mut XmlWriter,
    content: &SecurityContent<'_>,
    queue: &SignQueue,
    inclusive_prefixes: &[String],
) {
    let security = Namespace::Wsse.qname(ns::node::SECURITY);
    let declarations = declaration_attrs(&[Namespace::Wsse, Namespace::Wsu]);
    w.start_element(&security, &borrow_attrs(&declarations));
    content.write(w, queue, inclusive_prefixes);
    w.end_element(&security);
}

fn declaration_attrs(namespaces: &[Namespace]) -> Vec<(String, &'static str)> {
    namespaces.iter().map(|n| (n.xmlns(), n.uri())).collect()
}

fn borrow_attrs<'a>(owned: &'a [(String, &'static str)]) -> Vec<(&'a str, &'a str)> {
    owned.iter().map(|(name, value)| (name.as_str(), *value)).collect()
}

/// Insert `content` as the last child of `parent`, expanding an
/// empty-element tag when needed.
pub(crate) fn append_child(source: &str, parent: Node<'_, '_>, content: String) -> Edit {
    let range = parent.range();
    if tree::is_empty_element_tag(source, parent) {
        let name = tree::written_name(source, parent);
        return (range.end - 2..range.end, format!(">{content}</{name}>"));
    }
    let close = source
        .get(range.clone())
        .and_then(|element| element.rfind("</"))
        .map_or(range.end, |offset| range.start + offset);
    (close..close, content)
}

/// Insert `content` immediately before `node`.
pub(crate) fn insert_before(node: Node<'_, '_>, content: String) -> Edit {
    let start = node.range().start;
    (start..start, content)
}

/// Replace the whole of `node` with `content`.
pub(crate) fn replace_node(node: Node<'_, '_>, content: String) -> Edit {
    (node.range(), content)
}

/// Apply non-overlapping edits to `source`.
pub fn splice(source: &str, mut edits: Vec<Edit>) -> Result<String, Error> {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = source.to_owned();
    let mut limit = source.len();
    for (range, text) in edits {
        let valid = range.start <= range.end
            && range.end <= limit
            && source.is_char_boundary(range.start)
            && source.is_char_boundary(range.end);
        if !valid {
            return Err(Error::XmlStructure(format!(
                "overlapping or invalid edit at {}..{}",
                range.start, range.end
            )));
        }
        limit = range.start;
        out.replace_range(range, &text);
    }
    Ok(out)
}
