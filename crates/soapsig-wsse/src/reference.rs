#![forbid(unsafe_code)]

//! Processing shared by signing and verification: digesting a
//! `ds:Reference` target and canonicalizing `ds:SignedInfo`.

use base64::Engine;
use soapsig_c14n::C14nMode;
use soapsig_core::{ns, Error};
use soapsig_crypto::digest;
use soapsig_transforms::{pipeline, TransformData, TransformPipeline};
use soapsig_xml::{document, xpath, Document, IdMap, NodeId};
use tracing::debug;

/// A `ds:Reference` whose target has been resolved and digested.
pub(crate) struct DigestedReference<'a> {
    pub uri: &'a str,
    pub target: NodeId,
    pub digest_value: NodeId,
    pub computed: Vec<u8>,
}

/// Resolve `reference`, run its transform chain over the target subtree and
/// digest the result with its `DigestMethod`.
pub(crate) fn digest_reference<'a>(
    doc: &'a Document<'_>,
    id_map: &IdMap,
    reference: NodeId,
    log_canonical: bool,
) -> Result<DigestedReference<'a>, Error> {
    let uri = document::attribute(doc, reference, None, ns::attr::URI)
        .ok_or_else(|| Error::MissingAttribute(format!("{} on Reference", ns::attr::URI)))?;
    let target = xpath::resolve_uri(id_map, uri)?;

    let transforms =
        document::find_child_element(doc, reference, ns::DSIG, ns::node::TRANSFORMS);
    let pipeline = TransformPipeline::from_transforms_node(doc, transforms)?;
    let canonical = pipeline
        .execute(TransformData::subtree(doc, target))?
        .into_binary()?;
    if log_canonical {
        debug!(uri, canonical = %String::from_utf8_lossy(&canonical), "pre-digest data");
    }

    let digest_method = child(doc, reference, ns::node::DIGEST_METHOD)?;
    let digest_uri = algorithm_of(doc, digest_method, ns::node::DIGEST_METHOD)?;
    let computed = digest::digest(digest_uri, &canonical)?;
    let digest_value = child(doc, reference, ns::node::DIGEST_VALUE)?;

    Ok(DigestedReference {
        uri,
        target,
        digest_value,
        computed,
    })
}

/// Canonicalize `signed_info` as its `CanonicalizationMethod` declares.
pub(crate) fn canonical_signed_info(
    doc: &Document<'_>,
    signed_info: NodeId,
    log_canonical: bool,
) -> Result<Vec<u8>, Error> {
    let method = child(doc, signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let uri = algorithm_of(doc, method, ns::node::CANONICALIZATION_METHOD)?;
    let mode = C14nMode::from_uri(uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {uri}")))?;
    let prefixes = pipeline::read_inclusive_prefixes(doc, method);
    let canonical = soapsig_c14n::canonicalize_subtree(doc, signed_info, mode, &prefixes)?;
    if log_canonical {
        debug!(canonical = %String::from_utf8_lossy(&canonical), "pre-signature data");
    }
    Ok(canonical)
}

/// The `ds:` child `local_name` of `node`, or `Error::MissingElement`.
pub(crate) fn child(doc: &Document<'_>, node: NodeId, local_name: &str) -> Result<NodeId, Error> {
    document::find_child_element(doc, node, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.to_owned()))
}

/// The `Algorithm` attribute of `node`.
pub(crate) fn algorithm_of<'d>(
    doc: &'d Document<'_>,
    node: NodeId,
    element: &str,
) -> Result<&'d str, Error> {
    document::attribute(doc, node, None, ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute(format!("{} on {element}", ns::attr::ALGORITHM)))
}

/// Base64 text content of an element, tolerating line breaks.
pub(crate) fn decode_base64_text(doc: &Document<'_>, node: NodeId) -> Result<Vec<u8>, Error> {
    let text: String = document::text_content(doc, node)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(text.as_bytes())
        .map_err(|e| {
            let name = document::expanded_name(doc, node)
                .map(|(_, local)| local)
                .unwrap_or_default();
            Error::Base64(format!("{name}: {e}"))
        })
}

/// Standard base64 without line breaks.
pub(crate) fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soapsig_xml::XmlDocument;

    const REFERENCE: &str = r##"<r xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
<ds:Reference URI="#t"><ds:Transforms><ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/></ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"/><ds:DigestValue>
  qvTGHdzF6KLavt4PO0gs2a6pQ00=
</ds:DigestValue></ds:Reference>
<b Id="t">hello</b>
</r>"##;

    #[test]
    fn test_digest_reference() {
        let xml = XmlDocument::parse(REFERENCE.to_owned()).unwrap();
        let doc = xml.parse_doc().unwrap();
        let id_map = xml.build_id_map(&doc);
        let reference = document::find_element(&doc, ns::DSIG, ns::node::REFERENCE).unwrap();
        let digested = digest_reference(&doc, &id_map, reference, false).unwrap();
        assert_eq!(digested.uri, "#t");
        assert!(document::is_element(&doc, digested.target, "", "b"));
        assert_eq!(
            digested.computed,
            digest::digest(soapsig_core::algorithm::SHA1, b"<b Id=\"t\">hello</b>").unwrap()
        );
        // Whitespace around the stored value is ignored.
        assert_eq!(decode_base64_text(&doc, digested.digest_value).unwrap().len(), 20);
    }

    #[test]
    fn test_unresolved_reference() {
        let text = REFERENCE.replace("URI=\"#t\"", "URI=\"#missing\"");
        let doc = soapsig_xml::parse(&text).unwrap();
        let id_map = IdMap::default();
        let reference = document::find_element(&doc, ns::DSIG, ns::node::REFERENCE).unwrap();
        assert!(matches!(
            digest_reference(&doc, &id_map, reference, false),
            Err(Error::InvalidUri(_))
        ));
    }

    #[test]
    fn test_reference_to_repeated_id_is_rejected() {
        let text = REFERENCE.replace("</r>", "<c Id=\"t\">other</c></r>");
        let xml = XmlDocument::parse(text).unwrap();
        let doc = xml.parse_doc().unwrap();
        let id_map = xml.build_id_map(&doc);
        let reference = document::find_element(&doc, ns::DSIG, ns::node::REFERENCE).unwrap();
        assert!(matches!(
            digest_reference(&doc, &id_map, reference, false),
            Err(Error::InvalidUri(msg)) if msg.contains("ambiguous")
        ));
    }

    #[test]
    fn test_bad_base64() {
        let doc = soapsig_xml::parse("<v>not*base64</v>").unwrap();
        let v = document::find_element(&doc, "", "v").unwrap();
        assert!(matches!(decode_base64_text(&doc, v), Err(Error::Base64(_))));
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
    }
}
