#![forbid(unsafe_code)]

//! Signature verification.

use crate::context::WsseContext;
use crate::reference;
use soapsig_core::{ns, Error};
use soapsig_crypto::{sign, SigningKey};
use soapsig_xml::{document, Document, NodeId, XmlDocument};
use tracing::{debug, warn};

/// An element covered by a valid signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedReference {
    pub uri: String,
    pub namespace: Option<String>,
    pub local_name: String,
}

/// Outcome of checking a signature that could be processed.
///
/// Malformed input is reported as `Err`; a well-formed signature that does
/// not match the message is one of the mismatch variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { references: Vec<VerifiedReference> },
    /// The content of the referenced element changed after signing.
    DigestMismatch { uri: String },
    /// `SignedInfo` was not signed by the trusted key.
    SignatureMismatch,
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Whether a valid signature covers an element named `{namespace}local_name`.
    pub fn covers(&self, namespace: Option<&str>, local_name: &str) -> bool {
        match self {
            Self::Valid { references } => references
                .iter()
                .any(|r| r.namespace.as_deref() == namespace && r.local_name == local_name),
            _ => false,
        }
    }

    /// Why verification failed, or `None` when it succeeded.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Valid { .. } => None,
            Self::DigestMismatch { uri } => Some(format!("digest mismatch for reference {uri}")),
            Self::SignatureMismatch => Some("signature value does not match".to_owned()),
        }
    }
}

/// Verify the signature on a SOAP envelope.
pub fn verify_envelope(ctx: &WsseContext, envelope: &[u8]) -> Result<VerifyResult, Error> {
    let mut xml = XmlDocument::parse_bytes(envelope)?;
    for name in &ctx.id_attrs {
        xml.add_id_attr(name);
    }
    let doc = xml.parse_doc()?;
    verify_document(ctx, &xml, &doc)
}

/// Verify the signature on a SOAP envelope given as text.
pub fn verify_envelope_str(ctx: &WsseContext, envelope: &str) -> Result<VerifyResult, Error> {
    verify_envelope(ctx, envelope.as_bytes())
}

/// Verify and collapse the outcome to a boolean.
pub fn verify_envelope_bool(ctx: &WsseContext, envelope: &[u8]) -> Result<bool, Error> {
    verify_envelope(ctx, envelope).map(|r| r.is_valid())
}

fn verify_document(
    ctx: &WsseContext,
    xml: &XmlDocument,
    doc: &Document<'_>,
) -> Result<VerifyResult, Error> {
    let signature = select_signature(doc).ok_or(Error::MissingSignature)?;
    let key = ctx.verification_key()?;
    let id_map = xml.build_id_map(doc);

    let signed_info = reference::child(doc, signature, ns::node::SIGNED_INFO)?;
    let references =
        document::find_child_elements(doc, signed_info, ns::DSIG, ns::node::REFERENCE);
    if references.is_empty() {
        return Err(Error::MissingElement(format!(
            "{} in SignedInfo",
            ns::node::REFERENCE
        )));
    }

    let mut verified = Vec::with_capacity(references.len());
    for node in references {
        let digested = reference::digest_reference(doc, &id_map, node, ctx.debug)?;
        let stored = reference::decode_base64_text(doc, digested.digest_value)?;
        if stored != digested.computed {
            warn!(uri = digested.uri, "reference digest mismatch");
            return Ok(VerifyResult::DigestMismatch {
                uri: digested.uri.to_owned(),
            });
        }
        debug!(uri = digested.uri, "reference digest matches");
        let (namespace, local_name) =
            document::expanded_name(doc, digested.target).unwrap_or_default();
        verified.push(VerifiedReference {
            uri: digested.uri.to_owned(),
            namespace,
            local_name,
        });
    }

    let canonical = reference::canonical_signed_info(doc, signed_info, ctx.debug)?;
    let method = reference::child(doc, signed_info, ns::node::SIGNATURE_METHOD)?;
    let algorithm = sign::from_uri(reference::algorithm_of(
        doc,
        method,
        ns::node::SIGNATURE_METHOD,
    )?)?;
    let value = reference::decode_base64_text(
        doc,
        reference::child(doc, signature, ns::node::SIGNATURE_VALUE)?,
    )?;

    let public = SigningKey::RsaPublic(key.rsa_public_key().clone());
    if !algorithm.verify(&public, &canonical, &value)? {
        warn!(key = key.name.as_deref().unwrap_or("-"), "signature value mismatch");
        return Ok(VerifyResult::SignatureMismatch);
    }

    debug!(references = verified.len(), "signature verified");
    Ok(VerifyResult::Valid {
        references: verified,
    })
}

/// The last `ds:Signature` directly under a `wsse:Security` header, or the
/// last one anywhere in the document.
fn select_signature(doc: &Document<'_>) -> Option<NodeId> {
    let signatures = document::find_elements(doc, ns::DSIG, ns::node::SIGNATURE);
    signatures
        .iter()
        .rev()
        .find(|s| {
            doc.parent(**s)
                .is_some_and(|p| document::is_element(doc, p, ns::WSSE, ns::node::SECURITY))
        })
        .or(signatures.last())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::sign_envelope;
    use crate::tests::{envelope, other_certificate_context, signer_context};

    fn signed() -> String {
        sign_envelope(&signer_context(), envelope().as_bytes()).unwrap()
    }

    fn replace_signature_value(signed: &str, value: &str) -> String {
        let start = signed.find("<ds:SignatureValue>").unwrap() + "<ds:SignatureValue>".len();
        let end = signed.find("</ds:SignatureValue>").unwrap();
        format!("{}{value}{}", &signed[..start], &signed[end..])
    }

    #[test]
    fn test_round_trip() {
        let result = verify_envelope(&signer_context(), signed().as_bytes()).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.reason(), None);
        assert!(result.covers(Some(ns::SOAP11_ENV), ns::node::BODY));
        assert!(!result.covers(Some(ns::WSU), ns::node::TIMESTAMP));
        let VerifyResult::Valid { references } = result else {
            unreachable!()
        };
        assert_eq!(references.len(), 1);
        assert!(references[0].uri.starts_with("#id-"));
    }

    #[test]
    fn test_tampered_body() {
        let tampered = signed().replacen(">OK<", ">NOT OK!<", 1);
        let result = verify_envelope_str(&signer_context(), &tampered).unwrap();
        match &result {
            VerifyResult::DigestMismatch { uri } => assert!(uri.starts_with("#id-")),
            other => panic!("expected digest mismatch, got {other:?}"),
        }
        assert!(!result.covers(Some(ns::SOAP11_ENV), ns::node::BODY));
        assert!(!verify_envelope_bool(&signer_context(), tampered.as_bytes()).unwrap());
    }

    #[test]
    fn test_whitespace_outside_body_is_not_signed() {
        let moved = signed().replacen("<soapenv:Body", "\n\n  <soapenv:Body", 1);
        assert!(verify_envelope_bool(&signer_context(), moved.as_bytes()).unwrap());
    }

    #[test]
    fn test_untrusted_certificate() {
        let result = verify_envelope_str(&other_certificate_context(), &signed()).unwrap();
        assert_eq!(result, VerifyResult::SignatureMismatch);
        assert!(result.reason().unwrap().contains("signature value"));
    }

    #[test]
    fn test_modified_signature_value() {
        let out = signed();
        let doc = soapsig_xml::parse(&out).unwrap();
        let node = document::find_element(&doc, ns::DSIG, ns::node::SIGNATURE_VALUE).unwrap();
        let mut value = reference::decode_base64_text(&doc, node).unwrap();
        value[10] ^= 0x01;
        let flipped = replace_signature_value(&out, &reference::encode_base64(&value));
        assert_eq!(
            verify_envelope_str(&signer_context(), &flipped).unwrap(),
            VerifyResult::SignatureMismatch
        );
    }

    #[test]
    fn test_corrupt_signature_value_is_error() {
        let out = signed();
        let short = replace_signature_value(&out, "AAAA");
        assert!(matches!(
            verify_envelope_str(&signer_context(), &short),
            Err(Error::Crypto(_))
        ));
        let garbage = replace_signature_value(&out, "!!not base64!!");
        assert!(matches!(
            verify_envelope_str(&signer_context(), &garbage),
            Err(Error::Base64(_))
        ));
    }

    #[test]
    fn test_unresolvable_reference_is_error() {
        let out = signed();
        let start = out.find("<ds:Reference URI=\"#").unwrap() + "<ds:Reference URI=\"#".len();
        let broken = format!("{}missing-{}", &out[..start], &out[start..]);
        assert!(matches!(
            verify_envelope_str(&signer_context(), &broken),
            Err(Error::InvalidUri(_))
        ));
    }

    #[test]
    fn test_reference_to_repeated_id_is_error() {
        let out = signed();
        let start = out.find("<ds:Reference URI=\"#").unwrap() + "<ds:Reference URI=\"#".len();
        let end = start + out[start..].find('"').unwrap();
        let body_id = &out[start..end];
        let spoofed = out.replacen(
            "<soapenv:Header>",
            &format!("<soapenv:Header><decoy Id=\"{body_id}\"/>"),
            1,
        );
        assert!(matches!(
            verify_envelope_str(&signer_context(), &spoofed),
            Err(Error::InvalidUri(msg)) if msg.contains("ambiguous")
        ));
    }

    #[test]
    fn test_structural_errors() {
        let ctx = signer_context();
        assert!(matches!(
            verify_envelope_str(&ctx, &envelope()),
            Err(Error::MissingSignature)
        ));
        assert!(matches!(
            verify_envelope(&ctx, b"<soapenv:Envelope><"),
            Err(Error::XmlParse(_))
        ));
        assert!(matches!(
            verify_envelope_str(&WsseContext::new(), &signed()),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_signature_outside_security_is_found() {
        let xml = r#"<r><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature></r>"#;
        let doc = soapsig_xml::parse(xml).unwrap();
        assert!(select_signature(&doc).is_some());
        assert!(matches!(
            verify_envelope_str(&signer_context(), xml),
            Err(Error::MissingElement(_))
        ));
    }

    #[test]
    fn test_registered_id_attribute() {
        let mut ctx = signer_context();
        ctx.add_id_attr("messageId");
        let out = sign_envelope(&ctx, envelope().as_bytes()).unwrap();
        assert!(verify_envelope_bool(&ctx, out.as_bytes()).unwrap());
    }
}
