#![forbid(unsafe_code)]

//! Envelope signing.
//!
//! Signing runs in three passes over the envelope text.  The first marks
//! the signed elements and writes the `BinarySecurityToken` and an empty
//! `ds:Signature`; the second digests the marked elements as they appear
//! in the re-parsed envelope; the third canonicalizes the completed
//! `SignedInfo` and writes the `SignatureValue`.

use crate::context::WsseContext;
use crate::envelope::{self, SecurityContent, SoapEnvelope};
use crate::queue::{self, SignQueue};
use crate::reference;
use soapsig_core::{ns, Error, Namespace};
use soapsig_crypto::sign;
use soapsig_xml::{tree, XmlDocument, XmlWriter};
use tracing::{debug, info};

/// Sign a SOAP envelope.
///
/// The `Body` and every `wsu:Timestamp` in an existing `wsse:Security`
/// header are referenced from the signature, in that order.  The signing
/// certificate travels in a `BinarySecurityToken` that the signature's
/// `KeyInfo` points at.
pub fn sign_envelope(ctx: &WsseContext, envelope: &[u8]) -> Result<String, Error> {
    let text = std::str::from_utf8(envelope)
        .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
    sign_envelope_str(ctx, text)
}

/// Sign a SOAP envelope given as text.  See [`sign_envelope`].
pub fn sign_envelope_str(ctx: &WsseContext, envelope: &str) -> Result<String, Error> {
    ctx.validate()?;
    let signature_id = format!("SIG-{}", uuid::Uuid::new_v4());
    let mut queue = SignQueue::new();

    let marked = insert_skeleton(ctx, envelope, &signature_id, &mut queue)?;
    let digested = queue.fill_digests(&with_id_attrs(ctx, marked)?, &signature_id, ctx.debug)?;
    let signed = fill_signature_value(ctx, digested, &signature_id)?;

    info!(
        signature = %signature_id,
        references = queue.len(),
        "signed SOAP envelope"
    );
    Ok(signed)
}

/// Mark the elements to sign and insert the token and signature template.
fn insert_skeleton(
    ctx: &WsseContext,
    envelope: &str,
    signature_id: &str,
    queue: &mut SignQueue,
) -> Result<String, Error> {
    let doc = soapsig_xml::parse_tree(envelope)?;
    let env = SoapEnvelope::locate(&doc)?;
    let (_, cert_der) = ctx.signing_material()?;

    let mut edits = vec![queue.enqueue(envelope, env.body)?];
    for timestamp in env.timestamps() {
        edits.push(queue.enqueue(envelope, timestamp)?);
    }

    let token_id = queue::new_id();
    let mut content = SecurityContent {
        cert_der,
        token_id: &token_id,
        signature_id,
        token_declarations: Vec::new(),
        key_info_declarations: Vec::new(),
    };

    let mut w = XmlWriter::new();
    match (env.security, env.header) {
        (Some(security), _) => {
            content.token_declarations =
                envelope::missing_declarations(security, &[Namespace::Wsse, Namespace::Wsu]);
            content.key_info_declarations =
                envelope::missing_declarations(security, &[Namespace::Wsse]);
            content.write(&mut w, queue, &ctx.inclusive_prefixes);
            edits.push(envelope::append_child(envelope, security, w.into_string()));
        }
        (None, Some(header)) => {
            envelope::write_security(&mut w, &content, queue, &ctx.inclusive_prefixes);
            edits.push(envelope::append_child(envelope, header, w.into_string()));
        }
        (None, None) => {
            debug!("envelope has no Header, creating one");
            let header = env.header_name(envelope);
            w.start_element(&header, &[]);
            envelope::write_security(&mut w, &content, queue, &ctx.inclusive_prefixes);
            w.end_element(&header);
            edits.push(envelope::insert_before(env.body, w.into_string()));
        }
    }
    envelope::splice(envelope, edits)
}

fn fill_signature_value(
    ctx: &WsseContext,
    digested: String,
    signature_id: &str,
) -> Result<String, Error> {
    let (key, _) = ctx.signing_material()?;
    let xml = with_id_attrs(ctx, digested)?;
    let doc = xml.parse_doc()?;
    let id_map = xml.build_id_map(&doc);
    let signature = id_map.resolve(signature_id)?;
    let signed_info = reference::child(&doc, signature, ns::node::SIGNED_INFO)?;

    let canonical = reference::canonical_signed_info(&doc, signed_info, ctx.debug)?;
    let method = reference::child(&doc, signed_info, ns::node::SIGNATURE_METHOD)?;
    let algorithm = sign::from_uri(reference::algorithm_of(
        &doc,
        method,
        ns::node::SIGNATURE_METHOD,
    )?)?;
    let value = algorithm.sign(&key.to_signing_key(), &canonical)?;

    let source = xml.text();
    let tree = xml.parse_tree()?;
    let value_node = tree::find_by_attribute(
        &tree,
        ns::DSIG,
        ns::node::SIGNATURE,
        ns::attr::ID,
        signature_id,
    )
    .and_then(|s| tree::find_child_element(s, ns::DSIG, ns::node::SIGNATURE_VALUE))
    .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE_VALUE.into()))?;
    let mut w = XmlWriter::new();
    w.text_element(
        tree::written_name(source, value_node),
        &[],
        &reference::encode_base64(&value),
    );
    envelope::splice(source, vec![envelope::replace_node(value_node, w.into_string())])
}

fn with_id_attrs(ctx: &WsseContext, text: String) -> Result<XmlDocument, Error> {
    let mut xml = XmlDocument::parse(text)?;
    for name in &ctx.id_attrs {
        xml.add_id_attr(name);
    }
    Ok(xml)
}
