#![forbid(unsafe_code)]

//! Same-document URI references.
//!
//! WS-Security references only ever point at elements in the same message,
//! either as a bare fragment (`#id-...`) or as an `xpointer(id('...'))`.

use crate::IdMap;
use soapsig_core::Error;
use uppsala::NodeId;

/// Parse a same-document reference (e.g., `#foo` → `foo`).
///
/// `#xpointer(id('foo'))` is accepted as an alias for `#foo`.
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    let fragment = uri.strip_prefix('#')?;
    if fragment.is_empty() {
        return None;
    }
    Some(parse_xpointer_id(fragment).unwrap_or(fragment))
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id('")?;
    inner.strip_suffix("'))")
}

/// Resolve a same-document URI (`#id`) to its element.
///
/// A value carried by more than one element does not resolve.
pub fn resolve_uri(id_map: &IdMap, uri: &str) -> Result<NodeId, Error> {
    let id = parse_same_document_ref(uri)
        .ok_or_else(|| Error::InvalidUri(format!("not a same-document reference: {uri:?}")))?;
    id_map.resolve(id)
}
