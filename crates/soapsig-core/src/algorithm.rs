#![forbid(unsafe_code)]

//! Algorithm and token-type URI constants.
//!
//! These strings appear verbatim in `Algorithm`, `ValueType` and
//! `EncodingType` attributes and must match the W3C and OASIS documents
//! byte for byte.

// ── Canonicalization ─────────────────────────────────────────────────

pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

// ── Digest algorithms ────────────────────────────────────────────────

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

// ── Signature algorithms ─────────────────────────────────────────────

pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";

// ── WS-Security token profile ────────────────────────────────────────

/// `ValueType` of an X.509v3 `BinarySecurityToken`.
pub const X509V3_TOKEN_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";

/// `EncodingType` of a base64 `BinarySecurityToken`.
pub const BASE64_BINARY: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
