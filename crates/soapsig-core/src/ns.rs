#![forbid(unsafe_code)]

//! XML namespaces used by WS-Security signing.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive C14N namespace (for `InclusiveNamespaces`)
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// WS-Security extension namespace
pub const WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

/// WS-Security utility namespace
pub const WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

/// WS-Security SOAP message security namespace
pub const WSS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#";

/// SOAP 1.1 envelope namespace
pub const SOAP11_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.2 envelope namespace
pub const SOAP12_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace together with the prefix this library binds it to when it
/// writes new elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Ds,
    Ec,
    Wsse,
    Wsu,
    Wss,
    Soap11,
    Soap12,
}

impl Namespace {
    /// The prefix used for newly created elements and attributes.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ds => "ds",
            Self::Ec => "ec",
            Self::Wsse => "wsse",
            Self::Wsu => "wsu",
            Self::Wss => "wss",
            Self::Soap11 | Self::Soap12 => "SOAP-ENV",
        }
    }

    /// The namespace URI.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Ds => DSIG,
            Self::Ec => EXC_C14N,
            Self::Wsse => WSSE,
            Self::Wsu => WSU,
            Self::Wss => WSS,
            Self::Soap11 => SOAP11_ENV,
            Self::Soap12 => SOAP12_ENV,
        }
    }

    /// Look up a namespace by URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            DSIG => Some(Self::Ds),
            EXC_C14N => Some(Self::Ec),
            WSSE => Some(Self::Wsse),
            WSU => Some(Self::Wsu),
            WSS => Some(Self::Wss),
            SOAP11_ENV => Some(Self::Soap11),
            SOAP12_ENV => Some(Self::Soap12),
            _ => None,
        }
    }

    /// The `xmlns:prefix` attribute name that declares this namespace.
    pub fn xmlns(&self) -> String {
        format!("xmlns:{}", self.prefix())
    }

    /// Build `prefix:local`.
    pub fn qname(&self, local_name: &str) -> String {
        format!("{}:{}", self.prefix(), local_name)
    }
}

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // SOAP
    pub const ENVELOPE: &str = "Envelope";
    pub const HEADER: &str = "Header";
    pub const BODY: &str = "Body";

    // WS-Security
    pub const SECURITY: &str = "Security";
    pub const BINARY_SECURITY_TOKEN: &str = "BinarySecurityToken";
    pub const SECURITY_TOKEN_REFERENCE: &str = "SecurityTokenReference";
    pub const WSSE_REFERENCE: &str = "Reference";
    pub const TIMESTAMP: &str = "Timestamp";

    // DSig
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const KEY_INFO: &str = "KeyInfo";

    // Exc C14N
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const ALGORITHM: &str = "Algorithm";
    pub const PREFIX_LIST: &str = "PrefixList";
    pub const VALUE_TYPE: &str = "ValueType";
    pub const ENCODING_TYPE: &str = "EncodingType";
    pub const TOKEN_TYPE: &str = "TokenType";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_uri() {
        for ns in [
            Namespace::Ds,
            Namespace::Ec,
            Namespace::Wsse,
            Namespace::Wsu,
            Namespace::Wss,
            Namespace::Soap11,
            Namespace::Soap12,
        ] {
            assert_eq!(Namespace::from_uri(ns.uri()), Some(ns));
        }
        assert_eq!(Namespace::from_uri("urn:unknown"), None);
    }

    #[test]
    fn test_xmlns_attribute() {
        assert_eq!(Namespace::Ds.xmlns(), "xmlns:ds");
        assert_eq!(Namespace::Wsu.qname("Id"), "wsu:Id");
    }
}
