#![forbid(unsafe_code)]

/// Errors produced while signing or verifying SOAP envelopes.
///
/// A signature that simply fails to validate is not an error; the
/// verifier reports that through its result type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("SOAP envelope has no Body element")]
    MissingBody,

    #[error("no Signature element found")]
    MissingSignature,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("certification failed: {0}")]
    Certification(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error comes from unusable key or certificate material.
    pub fn is_key_material(&self) -> bool {
        matches!(
            self,
            Error::Key(_) | Error::KeyNotFound(_) | Error::Certificate(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
