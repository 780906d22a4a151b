#![forbid(unsafe_code)]

//! WS-Security context: holds keys and configuration for sign and verify.

use soapsig_core::Error;
use soapsig_keys::Key;

/// The inclusive namespace prefix list written into every reference
/// transform unless configured otherwise.
pub const DEFAULT_INCLUSIVE_PREFIXES: &[&str] = &["urn"];

/// Context for WS-Security signing and verification.
///
/// Created once and shared read-only between calls; every sign or verify
/// call parses its own document and keeps its own reference queue.
#[derive(Debug, Clone)]
pub struct WsseContext {
    /// Private key plus certificate used for signing.
    pub signing_key: Option<Key>,
    /// Certificate or public key that incoming signatures must verify
    /// against.  Falls back to the signing key's certificate when unset.
    pub trust_key: Option<Key>,
    /// Additional ID attribute names to register (`Id` and `wsu:Id` are
    /// always registered).  Either a local name or `{namespace}local`.
    pub id_attrs: Vec<String>,
    /// `PrefixList` of the `ec:InclusiveNamespaces` in each reference
    /// transform.  An empty list omits the element.
    pub inclusive_prefixes: Vec<String>,
    /// Log canonical pre-digest and pre-signature bytes at debug level.
    pub debug: bool,
}

impl Default for WsseContext {
    fn default() -> Self {
        Self {
            signing_key: None,
            trust_key: None,
            id_attrs: Vec::new(),
            inclusive_prefixes: DEFAULT_INCLUSIVE_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            debug: false,
        }
    }
}

impl WsseContext {
    /// Create a context with no keys and the default prefix list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that signs with `key` and verifies against its certificate.
    pub fn with_key_pair(key: Key) -> Self {
        Self::new().with_signing_key(key)
    }

    /// Set the signing key.  It must carry a private key and a certificate.
    pub fn with_signing_key(mut self, key: Key) -> Self {
        self.signing_key = Some(key);
        self
    }

    /// Set the key replies are verified against.
    pub fn with_trust_key(mut self, key: Key) -> Self {
        self.trust_key = Some(key);
        self
    }

    /// Replace the inclusive namespace prefix list.
    ///
    /// Each entry must be an XML prefix (an NCName) or `#default`.
    pub fn with_inclusive_prefixes<I, S>(mut self, prefixes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inclusive_prefixes = prefixes.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    /// Check settings that are written into signed output.
    pub fn validate(&self) -> Result<(), Error> {
        match self
            .inclusive_prefixes
            .iter()
            .find(|p| p.as_str() != "#default" && !is_ncname(p))
        {
            Some(prefix) => Err(Error::Config(format!(
                "invalid inclusive namespace prefix: {prefix:?}"
            ))),
            None => Ok(()),
        }
    }

    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }

    /// The signing key and its DER certificate.
    pub(crate) fn signing_material(&self) -> Result<(&Key, &[u8]), Error> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| Error::KeyNotFound("no signing key configured".into()))?;
        if !key.has_private_key() {
            return Err(Error::Key("signing key has no private part".into()));
        }
        let cert = key.require_certificate("the BinarySecurityToken")?;
        Ok((key, cert))
    }

    /// The key used to check incoming signatures.
    pub(crate) fn verification_key(&self) -> Result<&Key, Error> {
        self.trust_key
            .as_ref()
            .or(self.signing_key.as_ref())
            .ok_or_else(|| Error::KeyNotFound("no verification key configured".into()))
    }
}

/// An XML name without a colon.
fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
