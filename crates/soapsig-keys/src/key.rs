#![forbid(unsafe_code)]

//! Key types and data structures.

use soapsig_core::Error;
use soapsig_crypto::sign::SigningKey;

/// Usage flags for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Sign,
    Verify,
    Any,
}

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private, .. } => {
                if private.is_some() {
                    write!(f, "RSA private+public key")
                } else {
                    write!(f, "RSA public key")
                }
            }
        }
    }
}

/// A named key with an optional certificate chain.
#[derive(Debug, Clone)]
pub struct Key {
    /// Optional name, used in log output.
    pub name: Option<String>,
    /// The key data.
    pub data: KeyData,
    /// The intended usage.
    pub usage: KeyUsage,
    /// X.509 certificate chain (DER-encoded), leaf first.
    pub x509_chain: Vec<Vec<u8>>,
}

impl Key {
    /// Create a new key.
    pub fn new(data: KeyData, usage: KeyUsage) -> Self {
        Self {
            name: None,
            data,
            usage,
            x509_chain: Vec::new(),
        }
    }

    /// Wrap an RSA private key.
    pub fn rsa_private(private: rsa::RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self::new(
            KeyData::Rsa {
                private: Some(private),
                public,
            },
            KeyUsage::Any,
        )
    }

    /// Wrap an RSA public key.
    pub fn rsa_public(public: rsa::RsaPublicKey) -> Self {
        Self::new(
            KeyData::Rsa {
                private: None,
                public,
            },
            KeyUsage::Verify,
        )
    }

    /// Set the key name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a DER certificate to the front of the chain.
    pub fn with_certificate(mut self, der: Vec<u8>) -> Self {
        self.x509_chain.insert(0, der);
        self
    }

    /// Convert to a `SigningKey` for use with crypto algorithms.
    ///
    /// Returns the private key when present, otherwise the public key.
    pub fn to_signing_key(&self) -> SigningKey {
        match &self.data {
            KeyData::Rsa {
                private: Some(pk), ..
            } => SigningKey::Rsa(pk.clone()),
            KeyData::Rsa { public, .. } => SigningKey::RsaPublic(public.clone()),
        }
    }

    /// Get the RSA public key.
    pub fn rsa_public_key(&self) -> &rsa::RsaPublicKey {
        match &self.data {
            KeyData::Rsa { public, .. } => public,
        }
    }

    /// Get the RSA private key if available.
    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match &self.data {
            KeyData::Rsa { private, .. } => private.as_ref(),
        }
    }

    /// Whether this key can produce signatures.
    pub fn has_private_key(&self) -> bool {
        self.rsa_private_key().is_some()
    }

    /// The leaf certificate, DER-encoded.
    pub fn certificate_der(&self) -> Option<&[u8]> {
        self.x509_chain.first().map(Vec::as_slice)
    }

    /// The leaf certificate, or `Error::KeyNotFound` naming `purpose`.
    pub fn require_certificate(&self, purpose: &str) -> Result<&[u8], Error> {
        self.certificate_der().ok_or_else(|| {
            Error::KeyNotFound(format!("no X.509 certificate available for {purpose}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePrivateKey;

    fn private() -> rsa::RsaPrivateKey {
        rsa::RsaPrivateKey::from_pkcs8_pem(include_str!(
            "../../soapsig-wsse/testdata/signer-key.pem"
        ))
        .unwrap()
    }

    #[test]
    fn test_signing_key_prefers_private() {
        let key = Key::rsa_private(private());
        assert!(key.has_private_key());
        assert!(matches!(key.to_signing_key(), SigningKey::Rsa(_)));

        let public = Key::rsa_public(key.rsa_public_key().clone());
        assert!(!public.has_private_key());
        assert!(matches!(public.to_signing_key(), SigningKey::RsaPublic(_)));
        assert_eq!(public.usage, KeyUsage::Verify);
    }

    #[test]
    fn test_certificate_chain_order() {
        let key = Key::rsa_private(private())
            .with_certificate(vec![2])
            .with_certificate(vec![1])
            .with_name("signer");
        assert_eq!(key.certificate_der(), Some(&[1u8][..]));
        assert_eq!(key.x509_chain.len(), 2);
        assert_eq!(key.name.as_deref(), Some("signer"));

        let bare = Key::rsa_private(private());
        assert!(matches!(
            bare.require_certificate("signing"),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_debug_does_not_print_key_material() {
        let key = Key::rsa_private(private());
        assert_eq!(format!("{:?}", key.data), "RSA private+public key");
    }
}
