#![forbid(unsafe_code)]

//! Signature algorithm implementations.

use rsa::traits::PublicKeyParts;
use signature::{SignatureEncoding, Signer, Verifier};
use soapsig_core::{algorithm, Error};

/// Key material for signature operations.
#[derive(Debug, Clone)]
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
}

impl SigningKey {
    /// The public half of the key.
    pub fn public_key(&self) -> rsa::RsaPublicKey {
        match self {
            Self::Rsa(pk) => pk.to_public_key(),
            Self::RsaPublic(pk) => pk.clone(),
        }
    }
}

/// Trait for signature algorithms.
pub trait SignatureAlgorithm: Send {
    fn uri(&self) -> &'static str;
    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error>;
    /// `Ok(false)` means the signature does not match; `Err` means it could
    /// not be checked at all.
    fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    match uri {
        algorithm::RSA_SHA1 => Ok(Box::new(RsaPkcs1v15Sha1)),
        _ => Err(Error::UnsupportedAlgorithm(format!(
            "signature algorithm: {uri}"
        ))),
    }
}

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

/// RSA PKCS#1 v1.5 signatures over SHA-1.
pub struct RsaPkcs1v15Sha1;

impl SignatureAlgorithm for RsaPkcs1v15Sha1 {
    fn uri(&self) -> &'static str {
        algorithm::RSA_SHA1
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        let SigningKey::Rsa(private_key) = key else {
            return Err(Error::Key("RSA private key required for signing".into()));
        };
        let sk = rsa::pkcs1v15::SigningKey::<sha1::Sha1>::new(private_key.clone());
        let sig = sk
            .try_sign(data)
            .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
        Ok(sig.to_vec())
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        let public_key = key.public_key();
        if sig_bytes.len() != public_key.size() {
            return Err(Error::Crypto(format!(
                "RSA signature is {} bytes, key modulus is {}",
                sig_bytes.len(),
                public_key.size()
            )));
        }
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        let vk = rsa::pkcs1v15::VerifyingKey::<sha1::Sha1>::new(public_key);
        Ok(vk.verify(data, &sig).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePrivateKey;

    fn test_key() -> rsa::RsaPrivateKey {
        rsa::RsaPrivateKey::from_pkcs8_pem(include_str!(
            "../../soapsig-wsse/testdata/signer-key.pem"
        ))
        .unwrap()
    }

    fn other_key() -> rsa::RsaPrivateKey {
        rsa::RsaPrivateKey::from_pkcs8_pem(include_str!(
            "../../soapsig-wsse/testdata/other-key.pem"
        ))
        .unwrap()
    }

    #[test]
    fn test_sign_verify() {
        let alg = from_uri(algorithm::RSA_SHA1).unwrap();
        let key = SigningKey::Rsa(test_key());
        let sig = alg.sign(&key, b"signed info").unwrap();
        assert_eq!(sig.len(), 256);
        // PKCS#1 v1.5 is deterministic.
        assert_eq!(sig, alg.sign(&key, b"signed info").unwrap());

        let public = SigningKey::RsaPublic(key.public_key());
        assert!(alg.verify(&public, b"signed info", &sig).unwrap());
        assert!(!alg.verify(&public, b"signed inf0", &sig).unwrap());
    }

    #[test]
    fn test_wrong_key_does_not_verify() {
        let alg = from_uri(algorithm::RSA_SHA1).unwrap();
        let sig = alg.sign(&SigningKey::Rsa(test_key()), b"data").unwrap();
        let other = SigningKey::RsaPublic(other_key().to_public_key());
        assert!(!alg.verify(&other, b"data", &sig).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_error() {
        let alg = from_uri(algorithm::RSA_SHA1).unwrap();
        let key = SigningKey::Rsa(test_key());
        assert!(matches!(
            alg.verify(&key, b"data", &[1, 2, 3]),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_public_key_cannot_sign() {
        let alg = from_uri(algorithm::RSA_SHA1).unwrap();
        let key = SigningKey::RsaPublic(test_key().to_public_key());
        assert!(matches!(alg.sign(&key, b"data"), Err(Error::Key(_))));
    }

    #[test]
    fn test_unsupported_uri() {
        assert!(matches!(
            from_uri("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
