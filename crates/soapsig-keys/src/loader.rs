#![forbid(unsafe_code)]

//! Key loading from PEM and DER.

use crate::key::Key;
use soapsig_core::Error;
use tracing::debug;

/// Load an RSA private key from PEM data (PKCS#8 or PKCS#1).
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let (label, der) = decode_pem(pem_data)?;
    private_key_from_der(label, &der)
}

/// Load an RSA private key from DER data (PKCS#8 or PKCS#1).
pub fn load_rsa_private_der(der: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(Key::rsa_private(pk));
    }
    let pk = rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key DER: {e}")))?;
    Ok(Key::rsa_private(pk))
}

/// Load an RSA public key from PEM data (SPKI or PKCS#1).
pub fn load_rsa_public_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let (label, der) = decode_pem(pem_data)?;
    public_key_from_der(label, &der)
}

/// Load a public key from a PEM-encoded X.509 certificate.
pub fn load_x509_cert_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let (label, der) = decode_pem(pem_data)?;
    if label != "CERTIFICATE" {
        return Err(Error::Certificate(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }
    load_x509_cert_der(&der)
}

/// Load a public key from a DER-encoded X.509 certificate.
///
/// The certificate itself is kept as the head of the key's chain so it can
/// be embedded in a `BinarySecurityToken`.
pub fn load_x509_cert_der(data: &[u8]) -> Result<Key, Error> {
    let public = certificate_public_key(data)?;
    Ok(Key::rsa_public(public).with_certificate(data.to_vec()))
}

/// Extract the RSA public key from a DER-encoded X.509 certificate.
pub fn certificate_public_key(data: &[u8]) -> Result<rsa::RsaPublicKey, Error> {
    use der::{Decode, Encode};
    use spki::DecodePublicKey;
    use x509_cert::Certificate;

    let cert = Certificate::from_der(data)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
    rsa::RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| Error::Certificate(format!("certificate key is not RSA: {e}")))
}

/// Load a combined PEM bundle: one private key plus one or more
/// certificates, leaf first.
///
/// The private key must belong to the leaf certificate.
pub fn load_pem_bundle(pem_data: &[u8]) -> Result<Key, Error> {
    let text = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    let mut private: Option<Key> = None;
    let mut chain: Vec<Vec<u8>> = Vec::new();
    for block in pem_blocks(text) {
        let (label, der) = decode_pem(block.as_bytes())?;
        match label {
            "CERTIFICATE" => chain.push(der),
            "PRIVATE KEY" | "RSA PRIVATE KEY" => {
                if private.is_some() {
                    return Err(Error::Key("PEM bundle holds more than one private key".into()));
                }
                private = Some(private_key_from_der(label, &der)?);
            }
            other => debug!(label = other, "skipping PEM block"),
        }
    }

    let mut key = private.ok_or_else(|| Error::KeyNotFound("no private key in PEM bundle".into()))?;
    let leaf = chain
        .first()
        .ok_or_else(|| Error::KeyNotFound("no certificate in PEM bundle".into()))?;
    if certificate_public_key(leaf)? != *key.rsa_public_key() {
        return Err(Error::Key(
            "private key does not match the bundle certificate".into(),
        ));
    }
    key.x509_chain = chain;
    Ok(key)
}

/// Load key material from PEM, auto-detecting what the blocks hold.
///
/// A file with both a certificate and a private key is treated as a bundle.
pub fn load_pem_auto(pem_data: &[u8]) -> Result<Key, Error> {
    let text = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;
    let blocks = pem_blocks(text);
    if blocks.len() > 1 {
        return load_pem_bundle(pem_data);
    }
    let block = blocks
        .first()
        .ok_or_else(|| Error::Key("no PEM block found".into()))?;
    let (label, der) = decode_pem(block.as_bytes())?;
    match label {
        "CERTIFICATE" => load_x509_cert_der(&der),
        "PRIVATE KEY" | "RSA PRIVATE KEY" => private_key_from_der(label, &der),
        "PUBLIC KEY" | "RSA PUBLIC KEY" => public_key_from_der(label, &der),
        other => Err(Error::Key(format!("unsupported PEM label: {other}"))),
    }
}

/// Load key material from PEM or DER bytes.
pub fn load_key_bytes(data: &[u8]) -> Result<Key, Error> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if data[start..].starts_with(b"-----BEGIN") {
        return load_pem_auto(data);
    }
    if let Ok(key) = load_x509_cert_der(data) {
        return Ok(key);
    }
    if let Ok(key) = load_rsa_private_der(data) {
        return Ok(key);
    }
    use spki::DecodePublicKey;
    rsa::RsaPublicKey::from_public_key_der(data)
        .map(Key::rsa_public)
        .map_err(|_| Error::Key("unable to auto-detect key format".into()))
}

/// Load a key from a file, auto-detecting format.
pub fn load_key_file(path: &std::path::Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(path = %path.display(), "loading key material");
    Ok(load_key_bytes(&data)?.with_name(name))
}

fn decode_pem(pem_data: &[u8]) -> Result<(&str, Vec<u8>), Error> {
    let text = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;
    // Leading and trailing blank lines are common in hand-edited files.
    pem_rfc7468::decode_vec(text.trim().as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode PEM: {e}")))
}

fn private_key_from_der(label: &str, der: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    let pk = match label {
        "PRIVATE KEY" => rsa::RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| Error::Key(format!("failed to parse PKCS#8 RSA private key: {e}")))?,
        "RSA PRIVATE KEY" => rsa::RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| Error::Key(format!("failed to parse PKCS#1 RSA private key: {e}")))?,
        other => {
            return Err(Error::Key(format!(
                "expected a private key PEM label, got: {other}"
            )))
        }
    };
    Ok(Key::rsa_private(pk))
}

fn public_key_from_der(label: &str, der: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPublicKey;
    use spki::DecodePublicKey;

    let pk = match label {
        "PUBLIC KEY" => rsa::RsaPublicKey::from_public_key_der(der)
            .map_err(|e| Error::Key(format!("failed to parse SPKI RSA public key: {e}")))?,
        "RSA PUBLIC KEY" => rsa::RsaPublicKey::from_pkcs1_der(der)
            .map_err(|e| Error::Key(format!("failed to parse PKCS#1 RSA public key: {e}")))?,
        other => {
            return Err(Error::Key(format!(
                "expected a public key PEM label, got: {other}"
            )))
        }
    };
    Ok(Key::rsa_public(pk))
}

/// Split text into its `-----BEGIN ...-----` / `-----END ...-----` blocks.
fn pem_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(begin) = rest.find("-----BEGIN ") {
        let after_begin = &rest[begin..];
        let Some(end) = after_begin.find("-----END ") else {
            break;
        };
        let tail = &after_begin[end + "-----END ".len()..];
        let Some(close) = tail.find("-----") else {
            break;
        };
        let block_len = end + "-----END ".len() + close + "-----".len();
        blocks.push(&after_begin[..block_len]);
        rest = &after_begin[block_len..];
    }
    blocks
}
