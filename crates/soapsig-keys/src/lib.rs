#![forbid(unsafe_code)]

//! Key material for WS-Security signing.
//!
//! Loads RSA private and public keys, X.509 certificates and combined
//! certificate + key PEM bundles from PEM or DER.

pub mod certificate;
pub mod key;
pub mod loader;

pub use certificate::CertificateInfo;
pub use key::{Key, KeyData, KeyUsage};
