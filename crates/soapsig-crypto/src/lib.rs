#![forbid(unsafe_code)]

//! Cryptographic primitives for WS-Security signing.
//!
//! The BinarySecurityToken profile signs with RSA PKCS#1 v1.5 over SHA-1
//! and digests references with SHA-1.  Algorithms are looked up by their
//! XML-DSig URI so that a message naming anything else is rejected.

pub mod digest;
pub mod sign;

pub use digest::DigestAlgorithm;
pub use sign::{SignatureAlgorithm, SigningKey};
