#![forbid(unsafe_code)]

//! WS-Security signing for SOAP envelopes.
//!
//! Signs the SOAP `Body` (and any `wsu:Timestamp` in an existing
//! `wsse:Security` header) with RSA-SHA1 over Exclusive XML
//! Canonicalization, carrying the signer's X.509 certificate in a
//! `wsse:BinarySecurityToken`.  Verification checks every reference digest
//! and the signature value against a trusted certificate.

pub mod context;
pub mod envelope;
pub mod plugin;
pub mod queue;
mod reference;
pub mod sign;
pub mod verify;

pub use context::WsseContext;
pub use envelope::SoapEnvelope;
pub use plugin::{MessagePlugin, WssePlugin};
pub use queue::{Marker, SignQueue};
pub use sign::{sign_envelope, sign_envelope_str};
pub use verify::{
    verify_envelope, verify_envelope_bool, verify_envelope_str, VerifiedReference, VerifyResult,
};
