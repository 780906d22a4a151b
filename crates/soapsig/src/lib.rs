#![forbid(unsafe_code)]

//! Sign and verify SOAP envelopes with WS-Security X.509
//! BinarySecurityTokens.
//!
//! ```no_run
//! use soapsig::keys::loader;
//! use soapsig::wsse::{sign_envelope, verify_envelope, WsseContext};
//!
//! let key = loader::load_key_file("client.pem".as_ref())?;
//! let ctx = WsseContext::with_key_pair(key);
//! let signed = sign_envelope(&ctx, b"<soapenv:Envelope ...")?;
//! assert!(verify_envelope(&ctx, signed.as_bytes())?.is_valid());
//! # Ok::<(), soapsig::core::Error>(())
//! ```

pub use soapsig_c14n as c14n;
pub use soapsig_core as core;
pub use soapsig_crypto as crypto;
pub use soapsig_keys as keys;
pub use soapsig_transforms as transforms;
pub use soapsig_wsse as wsse;
pub use soapsig_xml as xml;

pub use soapsig_core::Error;
pub use soapsig_wsse::{
    sign_envelope, verify_envelope, verify_envelope_bool, MessagePlugin, VerifyResult,
    WsseContext, WssePlugin,
};
