#![forbid(unsafe_code)]

//! Transport hook that signs outgoing requests and checks replies.

use crate::context::WsseContext;
use crate::{sign, verify};
use soapsig_core::Error;
use soapsig_keys::loader;
use std::path::Path;
use tracing::debug;

/// Hooks a SOAP client calls around each exchange.
pub trait MessagePlugin: Send + Sync {
    /// Transform an outgoing envelope before it is sent.
    fn sending(&self, envelope: &[u8]) -> Result<String, Error>;

    /// Inspect a reply before it is handed to the caller.
    fn received(&self, reply: &[u8]) -> Result<(), Error>;
}

/// Signs requests and requires replies to carry a valid signature.
#[derive(Debug, Clone)]
pub struct WssePlugin {
    ctx: WsseContext,
}

impl WssePlugin {
    pub fn new(ctx: WsseContext) -> Self {
        Self { ctx }
    }

    /// Plugin keyed from one PEM file holding the certificate and private
    /// key.  Replies are verified against the same certificate.
    pub fn from_key_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let key = loader::load_key_file(path.as_ref())?;
        Ok(Self::new(WsseContext::with_key_pair(key)))
    }

    pub fn context(&self) -> &WsseContext {
        &self.ctx
    }
}

impl MessagePlugin for WssePlugin {
    fn sending(&self, envelope: &[u8]) -> Result<String, Error> {
        sign::sign_envelope(&self.ctx, envelope)
    }

    fn received(&self, reply: &[u8]) -> Result<(), Error> {
        if reply.iter().all(u8::is_ascii_whitespace) {
            debug!("empty reply, skipping signature check");
            return Ok(());
        }
        let result = verify::verify_envelope(&self.ctx, reply)?;
        match result.reason() {
            None => Ok(()),
            Some(reason) => Err(Error::Certification(format!(
                "failed to verify response: {reason}"
            ))),
        }
    }
}
