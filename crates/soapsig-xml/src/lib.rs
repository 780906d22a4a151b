#![forbid(unsafe_code)]

//! XML document handling for SOAP message signing.
//!
//! Canonicalization, identifier resolution and verification work on an
//! `uppsala` DOM.  New fragments are serialized with `uppsala`'s
//! `XmlWriter`.  The `tree` module exposes the byte positions that
//! `roxmltree` records, which is where signing splices those fragments in.

pub mod document;
pub mod nodeset;
pub mod tree;
pub mod writer;
pub mod xpath;

pub use document::{IdMap, XmlDocument};
pub use nodeset::NodeSet;
pub use uppsala::{Document, NodeId};
pub use writer::XmlWriter;

/// Return roxmltree parsing options for SOAP messages.
///
/// SOAP messages must not carry a document type declaration, so DTDs are
/// rejected at parse time.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` into an `uppsala` DOM.
pub fn parse(text: &str) -> Result<Document<'_>, soapsig_core::Error> {
    uppsala::parse(text).map_err(|e| soapsig_core::Error::XmlParse(e.to_string()))
}

/// Parse `text` into a positional `roxmltree` tree with [`parsing_options`].
pub fn parse_tree(text: &str) -> Result<roxmltree::Document<'_>, soapsig_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| soapsig_core::Error::XmlParse(e.to_string()))
}
