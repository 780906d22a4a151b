#![forbid(unsafe_code)]

//! Core types shared by the soapsig crates: the error type, algorithm
//! URIs and the WS-Security / XML-DSig namespace table.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
pub use ns::Namespace;
