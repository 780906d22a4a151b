#![forbid(unsafe_code)]

//! Reference transform chain.
//!
//! Each `ds:Reference` carries a sequence of transforms applied in order
//! to the referenced node set before digesting.  WS-Security references
//! use a single Exclusive C14N transform.

pub mod pipeline;

pub use pipeline::{C14nTransform, Transform, TransformData, TransformPipeline};
