//! CLI command implementations.
//!
//! - [`merge`] - merge a tile pyramid into one image

pub mod merge;
