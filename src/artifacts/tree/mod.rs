//! Tree navigation
//!
//! - `resolver`: walking a root tree down to a path, listing and traversing
//! - `blob_stream`: forward-only, chunked blob readers

pub mod blob_stream;
pub mod resolver;
