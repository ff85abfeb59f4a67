//! Core repository components
//!
//! This module contains the stores that sit on top of an on-disk repository:
//!
//! - `database`: Object database reading loose and packed objects
//! - `pack`: Pack files, pack indexes and delta application
//! - `refs`: Reference lookup (branches, HEAD, tags, packed-refs)
//! - `repository`: The shareable handle exposing every read operation

pub mod database;
pub mod pack;
pub mod refs;
pub mod repository;
