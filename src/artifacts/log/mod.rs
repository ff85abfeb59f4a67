//! Commit history traversal
//!
//! - `rev_list`: lazy, newest-first ancestry walks with path and message
//!   filters and offset pagination
//!
//! ## Algorithm
//!
//! The traversal uses a priority queue ordered by commit timestamp. Every
//! commit is visited once even when several children reach it, and the walk
//! only reads as much history as the caller pulls.

pub mod rev_list;
