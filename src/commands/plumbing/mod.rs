//! Plumbing commands (low-level object access)
//!
//! Plumbing commands provide direct access to Git's internal data structures.
//! They're primarily used for scripting and debugging a repository.
//!
//! ## Commands
//!
//! - `cat-file`: Print the type, size or content of an object
//! - `ls-tree`: List contents of a tree object
//! - `rev-parse`: Resolve revision expressions to object ids

pub mod cat_file;
pub mod ls_tree;
pub mod rev_parse;
