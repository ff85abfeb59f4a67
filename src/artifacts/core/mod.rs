//! Core utilities and shared types
//!
//! This module contains shared utilities used across the engine and the CLI.

use crate::errors::{Error, Result};
use derive_new::new;
use minus::Pager;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag for long traversals
///
/// Clones share the same flag. Walks check it between commits and stop with
/// `Error::Aborted` once it is raised.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }
}

/// Wrapper that implements `Write` for the minus pager
///
/// The minus pager doesn't implement `std::io::Write` directly, so this wrapper
/// adapts it to be compatible with Rust's standard I/O traits. This allows
/// using the pager as a drop-in replacement for stdout in commands that produce
/// long output.
///
/// ## Usage
///
/// ```ignore
/// let pager = Pager::new();
/// let mut writer = PagerWriter::new(pager.clone());
/// writeln!(writer, "Some long output...")?;
/// page_all(pager)?;
/// ```
#[derive(new)]
pub struct PagerWriter {
    pager: Pager,
}

impl PagerWriter {
    pub fn pager(&self) -> &Pager {
        &self.pager
    }
}

impl Write for PagerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // blob content may be arbitrary bytes
        let s = String::from_utf8_lossy(buf);
        self.pager.push_str(s).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_abort_flag() {
        let signal = AbortSignal::new();
        let observer = signal.clone();

        assert!(observer.check().is_ok());
        signal.abort();
        assert!(observer.is_aborted());
        assert!(matches!(observer.check(), Err(Error::Aborted)));
    }
}
