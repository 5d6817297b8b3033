//! The injected path resolution capability.
//!
//! Path guard correctness depends on comparing like with like: both the
//! allowlist prefixes and the extracted candidates go through the same
//! resolver before matching. The resolver is injected so tests (and
//! hosts with virtual filesystems) can stub it; it must be thread-safe
//! and is called synchronously.

use std::io;
use std::path::{Path, PathBuf};

/// Resolve a raw path string to an absolute path.
pub trait PathResolver: Send + Sync {
    /// Resolve `raw` to an absolute form.
    ///
    /// # Errors
    ///
    /// Implementations may fail for unresolvable paths; the guard drops
    /// the affected candidate or prefix.
    fn resolve(&self, raw: &str) -> io::Result<PathBuf>;
}

/// Resolver backed by the real filesystem.
///
/// Canonicalizes when the path exists (following symlinks); otherwise
/// falls back to lexical absolutization so allowlists can cover paths
/// that are about to be created.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeResolver;

impl PathResolver for NativeResolver {
    fn resolve(&self, raw: &str) -> io::Result<PathBuf> {
        let path = Path::new(raw);
        match std::fs::canonicalize(path) {
            Ok(resolved) => Ok(resolved),
            Err(_) => std::path::absolute(path),
        }
    }
}
