//! Output path resolution for build modules.
//!
//! Each module builds into an isolated directory under the root build
//! directory. The resolver replaces the kind of process-wide mutable
//! build-dir state a build script would set up with an explicit root
//! path parameter.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resolves per-module output directories under a root build directory.
///
/// `resolve` is pure given a module name; results are cached for the
/// resolver's lifetime. Distinct module names always map to distinct,
/// non-overlapping paths because names containing path separators or
/// traversal components are rejected.
#[derive(Debug, Clone)]
pub struct OutputPathResolver {
    root: PathBuf,
    cache: HashMap<String, PathBuf>,
}

impl OutputPathResolver {
    /// Create a resolver rooted at the given build directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// The root build directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the output directory for a module: `root/module_name`.
    ///
    /// # Errors
    /// Returns `InvalidModuleName` for empty names or names that would
    /// escape the root (separators, `.` / `..` components).
    pub fn resolve(&mut self, module_name: &str) -> Result<PathBuf> {
        if let Some(path) = self.cache.get(module_name) {
            return Ok(path.clone());
        }
        validate_name(module_name)?;
        let path = self.root.join(module_name);
        self.cache.insert(module_name.to_string(), path.clone());
        Ok(path)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(Error::InvalidModuleName(name.to_string()));
    }
    Ok(())
}
