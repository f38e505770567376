//! Named file sets, resolved by globbing relative to the project root.

use glob::{GlobError, MatchOptions, PatternError};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileSetError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    GlobPattern {
        pattern: String,
        #[source]
        source: PatternError,
    },
    #[error("Failed to expand glob: {0}")]
    GlobExpansion(#[from] GlobError),
    #[error("Unknown file set '{0}'")]
    Unknown(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct FileSetDef {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// File set declarations plus the root their patterns are relative to.
#[derive(Debug, Clone)]
pub struct FileSets {
    root: PathBuf,
    defs: HashMap<String, FileSetDef>,
}

impl FileSets {
    pub fn new(root: impl Into<PathBuf>, defs: HashMap<String, FileSetDef>) -> Self {
        Self {
            root: root.into(),
            defs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Resolves a file set against the filesystem as it is right now.
    ///
    /// Included sets come first, in declared order, followed by the set's own
    /// patterns. Paths are relative to the root and appear once, at their first
    /// position.
    pub fn resolve(&self, name: &str) -> Result<Vec<PathBuf>, FileSetError> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut visiting = Vec::new();
        self.resolve_into(name, &mut result, &mut seen, &mut visiting)?;
        log::debug!("File set '{}' resolved to {} file(s)", name, result.len());
        Ok(result)
    }

    fn resolve_into(
        &self,
        name: &str,
        result: &mut Vec<PathBuf>,
        seen: &mut HashSet<PathBuf>,
        visiting: &mut Vec<String>,
    ) -> Result<(), FileSetError> {
        let def = self
            .defs
            .get(name)
            .ok_or_else(|| FileSetError::Unknown(name.to_string()))?;

        // Include cycles are rejected at load time; this only guards direct resolution.
        if visiting.iter().any(|n| n == name) {
            return Ok(());
        }
        visiting.push(name.to_string());

        for include in &def.include {
            self.resolve_into(include, result, seen, visiting)?;
        }

        for pattern in &def.patterns {
            for path in resolve_pattern(&self.root, pattern)? {
                if seen.insert(path.clone()) {
                    result.push(path);
                }
            }
        }

        visiting.pop();
        Ok(())
    }
}

/// Expands one glob pattern below `root`.
///
/// Zero matches is not an error. Only regular files are returned, relative to
/// `root`, in the glob crate's alphabetical enumeration order.
pub fn resolve_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, FileSetError> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let full_pattern = Path::new(&escaped_root).join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let entries =
        glob::glob_with(&full_pattern, options).map_err(|source| FileSetError::GlobPattern {
            pattern: pattern.to_string(),
            source,
        })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root).map(Path::to_path_buf).unwrap_or(path);
        paths.push(relative);
    }

    Ok(paths)
}
