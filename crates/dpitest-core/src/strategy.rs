//! Candidate strategies and their on-disk repository
//!
//! One file per strategy: the filename stem is the strategy name, the file
//! content is an opaque payload copied verbatim into the live configuration
//! of the service under test. This engine never parses payloads.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A named, opaque configuration payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    /// Unique name, derived from the source filename
    pub name: String,
    /// Opaque multi-line payload
    pub payload: String,
}

/// Enumerates and loads candidate strategies from a directory
#[derive(Debug, Clone)]
pub struct StrategyRepository {
    dir: PathBuf,
}

impl StrategyRepository {
    /// Repository rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this repository reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every readable, non-empty strategy file, sorted by name
    ///
    /// Unreadable or empty entries are skipped with a warning rather than
    /// failing the whole run.
    pub fn load_all(&self) -> Result<Vec<Strategy>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| Error::config_io(self.dir.display().to_string(), e.to_string()))?;

        let mut strategies = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match Self::load_file(&path) {
                Ok(Some(strategy)) => strategies.push(strategy),
                Ok(None) => warn!(path = %path.display(), "Skipping empty strategy file"),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable strategy"),
            }
        }

        strategies.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = strategies.len(), dir = %self.dir.display(), "Loaded strategies");
        Ok(strategies)
    }

    /// Load only the named strategies, preserving the requested order
    ///
    /// A name with no matching file is an error: the caller asked for it
    /// explicitly.
    pub fn load_named(&self, names: &[String]) -> Result<Vec<Strategy>> {
        let all = self.load_all()?;
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match all.iter().find(|s| &s.name == name) {
                Some(s) => selected.push(s.clone()),
                None => {
                    return Err(Error::config_io(
                        self.dir.display().to_string(),
                        format!("no strategy named '{name}'"),
                    ))
                }
            }
        }
        Ok(selected)
    }

    fn load_file(path: &Path) -> Result<Option<Strategy>> {
        let name = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => return Ok(None),
        };
        let payload = std::fs::read_to_string(path)
            .map_err(|e| Error::config_io(path.display().to_string(), e.to_string()))?;
        if payload.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Strategy { name, payload }))
    }
}
