//! `rzk.yaml` manifest parsing.
//!
//! The manifest names the files that make up a project. Loading expands
//! every glob in `include` against the workspace root, sorts the results
//! lexicographically so check order is reproducible, and dedups.
//!
//! ```yaml
//! include:
//!   - "src/**/*.rzk"
//!   - "lib/**/*.rzk"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project manifest (`rzk.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Glob patterns, relative to the workspace root, naming source files.
    pub include: Vec<String>,
}

/// Errors that can occur when loading or writing a manifest.
#[derive(Debug)]
pub enum ManifestError {
    Io(PathBuf, String),
    Parse(PathBuf, String),
    Serialize(String),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestError::Io(path, e) => write!(f, "failed to read {}: {}", path.display(), e),
            ManifestError::Parse(path, e) => write!(f, "failed to parse {}: {}", path.display(), e),
            ManifestError::Serialize(e) => write!(f, "failed to serialize manifest: {}", e),
        }
    }
}

impl std::error::Error for ManifestError {}

impl Manifest {
    /// Load `rzk.yaml` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join("rzk.yaml");
        let content = fs::read_to_string(&path).map_err(|e| ManifestError::Io(path.clone(), e.to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| ManifestError::Parse(path, e.to_string()))
    }

    /// A manifest that includes every `.rzk` file under `src/`.
    pub fn new() -> Self {
        Manifest { include: vec!["src/**/*.rzk".to_string()] }
    }

    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        serde_yaml::to_string(self).map_err(|e| ManifestError::Serialize(e.to_string()))
    }

    /// Expand every `include` glob against `root`, returning a sorted,
    /// deduplicated list of absolute paths. A pattern matching nothing is
    /// not an error — an empty project is a valid (if uninteresting) one.
    pub fn resolve_files(&self, root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
        let mut files = Vec::new();
        for pattern in &self.include {
            let full_pattern = root.join(pattern);
            let pattern_str = full_pattern.to_string_lossy().into_owned();
            let matches = glob::glob(&pattern_str)
                .map_err(|e| ManifestError::Parse(root.to_path_buf(), e.to_string()))?;
            for entry in matches {
                let path = entry.map_err(|e| ManifestError::Io(root.to_path_buf(), e.to_string()))?;
                files.push(path);
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_minimal_manifest() {
        let yaml = "include:\n  - \"src/**/*.rzk\"\n";
        let manifest: Manifest = serde_yaml::from_str(yaml).expect("should parse");
        assert_eq!(manifest.include, vec!["src/**/*.rzk".to_string()]);
    }

    #[test]
    fn resolve_files_sorts_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/b.rzk"), "").unwrap();
        fs::write(dir.path().join("src/a.rzk"), "").unwrap();
        let manifest = Manifest { include: vec!["src/*.rzk".to_string(), "src/*.rzk".to_string()] };
        let files = manifest.resolve_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.rzk"));
        assert!(files[1].ends_with("b.rzk"));
    }

    #[test]
    fn empty_match_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest { include: vec!["src/**/*.rzk".to_string()] };
        assert!(manifest.resolve_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_manifest_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Manifest::load(dir.path()), Err(ManifestError::Io(..))));
    }
}
