//! The surface-syntax parser as a pluggable collaborator.
//!
//! The kernel and driver only know about [`rzk_kernel::Declaration`]; they
//! never read a source file. Turning `.rzk` source text into declarations
//! is the job of whatever implements [`ModuleParser`] — this crate ships
//! one, [`StubParser`], that recognizes the empty file produced by
//! `rzk new` and nothing else. A real concrete-syntax parser can be
//! dropped in later by implementing the same trait.

use rzk_kernel::Declaration;
use std::fmt;
use std::path::{Path, PathBuf};

/// A parsed module: the declarations read from one source file, in
/// source order.
#[derive(Debug, Clone, Default)]
pub struct ParsedModule {
    pub decls: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.path.display(), self.message)
    }
}

impl std::error::Error for ParseError {}

/// A collaborator that turns a source file into a [`ParsedModule`].
pub trait ModuleParser {
    fn parse_module_file(&self, path: &Path) -> Result<ParsedModule, ParseError>;
}

/// A placeholder parser: it accepts a file only if it is empty or
/// consists solely of blank lines and `#`-comments, in which case it
/// reports zero declarations. Anything else is rejected, since this
/// crate carries no concrete-syntax grammar. `rzk new` scaffolds exactly
/// this trivial shape, so `rzk new && rzk check` succeeds end to end
/// without a real parser plugged in.
pub struct StubParser;

impl ModuleParser for StubParser {
    fn parse_module_file(&self, path: &Path) -> Result<ParsedModule, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let is_trivial = content
            .lines()
            .all(|line| { let t = line.trim(); t.is_empty() || t.starts_with('#') });
        if is_trivial {
            Ok(ParsedModule::default())
        } else {
            Err(ParseError {
                path: path.to_path_buf(),
                message: "no concrete-syntax parser is plugged in; only empty modules are supported".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.rzk");
        std::fs::write(&path, "# a comment\n\n").unwrap();
        let module = StubParser.parse_module_file(&path).unwrap();
        assert!(module.decls.is_empty());
    }

    #[test]
    fn rejects_nonempty_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.rzk");
        std::fs::write(&path, "def foo : U := U\n").unwrap();
        assert!(StubParser.parse_module_file(&path).is_err());
    }
}
