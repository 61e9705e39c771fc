use std::path::Path;
use std::sync::Arc;

use ruby_syntax::SyntaxNode;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One Ruby file and its syntax tree.
///
/// A source whose parse reported errors keeps the partial tree for mapping
/// declarations but is not `parsed`, and the checker ignores it.
#[derive(Debug, Clone)]
pub struct Source {
    filename: String,
    code: Arc<str>,
    tree: Option<Arc<SyntaxNode>>,
    parsed: bool,
}

impl Source {
    pub fn load_string(code: impl Into<String>, filename: impl Into<String>) -> Self {
        let code: String = code.into();
        let filename = filename.into();
        let (tree, parsed) = match ruby_syntax::parse(&code) {
            Ok(tree) => {
                if tree.has_errors {
                    debug!(filename = %filename, "source has syntax errors");
                }
                (Some(tree.root), !tree.has_errors)
            }
            Err(e) => {
                warn!(filename = %filename, error = %e, "failed to parse source");
                (None, false)
            }
        };
        Self {
            filename,
            code: code.into(),
            tree,
            parsed,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let code = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::load_string(code, path.to_string_lossy()))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn tree(&self) -> Option<&Arc<SyntaxNode>> {
        self.tree.as_ref()
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn marks_broken_sources_unparsed() {
        let source = Source::load_string("foo{", "broken.rb");
        assert!(!source.is_parsed());

        let source = Source::load_string("foo = 1", "ok.rb");
        assert!(source.is_parsed());
        assert!(source.tree().is_some());
    }

    #[test]
    fn load_reports_missing_files() {
        let err = Source::load(Path::new("/nonexistent/missing.rb")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn loads_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.rb");
        std::fs::write(&path, "class Foo; end\n").unwrap();
        let source = Source::load(&path).unwrap();
        assert!(source.is_parsed());
        assert_eq!(source.filename(), path.to_string_lossy());
        assert_eq!(source.code(), "class Foo; end\n");
    }

    #[test]
    #[traced_test]
    fn logs_syntax_errors() {
        Source::load_string("def foo(", "broken.rb");
        assert!(logs_contain("source has syntax errors"));
    }
}
