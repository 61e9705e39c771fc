use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use tracing::{debug, warn};

const RUBY_EXTENSION: &str = "rb";

/// Ruby files under `paths`, sorted. Directories are walked honouring
/// `.gitignore` files; paths matching an `exclude` glob are skipped. Files
/// named directly are always kept.
pub fn discover(paths: &[PathBuf], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("no such file or directory: {}", path.display());
        }
        walk(path, exclude, &mut files)?;
    }
    files.sort();
    files.dedup();
    debug!(files = files.len(), "discovered ruby files");
    Ok(files)
}

fn walk(root: &Path, exclude: &[String], files: &mut Vec<PathBuf>) -> Result<()> {
    let mut overrides = OverrideBuilder::new(root);
    for pattern in exclude {
        overrides
            .add(&format!("!{pattern}"))
            .with_context(|| format!("invalid exclude pattern `{pattern}`"))?;
    }
    let overrides = overrides.build()?;

    for result in WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .overrides(overrides)
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
        if is_file && entry.path().extension().is_some_and(|ext| ext == RUBY_EXTENSION) {
            files.push(entry.into_path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn finds_ruby_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "lib/foo.rb");
        touch(dir.path(), "lib/nested/bar.rb");
        touch(dir.path(), "README.md");

        let files = discover(&[dir.path().to_path_buf()], &[]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["lib/foo.rb", "lib/nested/bar.rb"]);
    }

    #[test]
    fn honours_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "lib/foo.rb");
        touch(dir.path(), "vendor/gem/bar.rb");

        let files = discover(&[dir.path().to_path_buf()], &["vendor/**".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("lib/foo.rb"));
    }

    #[test]
    fn honours_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "lib/foo.rb");
        touch(dir.path(), "tmp/cache.rb");
        std::fs::write(dir.path().join(".gitignore"), "tmp/\n").unwrap();

        let files = discover(&[dir.path().to_path_buf()], &[]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn keeps_explicit_files_and_rejects_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "script");
        let script = dir.path().join("script");
        assert_eq!(discover(&[script.clone(), script.clone()], &[]).unwrap(), vec![script]);
        assert!(discover(&[dir.path().join("missing")], &[]).is_err());
    }
}
