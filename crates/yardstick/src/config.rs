use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use typecheck::CheckLevel;

use crate::cli::OutputFormat;

pub const CONFIG_FILE: &str = "yardstick.toml";

/// Settings read from `yardstick.toml`. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub level: CheckLevel,
    pub format: OutputFormat,
    /// Glob patterns of paths to skip, relative to the checked directory.
    pub exclude: Vec<String>,
    /// Worker threads; 0 means one per CPU.
    pub threads: usize,
}

impl Config {
    /// Reads `explicit` when given, else `yardstick.toml` in the working
    /// directory when it exists, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_settings() {
        let config = Config::parse(
            "level = \"strict\"\nformat = \"json\"\nexclude = [\"vendor/**\"]\nthreads = 2\n",
        )
        .unwrap();
        assert_eq!(config.level, CheckLevel::Strict);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.exclude, vec!["vendor/**"]);
        assert_eq!(config.effective_threads(), 2);
    }

    #[test]
    fn missing_settings_use_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.effective_threads() > 0);
    }

    #[test]
    fn rejects_unknown_settings() {
        assert!(Config::parse("levle = \"strict\"\n").is_err());
        assert!(Config::parse("level = \"loose\"\n").is_err());
    }

    #[test]
    fn reports_missing_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn loads_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "level = \"strict\"\n").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().level, CheckLevel::Strict);
    }
}
