//! Configuration management for rq.
//!
//! Parses `rq.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. All sections and
//! keys are optional; defaults match the values the engine was built
//! around, so a missing file is equivalent to an empty one.
//!
//! ```toml
//! [styles]
//! directive = "Rq Directive"
//! hidden = "Rq Hidden Directive"
//!
//! [annotate]
//! pad_width = 4
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rq.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Paragraph style names for directives.
    pub styles: StylesConfig,
    /// Id allocation settings.
    pub annotate: AnnotateConfig,
}

/// Paragraph style names used when writing and checking directives.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    /// Style of shortform (visible) directive blocks.
    pub directive: String,
    /// Style of extended (hidden) directive blocks.
    pub hidden: String,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            directive: "Rq Directive".to_owned(),
            hidden: "Rq Hidden Directive".to_owned(),
        }
    }
}

/// Id allocation settings.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotateConfig {
    /// Minimum digit count of freshly allocated id numbers.
    pub pad_width: usize,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self { pad_width: 4 }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise,
    /// searches for `rq.toml` in the current directory and its parents and
    /// falls back to defaults when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_path` doesn't exist or
    /// parsing fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }
        let discovered = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd));
        match discovered {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Search for `rq.toml` in `start` and its parent directories.
    #[must_use]
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.styles.directive, "Rq Directive");
        assert_eq!(config.styles.hidden, "Rq Hidden Directive");
        assert_eq!(config.annotate.pad_width, 4);
    }

    #[test]
    fn test_empty_file_equals_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rq.toml");
        fs::write(&path, "").unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rq.toml");
        fs::write(&path, "[annotate]\npad_width = 6\n").unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.annotate.pad_width, 6);
        assert_eq!(config.styles, StylesConfig::default());
    }

    #[test]
    fn test_style_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rq.toml");
        fs::write(
            &path,
            "[styles]\ndirective = \"Visible\"\nhidden = \"Hidden\"\n",
        )
        .unwrap();
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.styles.directive, "Visible");
        assert_eq!(config.styles.hidden, "Hidden");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rq.toml");
        fs::write(&path, "[styles]\nbogus = 1\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_discover_walks_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let path = dir.path().join("rq.toml");
        fs::write(&path, "").unwrap();

        let found = Config::discover_from(&nested).unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::NotFound(_))
        ));
    }
}
