//! Tracking configuration via `relata.toml`
//!
//! The configuration is small: it selects how collection end points detect
//! changes and whether end points may trigger loads on demand.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "relata.toml";

/// How a collection end point decides whether its data changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDetection {
    /// Membership only: reordering is not a change (root transactions)
    #[default]
    Set,
    /// Membership and order (subordinate transactions)
    Sequence,
}

/// Configuration of a `RelationEndPointManager`.
///
/// # Example
///
/// ```toml
/// # "set" (default) or "sequence"
/// change_detection = "set"
/// lazy_load = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Collection change detection strategy.
    #[serde(default)]
    pub change_detection: ChangeDetection,
    /// Whether incomplete end points may invoke the loader on access.
    #[serde(default = "default_lazy_load")]
    pub lazy_load: bool,
}

fn default_lazy_load() -> bool {
    true
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            change_detection: ChangeDetection::default(),
            lazy_load: default_lazy_load(),
        }
    }
}

impl TrackingConfig {
    /// Configuration for a subordinate transaction: order-sensitive collections
    pub fn for_sub_transaction() -> Self {
        Self {
            change_detection: ChangeDetection::Sequence,
            ..Self::default()
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Relation tracking configuration
#
# Collection change detection: "set" (default) or "sequence"
#   "set"      = only membership changes mark a collection as changed
#   "sequence" = reordering also marks a collection as changed
change_detection = "set"

# Whether incomplete end points may load their data on access (default: true)
lazy_load = true
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is not valid configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TrackingConfig::default();
        assert_eq!(config.change_detection, ChangeDetection::Set);
        assert!(config.lazy_load);
    }

    #[test]
    fn test_default_toml_parses_to_default() {
        let config = TrackingConfig::from_toml_str(TrackingConfig::default_toml()).unwrap();
        assert_eq!(config, TrackingConfig::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TrackingConfig::from_toml_str("change_detection = \"sequence\"").unwrap();
        assert_eq!(config.change_detection, ChangeDetection::Sequence);
        assert!(config.lazy_load);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let result = TrackingConfig::from_toml_str("change_detection = \"bag\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "lazy_load = false").unwrap();

        let config = TrackingConfig::from_file(&path).unwrap();
        assert!(!config.lazy_load);
        assert_eq!(config.change_detection, ChangeDetection::Set);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrackingConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
