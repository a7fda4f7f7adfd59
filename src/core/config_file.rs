//! Configuration file handling
//!
//! A JSON file given with `--configfile`, or `config.json` in the user
//! config directory (`~/.config/glyph-patcher/` on Linux) when present.
//!
//! ```json
//! {
//!   "ligatures": ["'liga' Standard Ligatures lookup 0 subtable"],
//!   "re_hint": ["uni25[0-9A-F]{2}"],
//!   "commandline": "--careful --powerline"
//! }
//! ```

use crate::core::errors::{PatchError, PatchResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigFile {
    /// Lookup names removed with `--removeligatures`
    pub ligatures: Vec<String>,
    /// Glyph name patterns whose hinting is redone
    pub re_hint: Vec<String>,
    /// Extra command line flags applied as if given on the command line
    pub commandline: Option<String>,
}

impl ConfigFile {
    /// Get the path to the user config directory
    pub fn config_dir() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
        config_dir.join("glyph-patcher")
    }

    /// Get the path to the user config file
    pub fn user_config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load the given file, or the user config file if it exists
    pub fn resolve(path: Option<&Path>) -> PatchResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let user = Self::user_config_path();
                if user.is_file() {
                    Self::load(&user)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load(path: &Path) -> PatchResult<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            PatchError::configuration(format!(
                "Can not read config file {}: {}",
                path.display(),
                err
            ))
        })?;
        let config = Self::parse(&contents).map_err(|err| {
            PatchError::configuration(format!(
                "Can not parse config file {}: {}",
                path.display(),
                err
            ))
        })?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_sections_default_to_empty() {
        let config = ConfigFile::parse(r#"{ "re_hint": ["uni2500"] }"#).unwrap();
        assert!(config.ligatures.is_empty());
        assert_eq!(config.re_hint, vec!["uni2500"]);
        assert!(config.commandline.is_none());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "ligatures": ["liga_fi"], "commandline": "--careful" }}"#
        )
        .unwrap();

        let config = ConfigFile::resolve(Some(file.path())).unwrap();
        assert_eq!(config.ligatures, vec!["liga_fi"]);
        assert_eq!(config.commandline.as_deref(), Some("--careful"));
    }

    #[test]
    fn broken_files_are_configuration_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ligatures = [").unwrap();
        let err = ConfigFile::load(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), crate::core::errors::EXIT_CONFIGURATION);

        let missing = ConfigFile::load(Path::new("/nonexistent/glyph-patcher.json"));
        assert!(missing.is_err());
    }
}
