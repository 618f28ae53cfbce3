//! Config-file loading.
//!
//! Responsibilities:
//! - Resolve the default config and history paths (XDG via
//!   `directories`).
//! - Parse the TOML config file into [`Config`], keeping defaults for
//!   anything unspecified.
//!
//! Does NOT handle:
//! - Command-line flags (TUI crate; CLI values override these).
//! - Hot reload: the config is read once at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::keymap::Keymap;

/// Errors from config-file loading. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the file that failed.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML (or holds a bad key binding;
    /// the parse error names the offending descriptor).
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the file that failed.
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk configuration, all optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// History file path. An empty string disables persistence.
    pub history_file: Option<PathBuf>,
    /// Name or path of the external jq binary.
    pub jq_bin: String,
    /// Start with the input pane hidden.
    pub hide_input_pane: bool,
    /// Module search paths passed to jq as repeated `-L` flags.
    pub library_paths: Vec<PathBuf>,
    /// Key binding overrides.
    pub keymaps: Keymap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: default_history_path(),
            jq_bin: "jq".to_string(),
            hide_input_pane: false,
            library_paths: Vec::new(),
            keymaps: Keymap::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location
    /// when `path` is `None`. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    /// The history path with the empty-string disable convention
    /// applied.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
            .cloned()
    }
}

/// `$XDG_CONFIG_HOME/jq-tui/config.toml` (platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "jq-tui").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// `$XDG_DATA_HOME/jq-tui/history` (platform equivalent).
pub fn default_history_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "jq-tui").map(|dirs| dirs.data_dir().join("history"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.jq_bin, "jq");
        assert!(!config.hide_input_pane);
    }

    #[test]
    fn parses_fields_and_keymap_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
jq-bin = "gojq"
hide-input-pane = true
library-paths = ["/usr/share/jq"]

[keymaps]
submit-filter = "Ctrl+S"
"#
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.jq_bin, "gojq");
        assert!(config.hide_input_pane);
        assert_eq!(config.library_paths, [PathBuf::from("/usr/share/jq")]);

        let ctrl_s = crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Char('s'),
            crossterm::event::KeyModifiers::CONTROL,
        );
        assert!(config.keymaps.submit_filter.matches(&ctrl_s));
    }

    #[test]
    fn empty_history_path_disables_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "history-file = \"\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.history_path(), None);
    }

    #[test]
    fn bad_binding_is_a_parse_error_naming_the_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[keymaps]\nsubmit-filter = \"Hyper+a\"\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
        match err {
            ConfigError::Parse { source, .. } => {
                assert!(source.to_string().contains("Hyper"));
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }
}
