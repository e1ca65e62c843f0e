use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::text_source::QuoteLength;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Animate the caret between cells.
    pub smooth_caret: bool,
    /// Longest caret frame, in microseconds.
    pub caret_wait: u64,
    /// Use the terminal's own bar cursor instead of drawn caret glyphs.
    pub xterm_support: bool,
    pub show_decimal_places: bool,
    pub hide_caret: bool,
    pub language: String,
    /// `default` or a path to a CSS theme file.
    pub theme: String,
    pub words_count: usize,
    pub timed_words: usize,
    pub timed_secs: u64,
    /// Words mode types a quote of this length instead of random words.
    pub quote: Option<QuoteLength>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smooth_caret: true,
            caret_wait: 6250,
            xterm_support: false,
            show_decimal_places: false,
            hide_caret: false,
            language: "english".to_string(),
            theme: "default".to_string(),
            words_count: 10,
            timed_words: 200,
            timed_secs: 15,
            quote: None,
        }
    }
}

impl Config {
    pub fn caret_wait(&self) -> Duration {
        Duration::from_micros(self.caret_wait)
    }

    pub fn timed_budget(&self) -> Duration {
        Duration::from_secs(self.timed_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name, value: &dyn ToString, reason| {
            Err(ConfigError::Invalid {
                name,
                value: value.to_string(),
                reason,
            })
        };
        if self.caret_wait == 0 || self.caret_wait > 1_000_000 {
            return invalid("caret_wait", &self.caret_wait, "expected 1..=1000000 microseconds");
        }
        if self.words_count == 0 {
            return invalid("words_count", &self.words_count, "expected at least one word");
        }
        if self.timed_words == 0 {
            return invalid("timed_words", &self.timed_words, "expected at least one word");
        }
        if self.timed_secs == 0 {
            return invalid("timed_secs", &self.timed_secs, "expected at least one second");
        }
        if self.language.trim().is_empty() {
            return invalid("language", &self.language, "expected a language name");
        }
        if self.theme.trim().is_empty() {
            return invalid("theme", &self.theme, "expected `default` or a theme file");
        }
        Ok(())
    }
}

pub trait ConfigStore {
    /// Defaults when nothing has been saved yet.
    fn load(&self) -> Result<Config, ConfigError>;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("", "", "typeline").ok_or(ConfigError::NoConfigDir)?;
        Ok(Self {
            path: dirs.config_dir().join("config.json"),
        })
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Config, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(store.load().unwrap(), cfg);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            smooth_caret: false,
            caret_wait: 1000,
            xterm_support: true,
            show_decimal_places: true,
            hide_caret: true,
            language: "english".into(),
            theme: "/tmp/oblivion.css".into(),
            words_count: 25,
            timed_words: 100,
            timed_secs: 30,
            quote: Some(QuoteLength::Long),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load().unwrap(), cfg);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load().unwrap(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"smooth_caret": false, "timed_secs": 60}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load().unwrap();
        assert!(!cfg.smooth_caret);
        assert_eq!(cfg.timed_secs, 60);
        assert_eq!(cfg.caret_wait, 6250);
    }

    #[test]
    fn malformed_or_unknown_keys_are_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_matches!(
            FileConfigStore::with_path(&path).load(),
            Err(ConfigError::Parse { .. })
        );
        fs::write(&path, r#"{"smooth_carret": false}"#).unwrap();
        assert_matches!(
            FileConfigStore::with_path(&path).load(),
            Err(ConfigError::Parse { .. })
        );
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(Config::default().validate().is_ok());
        let cfg = Config {
            caret_wait: 0,
            ..Config::default()
        };
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                name: "caret_wait",
                ..
            })
        );
        let cfg = Config {
            timed_secs: 0,
            ..Config::default()
        };
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                name: "timed_secs",
                ..
            })
        );
    }
}
