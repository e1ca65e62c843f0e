use std::io;

use thiserror::Error;

/// Fatal failures. A user abort is not one of these; see [`crate::diff::Applied::Broken`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A word list, quote collection, or theme could not be obtained.
    #[error("{operation}: fetch failed with status {status}")]
    ResourceFetch {
        operation: &'static str,
        status: String,
    },

    /// Content was found but is malformed.
    #[error("parsing {what} failed near \"{fragment}\"")]
    Parse { what: String, fragment: String },

    #[error("terminal: {0}")]
    Terminal(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a config directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("option {name} value \"{value}\" is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_fetch_names_operation_and_status() {
        let err = Error::ResourceFetch {
            operation: "get_words",
            status: "language klingon is not bundled".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "get_words: fetch failed with status language klingon is not bundled"
        );
    }

    #[test]
    fn parse_error_names_fragment() {
        let err = Error::Parse {
            what: "theme serika".to_string(),
            fragment: "--nope-color:#fff".to_string(),
        };
        assert!(err.to_string().contains("--nope-color:#fff"));
    }

    #[test]
    fn config_error_is_transparent() {
        let err: Error = ConfigError::Invalid {
            name: "caret_wait",
            value: "0".to_string(),
            reason: "must be positive",
        }
        .into();
        assert_eq!(
            err.to_string(),
            "option caret_wait value \"0\" is invalid: must be positive"
        );
    }
}
