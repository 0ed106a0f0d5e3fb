//! Error types for rackspace-bootstrap

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rackspace-bootstrap operations
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("The RACKSPACE_USERNAME and RACKSPACE_APIKEY need to be set")]
    MissingCredentials,

    #[error("Unable to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Resolution(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server {0} entered an error state")]
    InstanceFailed(String),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<reqwest::Error> for BootstrapError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl BootstrapError {
    /// Create a file read error for `path`
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this failure class
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingCredentials | Self::Resolution(_) => 1,
            Self::FileRead { .. } => 3,
            Self::Provider(_) | Self::Http(_) | Self::InstanceFailed(_) => 4,
            Self::Timeout(_) => 5,
            Self::Config(_) | Self::Yaml(_) | Self::Json(_) | Self::InvalidData(_) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_lookup_and_credentials_exit_with_one() {
        assert_eq!(BootstrapError::MissingCredentials.exit_code(), 1);
        assert_eq!(
            BootstrapError::Resolution("Unable to find image foo".into()).exit_code(),
            1
        );
    }

    #[test]
    fn test_failure_classes_have_distinct_codes() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let codes = [
            BootstrapError::file_read("/tmp/keys", io).exit_code(),
            BootstrapError::Http("refused".into()).exit_code(),
            BootstrapError::Timeout("server".into()).exit_code(),
            BootstrapError::Config("bad".into()).exit_code(),
        ];
        assert_eq!(codes, [3, 4, 5, 6]);
    }

    #[test]
    fn test_file_read_message_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let err = BootstrapError::file_read("/nope/authorized_keys", io);
        assert!(err.to_string().contains("/nope/authorized_keys"));
    }
}
