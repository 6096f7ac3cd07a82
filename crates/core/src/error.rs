//! Error types for nextver operations.

use thiserror::Error;

/// Result type alias for nextver operations.
pub type Result<T> = std::result::Result<T, NextVerError>;

/// Main error type for nextver operations.
///
/// The error taxonomy recognises four kinds of failure, but only two of them
/// — configuration and repository errors — are fatal and ever constructed
/// here. A bad tag or branch name (`ParseError`) and a candidate excluded by
/// an ignore rule (`IgnoredError`) are logged at `debug!`/`info!` where they
/// occur and the candidate is silently dropped; they never become a
/// `NextVerError`.
#[derive(Error, Debug)]
pub enum NextVerError {
    #[error("Git repository not found at path: {0}")]
    GitRepoNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("repository error on branch '{branch}': {message}")]
    Repository { branch: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Git command failed: {0}")]
    GitCommand(String),

    #[error("other error: {0}")]
    Other(String),
}
