//! # nextver core library
//! Trunk-based semantic version calculation from Git history: base-version
//! discovery across multiple strategies, a trunk iterator over commits,
//! increment/label resolution, and the three deployment-mode
//! post-processors.
//!
//! ## Quick Start
//!
//! Get the version for the current Git repository.
//!
//! ```rust,no_run
//! # use nextver::NextVerError;
//! use nextver::{calculate_version, Config};
//!
//! let config = Config::default();
//! let result = calculate_version(".", &config)?;
//!
//! println!("Calculated version: {}", result);
//! # Ok::<_, NextVerError>(())
//! ```
//!
//! ## Strict vs. fallback entry points
//! - [`calculate_version`] — requires a real Git repository and errors otherwise.
//! - [`calculate_version_with_fallback`] — returns the default version when no repository is found.

pub mod calculator;
pub mod config;
pub mod deployment;
pub mod error;
pub mod git;
pub mod increment;
pub mod strategies;
pub mod tags;
pub mod trunk;
pub mod version;

pub use config::Config;
pub use error::{NextVerError, Result};
pub use git::GixRepositoryView as Repository;
pub use version::SemanticVersion;

/// Calculate the version for the given repository using the nextver
/// algorithm.
///
/// # Errors
/// - [`NextVerError::GitRepoNotFound`] if the path is not inside a Git repository.
/// - [`NextVerError::Repository`] if the current branch has no tip or no base
///   version could be determined.
/// - [`NextVerError::Configuration`] for an invalid configuration.
pub fn calculate_version(
    work_dir: impl Into<std::path::PathBuf>,
    config: &Config,
) -> Result<CalculationResult> {
    let work_dir = work_dir.into();
    let repo = git::GixRepositoryView::discover(&work_dir)?;
    calculate_with_repo(&repo, config, work_dir)
}

/// Calculate the version, falling back to the default version when no
/// repository is found.
///
/// # Examples
/// ```rust
/// use nextver::{calculate_version_with_fallback, Config, NextVerError};
///
/// let config = Config { increment: nextver::version::IncrementField::Patch, ..Config::default() };
/// let result = calculate_version_with_fallback("/tmp/not-a-repo-nextver", &config)?;
/// assert_eq!(result.to_string(), "0.0.0");
/// assert!(!result.is_from_tag);
/// # Ok::<_, NextVerError>(())
/// ```
pub fn calculate_version_with_fallback(
    work_dir: impl Into<std::path::PathBuf>,
    config: &Config,
) -> Result<CalculationResult> {
    let work_dir = work_dir.into();
    match git::GixRepositoryView::discover(&work_dir) {
        Ok(repo) => calculate_with_repo(&repo, config, work_dir),
        Err(NextVerError::GitRepoNotFound(_)) => Ok(CalculationResult {
            version: version::SemanticVersion::new(0, 0, 0),
            is_from_tag: false,
            commits_since_source: 0,
            work_dir,
        }),
        Err(e) => Err(e),
    }
}

fn calculate_with_repo(
    repo: &git::GixRepositoryView,
    config: &Config,
    work_dir: std::path::PathBuf,
) -> Result<CalculationResult> {
    use git::GitRepositoryView as _;

    let version = calculator::calculate(repo, config)?;
    let is_from_tag = version.build.commits_since_source == 0
        && version.build.source_sha.is_some()
        && version.build.source_sha == repo.head_sha();
    Ok(CalculationResult {
        commits_since_source: version.build.commits_since_source,
        is_from_tag,
        version,
        work_dir,
    })
}

/// Result of a version calculation.
///
/// `is_from_tag`/`commits_since_source` let CLI output and library
/// consumers alike tell whether the returned version is an exact tag hit
/// without re-deriving it from `version.build`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CalculationResult {
    pub version: version::SemanticVersion,
    pub is_from_tag: bool,
    pub commits_since_source: u32,
    pub work_dir: std::path::PathBuf,
}

impl std::fmt::Display for CalculationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.version)
    }
}
