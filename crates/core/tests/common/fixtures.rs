//! Test fixtures for nextver integration tests.

use std::path::Path;

/// A feature branch merged back into main with a `+semver: major` bump
/// message, used to exercise `scan_merged_branch_for_increment`.
#[allow(dead_code)]
pub const TRUNK_WITH_FEATURE_MERGE: &[&[&str]] = &[
    &["commit", "--allow-empty", "-m", "initial"],
    &["tag", "1.0.0"],
    &["checkout", "-b", "feature/big-thing"],
    &["commit", "--allow-empty", "-m", "work in progress"],
    &["commit", "--allow-empty", "-m", "+semver: major"],
    &["checkout", "main"],
    &["merge", "feature/big-thing", "--no-edit", "--no-ff"],
];

/// Two plain commits on main, the second one tagged `0.2.0`.
#[allow(dead_code)]
pub const TWO_COMMITS_TAGGED_ON_HEAD: &[&[&str]] = &[
    &["commit", "--allow-empty", "-m", "initial"],
    &["commit", "--allow-empty", "-m", "release"],
    &["tag", "0.2.0"],
];

/// A `+semver: major` directive on the first commit, then a plain commit,
/// with no tags anywhere in the graph.
#[allow(dead_code)]
pub const BUMP_MESSAGE_THEN_PLAIN_COMMIT: &[&[&str]] = &[
    &["commit", "--allow-empty", "-m", "initial +semver: major"],
    &["commit", "--allow-empty", "-m", "followup"],
];

/// Helper to create a file before commits (some git configurations reject
/// truly empty trees for the very first commit).
#[allow(dead_code)]
pub fn create_test_file(path: &Path, index: &str) -> std::io::Result<()> {
    let file_path = path.join(index);
    std::fs::write(&file_path, index)?;
    Ok(())
}
