//! Merge-commit bump-message scanning: a feature branch carrying a
//! `+semver: major` directive, merged back into main with `--no-ff`.

use tempfile::TempDir;

mod common;

use common::fixtures::TRUNK_WITH_FEATURE_MERGE;

async fn build_merged_repo(path: &std::path::Path) {
    common::git::ensure_empty_repository(path)
        .await
        .expect("Failed to create repo");

    for args in TRUNK_WITH_FEATURE_MERGE {
        common::git::run_git_command(args, path).expect("Failed to run fixture command");
    }
}

#[tokio::test]
async fn test_merged_feature_bump_message_ignored_by_default() {
    use nextver::{calculate_version, Config};

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path();
    build_merged_repo(path).await;

    // `commit_message_incrementing` defaults to `MergeMessageOnly`, so the
    // bump directive sitting on a plain feature-branch commit is invisible
    // to trunk iteration. The global `Patch` override on the `TaggedVersion`
    // candidate still wins arbitration over the unchanged trunk candidate.
    let config = Config {
        increment: nextver::version::IncrementField::Patch,
        ..Config::default()
    };

    let result = calculate_version(path, &config).expect("Failed to calculate version");
    assert_eq!(result.version.render(), "1.0.1");
}

#[tokio::test]
async fn test_merged_feature_bump_message_honoured_when_enabled() {
    use nextver::{calculate_version, Config};

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path();
    build_merged_repo(path).await;

    let config = Config {
        increment: nextver::version::IncrementField::Patch,
        commit_message_incrementing: nextver::config::CommitMessageIncrementMode::Enabled,
        ..Config::default()
    };

    let result = calculate_version(path, &config).expect("Failed to calculate version");
    assert_eq!(result.version.render(), "2.0.0");
}
