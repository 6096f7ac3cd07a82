//! Build metadata: commits-since-source, branch name, and commit sha are
//! derived automatically rather than supplied by the caller.

use tempfile::TempDir;

mod common;

fn patch_config() -> nextver::Config {
    nextver::Config {
        increment: nextver::version::IncrementField::Patch,
        ..nextver::Config::default()
    }
}

#[tokio::test]
async fn test_build_metadata_on_exact_tag_hit() {
    use nextver::calculate_version;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path();

    common::git::ensure_empty_repository_and_commit(path)
        .await
        .expect("Failed to create repo");
    common::git::tag(path, "1.0.0")
        .await
        .expect("Failed to create tag");

    let result = calculate_version(path, &patch_config()).expect("Failed to calculate version");
    assert_eq!(result.version.build.commits_since_source, 0);
    assert_eq!(result.version.build.branch_name.as_deref(), Some("main"));
    assert!(result.version.build.commit_sha.is_some());
}

#[tokio::test]
async fn test_build_metadata_counts_commits_since_tag() {
    use nextver::calculate_version;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path();

    common::git::ensure_empty_repository_and_commit(path)
        .await
        .expect("Failed to create repo");
    common::git::tag(path, "1.0.0")
        .await
        .expect("Failed to create tag");
    common::git::commit(path).await.expect("Failed to create commit");
    common::git::commit(path).await.expect("Failed to create commit");

    let result = calculate_version(path, &patch_config()).expect("Failed to calculate version");
    assert_eq!(result.version.build.commits_since_source, 2);
    assert_eq!(result.commits_since_source, 2);
}

#[tokio::test]
async fn test_continuous_deployment_strips_prerelease_from_output() {
    use nextver::{calculate_version, Config};

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path();

    common::git::ensure_empty_repository_and_commit(path)
        .await
        .expect("Failed to create repo");
    common::git::tag(path, "1.0.0")
        .await
        .expect("Failed to create tag");
    common::git::commit(path).await.expect("Failed to create commit");

    let config = Config {
        increment: nextver::version::IncrementField::Patch,
        deployment_mode: nextver::config::DeploymentMode::ContinuousDeployment,
        label: nextver::config::LabelSetting::Literal("beta".to_string()),
        ..Config::default()
    };

    let result = calculate_version(path, &config).expect("Failed to calculate version");
    assert_eq!(result.version.render(), "1.0.1");
    assert!(result.version.pre_release.is_none());
}
