//! Deployment-Mode Post-processors: produce the final version from an
//! incremented version plus a base source commit. Three variants: manual,
//! continuous delivery, continuous deployment.

use crate::config::DeploymentMode;
use crate::git::{BranchRef, CommitInfo};
use crate::version::{BuildMetadata, PreRelease, SemanticVersion};

/// Run the configured deployment-mode post-processor over the arbitrated,
/// floor-applied version, attaching fresh build metadata.
pub fn post_process(
    mut version: SemanticVersion,
    mode: DeploymentMode,
    base_version_source: Option<&CommitInfo>,
    branch: &BranchRef,
    head: &CommitInfo,
    commits_since_source: u32,
    uncommitted_count: u32,
) -> SemanticVersion {
    match mode {
        DeploymentMode::ManualDeployment => {
            // Preserve the incremented pre-release tag as-is.
        }
        DeploymentMode::ContinuousDelivery => {
            // The label stays, but `number` reflects commits-since rather
            // than the sequential increment count.
            if let Some(pre) = &version.pre_release {
                version.pre_release = Some(PreRelease {
                    label: pre.label.clone(),
                    number: commits_since_source as u64,
                });
            }
        }
        DeploymentMode::ContinuousDeployment => {
            version.pre_release = None;
        }
    }

    let commits_since = match mode {
        DeploymentMode::ContinuousDelivery => 0,
        _ => commits_since_source,
    };

    let build = BuildMetadata {
        source_sha: base_version_source.map(|c| c.sha.clone()),
        commits_since_source: commits_since,
        branch_name: Some(branch.friendly_name.clone()),
        commit_sha: Some(head.sha.clone()),
        short_sha: Some(head.short_sha()),
        commit_timestamp: Some(head.when),
        uncommitted_count,
    };
    version.with_build(build)
}
