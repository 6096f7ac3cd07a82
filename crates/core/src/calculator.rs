//! Next Version Calculator: the orchestrator. Runs strategies, arbitrates
//! candidates, applies tag short-circuits, and invokes the deployment-mode
//! post-processor.

use tracing::debug;

use crate::config::{resolve_label, Config, EffectiveConfiguration};
use crate::deployment::post_process;
use crate::error::{NextVerError, Result};
use crate::git::{BranchRef, CommitInfo, GitRepositoryView};
use crate::increment::find_increment;
use crate::strategies::{propose, resolve_candidate_label, BaseVersion, Strategy, StrategyContext};
use crate::tags::TaggedVersionRepository;
use crate::version::{BuildMetadata, SemanticVersion};

/// One arbitration unit: an incremented candidate version, the base it was
/// derived from, and the effective configuration that produced it.
#[derive(Debug, Clone)]
pub struct NextVersion {
    pub incremented_version: SemanticVersion,
    pub base_version: BaseVersion,
    pub effective_configuration: EffectiveConfiguration,
}

/// Compute the next semantic version for the repository's current branch.
pub fn calculate<R: GitRepositoryView>(repo: &R, config: &Config) -> Result<SemanticVersion> {
    let branch = repo.current_branch().ok_or_else(|| NextVerError::Repository {
        branch: "HEAD".to_string(),
        message: "current branch has no tip".to_string(),
    })?;

    let head_sha = repo.head_sha().ok_or_else(|| NextVerError::Repository {
        branch: branch.friendly_name.clone(),
        message: "repository has no commits".to_string(),
    })?;
    let head = repo.commit(&head_sha).ok_or_else(|| NextVerError::Repository {
        branch: branch.friendly_name.clone(),
        message: "HEAD commit could not be resolved".to_string(),
    })?;

    let effective_configs = config.effective_configurations_for(&branch.friendly_name);
    let tags = TaggedVersionRepository::new(repo);

    for effective in &effective_configs {
        if let Some(version) = try_tag_on_head_short_circuit(repo, config, effective, &branch, &head) {
            return Ok(version);
        }
    }

    let mut candidates: Vec<NextVersion> = Vec::new();
    for effective in &effective_configs {
        let label = resolve_label(effective, &branch.friendly_name);
        let ctx = StrategyContext {
            repo,
            tags: &tags,
            config,
            effective,
            branch: &branch,
            head: &head,
            label: &label,
        };
        for strategy in Strategy::enabled_for(effective) {
            for candidate in propose(strategy, &ctx) {
                if is_ignored(config, &candidate) {
                    debug!(source = %candidate.source, "candidate excluded by ignore configuration");
                    continue;
                }
                let candidate_label = resolve_candidate_label(&candidate, effective, &branch.friendly_name);
                let incremented = if candidate.should_increment {
                    let field = find_increment(&ctx, &candidate, &candidate_label);
                    let mut v = candidate
                        .semantic_version
                        .increment(field, &candidate_label, candidate.force_increment);
                    if let Some(alt) = candidate.alternative_semantic_version {
                        v = v.with_alternative_floor(alt);
                    }
                    v
                } else {
                    candidate.semantic_version.clone()
                };
                candidates.push(NextVersion {
                    incremented_version: incremented,
                    base_version: candidate,
                    effective_configuration: effective.clone(),
                });
            }
        }
    }

    let winner = arbitrate(candidates).ok_or_else(|| NextVerError::Repository {
        branch: branch.friendly_name.clone(),
        message: "no base versions could be determined on the current branch".to_string(),
    })?;

    let deployment_mode = winner.effective_configuration.deployment_mode;
    let base_source = winner.base_version.base_version_source.clone();
    let final_version = apply_alternative_floor(winner, &tags, config, &branch, &head);

    let commits_since_source =
        commits_since(repo, &head.sha, base_source.as_ref().map(|c| c.sha.as_str()));

    Ok(post_process(
        final_version,
        deployment_mode,
        base_source.as_ref(),
        &branch,
        &head,
        commits_since_source,
        repo.uncommitted_count(),
    ))
}

/// Check whether the tagged commit carrying a matching label sits on HEAD.
/// Spec.md §4.6 describes two short-circuits (before and after increment
/// resolution); since the label-match predicate this check relies on
/// doesn't depend on the resolved increment field, both collapse into a
/// single check performed once per effective configuration.
fn try_tag_on_head_short_circuit<R: GitRepositoryView>(
    repo: &R,
    config: &Config,
    effective: &EffectiveConfiguration,
    branch: &BranchRef,
    head: &CommitInfo,
) -> Option<SemanticVersion> {
    if !effective.prevent_increment_when_current_commit_tagged {
        return None;
    }

    let label = resolve_label(effective, &branch.friendly_name);
    let mut matching: Vec<SemanticVersion> = repo
        .tags()
        .into_iter()
        .filter(|t| t.target_sha == head.sha)
        .filter_map(|t| {
            SemanticVersion::parse(&t.name, &effective.tag_prefix, effective.semantic_version_format).ok()
        })
        .filter(|v| v.is_match_for_branch_specific_label(&label))
        .collect();
    matching.sort();
    let tagged = matching.pop()?;

    let mut version = tagged;
    if effective.deployment_mode == crate::config::DeploymentMode::ContinuousDeployment {
        version.pre_release = None;
    }
    let build = BuildMetadata {
        source_sha: Some(head.sha.clone()),
        commits_since_source: 0,
        branch_name: Some(branch.friendly_name.clone()),
        commit_sha: Some(head.sha.clone()),
        short_sha: Some(head.short_sha()),
        commit_timestamp: Some(head.when),
        uncommitted_count: repo.uncommitted_count(),
    };
    let _ = config;
    Some(version.with_build(build))
}

fn is_ignored(config: &Config, candidate: &BaseVersion) -> bool {
    match &candidate.base_version_source {
        Some(commit) => config
            .ignore
            .commit_ignore_reason(&commit.sha, commit.when)
            .is_some(),
        None => false,
    }
}

/// Arbitration per spec.md §4.6: highest incremented version wins; ties
/// prefer the oldest base-version source; a stable winner restricts to
/// stable-based candidates before falling back to sourceless candidates.
///
/// Spec.md §4.6 step 4 ("if none has a source, fall back to the highest
/// with a null source") only makes sense read as a priority tier, not a
/// tie-only rule: `Fallback` is a last resort so every branch has *some*
/// candidate (spec.md §4.3), not a competitor against a strategy that
/// actually anchored to real history. So whenever at least one candidate
/// carries a `base_version_source`, sourceless candidates are excluded
/// from contention entirely rather than only losing ties.
fn arbitrate(candidates: Vec<NextVersion>) -> Option<NextVersion> {
    if candidates.is_empty() {
        return None;
    }

    let sourced: Vec<NextVersion> = candidates
        .iter()
        .filter(|c| c.base_version.base_version_source.is_some())
        .cloned()
        .collect();
    let pool: &[NextVersion] = if sourced.is_empty() { &candidates } else { &sourced };

    let max_version = pool.iter().map(|c| c.incremented_version.clone()).max()?;
    let tied: Vec<NextVersion> = pool
        .iter()
        .filter(|c| c.incremented_version == max_version)
        .cloned()
        .collect();

    if tied.len() > 1 {
        let with_source: Vec<&NextVersion> = tied
            .iter()
            .filter(|c| c.base_version.base_version_source.is_some())
            .collect();
        if !with_source.is_empty() {
            return with_source
                .into_iter()
                .min_by_key(|c| c.base_version.base_version_source.as_ref().unwrap().when)
                .cloned();
        }
    }

    if max_version.pre_release.is_none() {
        let stable_based: Vec<&NextVersion> = pool
            .iter()
            .filter(|c| !c.base_version.semantic_version.is_prerelease())
            .collect();
        if !stable_based.is_empty() {
            return stable_based
                .into_iter()
                .max_by(|a, b| {
                    a.incremented_version.cmp(&b.incremented_version).then_with(|| {
                        let aw = a
                            .base_version
                            .base_version_source
                            .as_ref()
                            .map(|c| c.when)
                            .unwrap_or(i64::MIN);
                        let bw = b
                            .base_version
                            .base_version_source
                            .as_ref()
                            .map(|c| c.when)
                            .unwrap_or(i64::MIN);
                        aw.cmp(&bw)
                    })
                })
                .cloned();
        }
    }

    let with_null_source: Vec<&NextVersion> = pool
        .iter()
        .filter(|c| c.base_version.base_version_source.is_none())
        .collect();
    if !with_null_source.is_empty() {
        return with_null_source
            .into_iter()
            .max_by(|a, b| a.incremented_version.cmp(&b.incremented_version))
            .cloned();
    }

    tied.into_iter().next()
}

/// Lift the major/minor/patch triple to the highest tagged version on the
/// winning branch (not ignored, not newer than HEAD) if the computed value
/// is lower, ignoring pre-release in the comparison.
fn apply_alternative_floor<R: GitRepositoryView>(
    winner: NextVersion,
    tags: &TaggedVersionRepository<R>,
    config: &Config,
    branch: &BranchRef,
    head: &CommitInfo,
) -> SemanticVersion {
    let on_branch = tags.tagged_versions_of_branch(
        config,
        &winner.effective_configuration.tag_prefix,
        winner.effective_configuration.semantic_version_format,
        &branch.friendly_name,
    );
    let floor = on_branch
        .values()
        .flatten()
        .filter(|v| v.commit_when <= head.when)
        .map(|v| (v.version.major, v.version.minor, v.version.patch))
        .max();

    match floor {
        Some(alt) => winner.incremented_version.with_alternative_floor(alt),
        None => winner.incremented_version,
    }
}

/// Commits strictly between `base_version_source` (exclusive) and `head`
/// (inclusive), used for the `commits_since_source` build metadata field.
pub fn commits_since<R: GitRepositoryView>(
    repo: &R,
    head_sha: &str,
    base_version_source: Option<&str>,
) -> u32 {
    let mut count = 0u32;
    for commit in repo.commits(head_sha) {
        if Some(commit.sha.as_str()) == base_version_source {
            break;
        }
        count += 1;
    }
    count
}
