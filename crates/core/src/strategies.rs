//! Base Version Strategies: a plug-in set of producers, each proposing zero
//! or more candidate base versions with rationale.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::{
    resolve_label, sanitize_branch_label, Config, EffectiveConfiguration, LabelSetting,
    SemanticVersionFormat, VersionStrategy,
};
use crate::git::{BranchRef, CommitInfo, GitRepositoryView};
use crate::tags::TaggedVersionRepository;
use crate::trunk::run_trunk_iteration;
use crate::version::{IncrementField, SemanticVersion};

static MERGE_MESSAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Mm]erge (?:branch|pull request) .*?['\x22]?(?P<branch>[\w./-]*?(?P<ver>\d+\.\d+(?:\.\d+)?(?:-[0-9A-Za-z.-]+)?))['\x22]?").unwrap());

static BRANCH_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<ver>\d+\.\d+(?:\.\d+)?)").unwrap());

/// A candidate prior version the calculator considers incrementing from.
///
/// `increment`/`label`/`force_increment`/`alternative_semantic_version` are
/// the V2 extension (spec.md §3): `None` means "not yet resolved, let the
/// Increment Strategy Finder and branch label resolution decide"; `Some`
/// means the strategy that produced this candidate already knows the
/// answer (trunk-based iteration, an explicit configured version).
#[derive(Debug, Clone)]
pub struct BaseVersion {
    pub source: String,
    pub should_increment: bool,
    pub semantic_version: SemanticVersion,
    pub base_version_source: Option<CommitInfo>,
    pub branch_name_override: Option<String>,
    pub increment: Option<IncrementField>,
    pub label: Option<String>,
    pub force_increment: bool,
    pub alternative_semantic_version: Option<(u64, u64, u64)>,
}

impl BaseVersion {
    fn v1(source: &str, should_increment: bool, semantic_version: SemanticVersion) -> Self {
        Self {
            source: source.to_string(),
            should_increment,
            semantic_version,
            base_version_source: None,
            branch_name_override: None,
            increment: None,
            label: None,
            force_increment: false,
            alternative_semantic_version: None,
        }
    }

    fn with_source_commit(mut self, commit: CommitInfo) -> Self {
        self.base_version_source = Some(commit);
        self
    }
}

/// The closed set of base-version strategies spec.md §4.3 and §9 describe.
/// Dispatched with `match`, not a trait-object hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Fallback,
    CurrentCommitTag,
    MergeMessage,
    VersionInBranchName,
    TaggedVersion,
    TrunkBased,
    ConfiguredNextVersion,
}

impl Strategy {
    /// The strategies selected by an effective configuration's
    /// `version_strategies` set, in a fixed evaluation order.
    pub fn enabled_for(effective: &EffectiveConfiguration) -> Vec<Strategy> {
        const ORDER: [(VersionStrategy, Strategy); 6] = [
            (VersionStrategy::ConfiguredNextVersion, Strategy::ConfiguredNextVersion),
            (VersionStrategy::TaggedVersion, Strategy::CurrentCommitTag),
            (VersionStrategy::MergeMessage, Strategy::MergeMessage),
            (VersionStrategy::VersionInBranchName, Strategy::VersionInBranchName),
            (VersionStrategy::TaggedVersion, Strategy::TaggedVersion),
            (VersionStrategy::TrunkBased, Strategy::TrunkBased),
        ];
        let mut strategies: Vec<Strategy> = ORDER
            .iter()
            .filter(|(flag, _)| effective.version_strategies.contains(flag))
            .map(|(_, s)| *s)
            .collect();
        // Fallback always participates so every branch has a candidate.
        strategies.push(Strategy::Fallback);
        strategies
    }
}

/// Everything a strategy needs to propose candidates for one branch.
pub struct StrategyContext<'a, R: GitRepositoryView> {
    pub repo: &'a R,
    pub tags: &'a TaggedVersionRepository<'a, R>,
    pub config: &'a Config,
    pub effective: &'a EffectiveConfiguration,
    pub branch: &'a BranchRef,
    pub head: &'a CommitInfo,
    pub label: &'a str,
}

/// Run one strategy, returning zero or more candidates.
pub fn propose<R: GitRepositoryView>(strategy: Strategy, ctx: &StrategyContext<R>) -> Vec<BaseVersion> {
    match strategy {
        Strategy::Fallback => vec![BaseVersion::v1(
            "Fallback",
            true,
            SemanticVersion::new(0, 0, 0),
        )],
        Strategy::ConfiguredNextVersion => propose_configured_next_version(ctx),
        Strategy::CurrentCommitTag => propose_current_commit_tag(ctx),
        Strategy::MergeMessage => propose_merge_message(ctx),
        Strategy::VersionInBranchName => propose_version_in_branch_name(ctx),
        Strategy::TaggedVersion => propose_tagged_version(ctx),
        Strategy::TrunkBased => propose_trunk_based(ctx),
    }
}

fn propose_configured_next_version<R: GitRepositoryView>(ctx: &StrategyContext<R>) -> Vec<BaseVersion> {
    let Some(raw) = &ctx.effective.next_version else {
        return Vec::new();
    };
    match SemanticVersion::parse(raw, "", ctx.effective.semantic_version_format) {
        Ok(version) => vec![BaseVersion::v1("ConfiguredNextVersion", false, version)],
        Err(e) => {
            debug!(error = %e, "configured next_version is not a parseable semantic version");
            Vec::new()
        }
    }
}

fn propose_current_commit_tag<R: GitRepositoryView>(ctx: &StrategyContext<R>) -> Vec<BaseVersion> {
    ctx.repo
        .tags()
        .into_iter()
        .filter(|t| t.target_sha == ctx.head.sha)
        .filter_map(|t| {
            SemanticVersion::parse(&t.name, &ctx.effective.tag_prefix, ctx.effective.semantic_version_format).ok()
        })
        .filter(|v| v.is_match_for_branch_specific_label(ctx.label))
        .map(|v| BaseVersion::v1("CurrentCommitTag", false, v).with_source_commit(ctx.head.clone()))
        .collect()
}

fn propose_merge_message<R: GitRepositoryView>(ctx: &StrategyContext<R>) -> Vec<BaseVersion> {
    ctx.repo
        .commits(&ctx.branch.tip)
        .into_iter()
        .filter(|c| c.is_merge())
        .filter_map(|c| {
            let caps = MERGE_MESSAGE_RE.captures(&c.message)?;
            let ver = caps.name("ver")?.as_str();
            let branch_name = caps.name("branch").map(|m| m.as_str().to_string());
            let version = SemanticVersion::parse(ver, "", ctx.effective.semantic_version_format).ok()?;
            let mut bv = BaseVersion::v1("MergeMessage", true, version).with_source_commit(c);
            bv.branch_name_override = branch_name;
            Some(bv)
        })
        .collect()
}

fn propose_version_in_branch_name<R: GitRepositoryView>(ctx: &StrategyContext<R>) -> Vec<BaseVersion> {
    let Some(caps) = BRANCH_VERSION_RE.captures(&ctx.branch.friendly_name) else {
        return Vec::new();
    };
    let ver = &caps["ver"];
    if !looks_like_semver(ver) {
        debug!(branch = %ctx.branch.friendly_name, "branch-name version extraction rejected by semver sanity check");
        return Vec::new();
    }
    let Ok(version) = SemanticVersion::parse(ver, "", SemanticVersionFormat::Loose) else {
        return Vec::new();
    };
    vec![BaseVersion::v1("VersionInBranchName", true, version)]
}

/// Validate an extracted `X.Y[.Z]` substring with the `semver` crate before
/// trusting it, padding a missing patch component the way `VersionInBranchName`
/// loosely-formatted branch names (`release/2.x`, `support/1.4`) require.
fn looks_like_semver(candidate: &str) -> bool {
    let padded = match candidate.matches('.').count() {
        0 => format!("{candidate}.0.0"),
        1 => format!("{candidate}.0"),
        _ => candidate.to_string(),
    };
    semver::Version::parse(&padded).is_ok()
}

fn propose_tagged_version<R: GitRepositoryView>(ctx: &StrategyContext<R>) -> Vec<BaseVersion> {
    let not_older_than = ctx.head.when;
    let mut versions = ctx.tags.all_tagged_versions(
        ctx.config,
        ctx.effective,
        &ctx.branch.friendly_name,
        ctx.label,
        not_older_than,
    );
    versions.sort_by(|a, b| b.version.cmp(&a.version));
    versions
        .into_iter()
        .next()
        .map(|tagged| {
            let commit = ctx.repo.commit(&tagged.commit_sha);
            let mut bv = BaseVersion::v1("TaggedVersion", true, tagged.version);
            if let Some(commit) = commit {
                bv = bv.with_source_commit(commit);
            }
            bv
        })
        .into_iter()
        .collect()
}

fn propose_trunk_based<R: GitRepositoryView>(ctx: &StrategyContext<R>) -> Vec<BaseVersion> {
    let result = run_trunk_iteration(ctx);
    vec![BaseVersion {
        source: "TrunkBased".to_string(),
        should_increment: result.should_increment,
        semantic_version: result.semantic_version,
        base_version_source: result.base_version_source,
        branch_name_override: None,
        increment: Some(result.increment),
        label: Some(result.label),
        force_increment: result.force_increment,
        alternative_semantic_version: None,
    }]
}

/// Resolve a candidate's final label, honouring `branch_name_override`
/// when the strategy supplied one and falling back to the branch's own
/// effective label otherwise.
///
/// `resolve_label`'s `Inherit` arm treats the main branch as always stable,
/// independent of whatever branch name it's given — correct for the
/// current branch, but wrong for an override: a `MergeMessage` candidate
/// naming the branch it merged (e.g. `release/1.2.3` merged into `main`)
/// wants that branch's own derived label, not main's. So an override only
/// goes through `resolve_label`'s main-branch short-circuit when there's no
/// override; with one, and no explicit `Stable`/`Literal` configuration
/// overriding it, sanitize the override directly.
pub fn resolve_candidate_label(
    candidate: &BaseVersion,
    effective: &EffectiveConfiguration,
    branch_friendly_name: &str,
) -> String {
    if let Some(label) = &candidate.label {
        return label.clone();
    }
    match (&candidate.branch_name_override, &effective.label) {
        (Some(name), LabelSetting::Inherit) => sanitize_branch_label(name),
        _ => {
            let name = candidate
                .branch_name_override
                .as_deref()
                .unwrap_or(branch_friendly_name);
            resolve_label(effective, name)
        }
    }
}
