//! Trunk-Based Iterator: a state-machine walker over a linearised commit
//! sequence, emitting increments per commit based on matching incrementer
//! rules. Exactly one incrementer fires per commit.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::CommitMessageIncrementMode;
use crate::git::{CommitInfo, GitRepositoryView};
use crate::strategies::StrategyContext;
use crate::version::{IncrementField, SemanticVersion};

static BUMP_MESSAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\+semver:\s*(?P<field>major|minor|patch|breaking|feature|fix)").unwrap());

/// Mutable iteration state threaded through the single-threaded loop, per
/// spec.md §9: passed by exclusive reference rather than folded, which is
/// observably equivalent and easier to trace.
struct TrunkContext {
    base_version_source: Option<CommitInfo>,
    semantic_version: SemanticVersion,
    label: String,
    increment: IncrementField,
    force_increment: bool,
    should_increment: bool,
}

/// The aggregated `BaseVersionV2` the trunk-based strategy emits: the final
/// should-increment decision, the increment field (max of all increments
/// seen), the label, and the anchoring `base_version_source` commit.
pub struct TrunkResult {
    pub should_increment: bool,
    pub semantic_version: SemanticVersion,
    pub base_version_source: Option<CommitInfo>,
    pub increment: IncrementField,
    pub label: String,
    pub force_increment: bool,
}

/// Walk the branch's first-parent history from its oldest relevant
/// ancestor forward to HEAD, applying incrementers.
pub fn run_trunk_iteration<R: GitRepositoryView>(ctx: &StrategyContext<R>) -> TrunkResult {
    let mut commits = ctx.repo.commits(&ctx.branch.tip);
    commits.reverse();

    let mut state = TrunkContext {
        base_version_source: None,
        semantic_version: SemanticVersion::new(0, 0, 0),
        label: ctx.label.to_string(),
        increment: IncrementField::None,
        force_increment: false,
        should_increment: true,
    };

    for commit in &commits {
        if let Some(reason) = ctx
            .config
            .ignore
            .commit_ignore_reason(&commit.sha, commit.when)
        {
            debug!(commit = %commit.sha, reason, "commit ignored during trunk iteration");
            continue;
        }
        apply_incrementers(ctx, commit, &mut state);
    }

    TrunkResult {
        should_increment: state.should_increment,
        semantic_version: state.semantic_version,
        base_version_source: state.base_version_source,
        increment: state.increment,
        label: state.label,
        force_increment: state.force_increment,
    }
}

/// Find the highest-ranked parseable tag at `commit`, if any.
fn tag_version_at<R: GitRepositoryView>(
    ctx: &StrategyContext<R>,
    commit: &CommitInfo,
) -> Option<SemanticVersion> {
    let mut versions: Vec<SemanticVersion> = ctx
        .repo
        .tags()
        .into_iter()
        .filter(|t| t.target_sha == commit.sha)
        .filter_map(|t| {
            SemanticVersion::parse(
                &t.name,
                &ctx.effective.tag_prefix,
                ctx.effective.semantic_version_format,
            )
            .ok()
        })
        .collect();
    versions.sort();
    versions.pop()
}

/// Apply the ordered incrementer list to one commit. Exactly one branch
/// returns (fires) per call.
fn apply_incrementers<R: GitRepositoryView>(
    ctx: &StrategyContext<R>,
    commit: &CommitInfo,
    state: &mut TrunkContext,
) {
    let has_child_iteration = commit.is_merge();

    if ctx.effective.is_main_branch && !has_child_iteration {
        if let Some(tagged) = tag_version_at(ctx, commit) {
            // Commit-on-trunk-with-stable-tag / ...-with-pre-release-tag:
            // both anchor base_version_source to this commit and clear the
            // aggregated increment; they differ only in whether the label
            // is pinned to the branch's configured label.
            let is_stable = !tagged.is_prerelease();
            state.base_version_source = Some(commit.clone());
            state.semantic_version = tagged;
            state.should_increment = false;
            state.increment = IncrementField::None;
            state.force_increment = false;
            if is_stable {
                state.label = ctx.label.to_string();
            }
            return;
        }
    }

    if let Some(field) = parse_bump_message(
        &commit.message,
        ctx.effective.commit_message_incrementing,
        commit.is_merge(),
    ) {
        state.increment = state.increment.max(field);
        state.force_increment = true;
        state.should_increment = true;
        return;
    }

    if has_child_iteration {
        if let Some(field) = scan_merged_branch_for_increment(ctx, commit) {
            state.increment = state.increment.max(field);
            state.should_increment = true;
        }
        return;
    }

    // No incrementer precondition matched beyond "this commit exists": it
    // contributes to commits-since-source but changes no state.
}

/// `commit_message_incrementing` mode gate: `Enabled` considers every
/// commit, `MergeMessageOnly` only merge commits, `Disabled` never.
/// `MergeMessageOnly` and `Disabled` therefore agree for non-merge commits.
pub(crate) fn parse_bump_message(
    message: &str,
    mode: CommitMessageIncrementMode,
    is_merge: bool,
) -> Option<IncrementField> {
    match mode {
        CommitMessageIncrementMode::Disabled => None,
        CommitMessageIncrementMode::MergeMessageOnly if !is_merge => None,
        _ => {
            let caps = BUMP_MESSAGE_RE.captures(message)?;
            caps["field"].parse().ok()
        }
    }
}

/// Simplified (non-recursive) child-iteration approximation: for each
/// non-first parent of a merge commit, scan the commits unique to that side
/// (between the merge base and the parent) for bump-message directives and
/// aggregate the maximum. A fully recursive nested trunk context per merged
/// branch is not modelled.
fn scan_merged_branch_for_increment<R: GitRepositoryView>(
    ctx: &StrategyContext<R>,
    merge_commit: &CommitInfo,
) -> Option<IncrementField> {
    let first_parent = merge_commit.parents.first()?;
    let mut best: Option<IncrementField> = None;

    for other_parent in merge_commit.parents.iter().skip(1) {
        let base = ctx.repo.merge_base(first_parent, other_parent);
        for commit in ctx.repo.commits(other_parent) {
            if Some(&commit.sha) == base.as_ref() {
                break;
            }
            if let Some(field) = parse_bump_message(
                &commit.message,
                ctx.effective.commit_message_incrementing,
                commit.is_merge(),
            ) {
                best = Some(best.map(|b| b.max(field)).unwrap_or(field));
            }
        }
    }
    best
}
