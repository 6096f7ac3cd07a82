//! Increment Strategy Finder: resolves the increment field for a base
//! version candidate that did not already bring its own (V1 candidates —
//! V2 candidates like trunk-based and configured-next-version already know
//! their increment and are returned unchanged).

use crate::git::{CommitInfo, GitRepositoryView};
use crate::strategies::{BaseVersion, StrategyContext};
use crate::trunk::parse_bump_message;
use crate::version::IncrementField;

/// Resolution order (spec.md §4.5):
/// 1. An explicit non-`Inherit` increment on the effective configuration
///    wins outright.
/// 2. Otherwise scan commit messages strictly between
///    `base_version_source` (exclusive) and the current commit (inclusive)
///    for `+semver:` directives, honouring `CommitMessageIncrementMode`,
///    and take the maximum seen.
/// 3. If nothing drove a change and the base version already matches the
///    target label, return `None` to preserve identity.
pub fn find_increment<R: GitRepositoryView>(
    ctx: &StrategyContext<R>,
    candidate: &BaseVersion,
    label: &str,
) -> IncrementField {
    if let Some(explicit) = candidate.increment {
        return explicit;
    }

    if ctx.effective.increment != IncrementField::None
        && ctx.effective.increment != IncrementField::Inherit
    {
        return ctx.effective.increment;
    }

    let commits_between = commits_strictly_between(ctx, candidate);
    let mut max_field: Option<IncrementField> = None;
    for commit in &commits_between {
        if let Some(field) = parse_bump_message(
            &commit.message,
            ctx.effective.commit_message_incrementing,
            commit.is_merge(),
        ) {
            max_field = Some(max_field.map(|m| m.max(field)).unwrap_or(field));
        }
    }

    if let Some(field) = max_field {
        return field;
    }

    if candidate
        .semantic_version
        .is_match_for_branch_specific_label(label)
    {
        return IncrementField::None;
    }

    // No explicit directive and the label is switching: the minimal bump
    // that actually produces a new version under the new label.
    IncrementField::Patch
}

fn commits_strictly_between<R: GitRepositoryView>(
    ctx: &StrategyContext<R>,
    candidate: &BaseVersion,
) -> Vec<CommitInfo> {
    let base_sha = candidate.base_version_source.as_ref().map(|c| c.sha.clone());
    let mut result = Vec::new();
    for commit in ctx.repo.commits(&ctx.head.sha) {
        if Some(&commit.sha) == base_sha.as_ref() {
            break;
        }
        result.push(commit);
    }
    result
}
