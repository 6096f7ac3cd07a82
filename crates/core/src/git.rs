//! The read-only view of a Git repository the kernel consumes.
//!
//! `GitRepositoryView` is the seam spec.md §6 calls "Git adapter interface
//! (consumed)": branches, tags, commits, and merge bases, with no mutation
//! and no I/O beyond the initial eager load. `GixRepositoryView` is the real
//! adapter, built on `gix`, mirroring the teacher's `Repository` wrapper.
//! `FakeRepository` is the in-memory test double used throughout
//! `crates/core/tests`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{NextVerError, Result};

/// A single commit: identity, timestamps, parents, and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub when: i64,
    pub parents: Vec<String>,
    pub message: String,
}

impl CommitInfo {
    pub fn short_sha(&self) -> String {
        self.sha.chars().take(7).collect()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// A branch name, in both canonical (`refs/heads/main`) and friendly
/// (`main`) form, plus its tip commit sha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub friendly_name: String,
    pub canonical_name: String,
    pub tip: String,
}

/// A tag reference resolved down to the commit it points at (tags on
/// annotated tag objects are peeled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub target_sha: String,
}

/// The read-only repository surface the kernel consumes. Eager and
/// non-blocking per spec.md §5: implementations resolve everything up
/// front, no suspension points inside the kernel.
pub trait GitRepositoryView {
    fn branches(&self) -> Vec<BranchRef>;
    fn tags(&self) -> Vec<TagRef>;
    fn head_sha(&self) -> Option<String>;
    fn current_branch(&self) -> Option<BranchRef>;
    fn uncommitted_count(&self) -> u32;

    fn commit(&self, sha: &str) -> Option<CommitInfo>;

    /// Ancestor walk from `tip` along first-parent lineage, tip first.
    fn commits(&self, tip: &str) -> Vec<CommitInfo>;

    /// Nearest common ancestor of two commits, if any.
    fn merge_base(&self, a: &str, b: &str) -> Option<String>;

    fn branch_by_name(&self, friendly_name: &str) -> Option<BranchRef> {
        self.branches()
            .into_iter()
            .find(|b| b.friendly_name == friendly_name)
    }

    /// Every branch whose friendly name matches the configured main-branch
    /// pattern, excluding the names in `exclude`.
    fn main_branches(&self, config: &Config, exclude: &[String]) -> Vec<BranchRef> {
        self.branches()
            .into_iter()
            .filter(|b| config.is_main_branch_name(&b.friendly_name))
            .filter(|b| !exclude.contains(&b.friendly_name))
            .collect()
    }

    /// Every branch whose friendly name matches the configured
    /// release-branch pattern, excluding the names in `exclude`.
    fn release_branches(&self, config: &Config, exclude: &[String]) -> Vec<BranchRef> {
        self.branches()
            .into_iter()
            .filter(|b| config.is_release_branch_name(&b.friendly_name))
            .filter(|b| !exclude.contains(&b.friendly_name))
            .collect()
    }
}

/// `gix`-backed adapter: discovers a repository on disk and eagerly
/// resolves branches, tags, and commits into plain data so the kernel never
/// touches the object database mid-calculation.
pub struct GixRepositoryView {
    repo: gix::Repository,
}

impl GixRepositoryView {
    /// Discover and open a Git repository starting at `path`.
    pub fn discover(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let repo = gix::discover(&path)
            .map_err(|e| NextVerError::GitRepoNotFound(format!("{}: {}", path.display(), e)))?;
        Ok(Self { repo })
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    fn commit_info(&self, id: gix::ObjectId) -> Option<CommitInfo> {
        let commit = self.repo.find_object(id).ok()?.try_into_commit().ok()?;
        let message = commit
            .message()
            .map(|m| m.title.to_string())
            .unwrap_or_default();
        let when = commit
            .time()
            .map(|t| t.seconds)
            .unwrap_or(0);
        let parents = commit.parent_ids().map(|p| p.detach().to_string()).collect();
        Some(CommitInfo {
            sha: id.to_string(),
            when,
            parents,
            message,
        })
    }
}

impl GitRepositoryView for GixRepositoryView {
    fn branches(&self) -> Vec<BranchRef> {
        let Ok(refs) = self.repo.references() else {
            return Vec::new();
        };
        let Ok(local_branches) = refs.local_branches() else {
            return Vec::new();
        };
        local_branches
            .flatten()
            .filter_map(|mut r| {
                let canonical_name = r.name().as_bstr().to_string();
                let friendly_name = r.name().shorten().to_string();
                let tip = r.peel_to_id().ok()?.detach().to_string();
                Some(BranchRef {
                    friendly_name,
                    canonical_name,
                    tip,
                })
            })
            .collect()
    }

    fn tags(&self) -> Vec<TagRef> {
        let Ok(refs) = self.repo.references() else {
            return Vec::new();
        };
        let Ok(tag_refs) = refs.tags() else {
            return Vec::new();
        };
        tag_refs
            .flatten()
            .filter_map(|mut r| {
                let name = r.name().shorten().to_string();
                let target_sha = r.peel_to_id().ok()?.detach().to_string();
                Some(TagRef { name, target_sha })
            })
            .collect()
    }

    fn head_sha(&self) -> Option<String> {
        let mut head = self.repo.head().ok()?;
        head.try_peel_to_id().ok().flatten().map(|id| id.detach().to_string())
    }

    fn current_branch(&self) -> Option<BranchRef> {
        let head = self.repo.head().ok()?;
        let name = head.referent_name()?.shorten().to_string();
        self.branch_by_name(&name)
    }

    fn uncommitted_count(&self) -> u32 {
        self.repo
            .status(gix::progress::Discard)
            .ok()
            .and_then(|s| s.into_iter(None).ok())
            .map(|iter| iter.filter_map(|item| item.ok()).count() as u32)
            .unwrap_or(0)
    }

    fn commit(&self, sha: &str) -> Option<CommitInfo> {
        let id = gix::ObjectId::from_hex(sha.as_bytes()).ok()?;
        self.commit_info(id)
    }

    fn commits(&self, tip: &str) -> Vec<CommitInfo> {
        let Some(start) = gix::ObjectId::from_hex(tip.as_bytes()).ok() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut current = start;
        loop {
            let Some(info) = self.commit_info(current) else {
                break;
            };
            let next = info.parents.first().cloned();
            out.push(info);
            match next.and_then(|p| gix::ObjectId::from_hex(p.as_bytes()).ok()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        out
    }

    fn merge_base(&self, a: &str, b: &str) -> Option<String> {
        let id_a = gix::ObjectId::from_hex(a.as_bytes()).ok()?;
        let id_b = gix::ObjectId::from_hex(b.as_bytes()).ok()?;
        self.repo
            .merge_base(id_a, id_b)
            .ok()
            .map(|id| id.detach().to_string())
    }
}

/// Check whether `path` is inside a Git working directory.
pub fn is_git_directory(path: impl Into<PathBuf>) -> bool {
    gix::discover(path.into()).is_ok()
}

/// In-memory test double: a fixed set of commits, branches, and tags wired
/// up by hand, used by `crates/core/tests` instead of shelling out to real
/// Git processes.
#[derive(Debug, Clone, Default)]
pub struct FakeRepository {
    pub commits: HashMap<String, CommitInfo>,
    pub branches: Vec<BranchRef>,
    pub tags: Vec<TagRef>,
    pub head: Option<String>,
    pub current_branch_name: Option<String>,
    pub uncommitted: u32,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commit(mut self, sha: &str, when: i64, parents: &[&str], message: &str) -> Self {
        self.commits.insert(
            sha.to_string(),
            CommitInfo {
                sha: sha.to_string(),
                when,
                parents: parents.iter().map(|s| s.to_string()).collect(),
                message: message.to_string(),
            },
        );
        self
    }

    pub fn with_branch(mut self, friendly_name: &str, tip: &str) -> Self {
        self.branches.push(BranchRef {
            friendly_name: friendly_name.to_string(),
            canonical_name: format!("refs/heads/{friendly_name}"),
            tip: tip.to_string(),
        });
        self
    }

    pub fn with_tag(mut self, name: &str, target_sha: &str) -> Self {
        self.tags.push(TagRef {
            name: name.to_string(),
            target_sha: target_sha.to_string(),
        });
        self
    }

    pub fn with_head(mut self, sha: &str, branch_name: &str) -> Self {
        self.head = Some(sha.to_string());
        self.current_branch_name = Some(branch_name.to_string());
        self
    }
}

impl GitRepositoryView for FakeRepository {
    fn branches(&self) -> Vec<BranchRef> {
        self.branches.clone()
    }

    fn tags(&self) -> Vec<TagRef> {
        self.tags.clone()
    }

    fn head_sha(&self) -> Option<String> {
        self.head.clone()
    }

    fn current_branch(&self) -> Option<BranchRef> {
        let name = self.current_branch_name.as_ref()?;
        self.branch_by_name(name)
    }

    fn uncommitted_count(&self) -> u32 {
        self.uncommitted
    }

    fn commit(&self, sha: &str) -> Option<CommitInfo> {
        self.commits.get(sha).cloned()
    }

    fn commits(&self, tip: &str) -> Vec<CommitInfo> {
        let mut out = Vec::new();
        let mut current = Some(tip.to_string());
        while let Some(sha) = current {
            let Some(info) = self.commits.get(&sha) else {
                break;
            };
            let next = info.parents.first().cloned();
            out.push(info.clone());
            current = next;
        }
        out
    }

    fn merge_base(&self, a: &str, b: &str) -> Option<String> {
        let ancestors_of = |start: &str| -> Vec<String> {
            self.commits(start).into_iter().map(|c| c.sha).collect()
        };
        let a_chain = ancestors_of(a);
        let b_chain: std::collections::HashSet<String> = ancestors_of(b).into_iter().collect();
        a_chain.into_iter().find(|sha| b_chain.contains(sha))
    }
}
