//! Tagged Version Repository: extracts tags from the Git view, parses them
//! as versions, and offers cached, filtered lookups scoped by branch, merge
//! target, or branch class (main / release).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::config::{resolve_label, Config, EffectiveConfiguration, IgnoreConfig};
use crate::git::GitRepositoryView;
use crate::version::SemanticVersion;

/// A parsed version bound to the commit and tag name it was read from.
#[derive(Debug, Clone)]
pub struct SemanticVersionWithTag {
    pub version: SemanticVersion,
    pub tag_name: String,
    pub commit_sha: String,
    pub commit_when: i64,
}

/// Commit sha -> every version tagged at that commit.
pub type TagsByCommit = HashMap<String, Vec<SemanticVersionWithTag>>;

#[derive(Eq, PartialEq, Hash, Clone)]
struct BranchCacheKey {
    branch: String,
    prefix: String,
    format_tag: &'static str,
}

#[derive(Eq, PartialEq, Hash, Clone)]
struct GlobalCacheKey {
    prefix: String,
    format_tag: &'static str,
}

/// A `Mutex<HashMap<K, Arc<V>>>` get-or-insert primitive: concurrent-read
/// safe, first writer wins (see spec.md §5). Duplicate computation by
/// racing producers is acceptable since producers are pure.
struct TagCache<K, V> {
    inner: Mutex<HashMap<K, Arc<V>>>,
}

impl<K: Eq + std::hash::Hash + Clone, V> TagCache<K, V> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_insert_with(&self, key: K, label: &str, produce: impl FnOnce() -> V) -> Arc<V> {
        {
            let guard = self.inner.lock().unwrap();
            if let Some(hit) = guard.get(&key) {
                debug!(cache = label, "tagged version repository cache hit");
                return Arc::clone(hit);
            }
        }
        let value = Arc::new(produce());
        let mut guard = self.inner.lock().unwrap();
        Arc::clone(guard.entry(key).or_insert(value))
    }
}

/// Owns the three memoised tag lookups spec.md §4.2 describes, scoped to
/// one calculation: a fresh repository is built per top-level invocation
/// (see `lib.rs`), so caches never outlive a single run.
pub struct TaggedVersionRepository<'a, R: GitRepositoryView> {
    repo: &'a R,
    by_branch: TagCache<BranchCacheKey, TagsByCommit>,
    by_merge_target: TagCache<BranchCacheKey, TagsByCommit>,
    global: TagCache<GlobalCacheKey, TagsByCommit>,
}

impl<'a, R: GitRepositoryView> TaggedVersionRepository<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            by_branch: TagCache::new(),
            by_merge_target: TagCache::new(),
            global: TagCache::new(),
        }
    }

    /// Global commit -> tagged-versions map, filtered by ignore rules.
    /// Unparseable tags are dropped and logged at `debug!`.
    fn tagged_versions(
        &self,
        prefix: &str,
        format: crate::config::SemanticVersionFormat,
        ignore: &IgnoreConfig,
    ) -> Arc<TagsByCommit> {
        let key = GlobalCacheKey {
            prefix: prefix.to_string(),
            format_tag: format_tag(format),
        };
        self.global.get_or_insert_with(key, "global", || {
            let mut map: TagsByCommit = HashMap::new();
            for tag in self.repo.tags() {
                let Some(commit) = self.repo.commit(&tag.target_sha) else {
                    continue;
                };
                if ignore.commit_ignore_reason(&commit.sha, commit.when).is_some() {
                    debug!(tag = %tag.name, "tag excluded by ignore configuration");
                    continue;
                }
                match SemanticVersion::parse(&tag.name, prefix, format) {
                    Ok(version) => {
                        map.entry(commit.sha.clone()).or_default().push(
                            SemanticVersionWithTag {
                                version,
                                tag_name: tag.name.clone(),
                                commit_sha: commit.sha.clone(),
                                commit_when: commit.when,
                            },
                        );
                    }
                    Err(_) => {
                        debug!(tag = %tag.name, "tag is not a parseable semantic version");
                    }
                }
            }
            map
        })
    }

    /// Every commit reachable from `branch` (post-ignore-filter), paired
    /// with any versions parsed from tags on that commit.
    pub fn tagged_versions_of_branch(
        &self,
        config: &Config,
        prefix: &str,
        format: crate::config::SemanticVersionFormat,
        branch: &str,
    ) -> Arc<TagsByCommit> {
        let key = BranchCacheKey {
            branch: branch.to_string(),
            prefix: prefix.to_string(),
            format_tag: format_tag(format),
        };
        self.by_branch.get_or_insert_with(key, "by_branch", || {
            let global = self.tagged_versions(prefix, format, &config.ignore);
            let Some(branch_ref) = self.repo.branch_by_name(branch) else {
                return TagsByCommit::new();
            };
            let mut map = TagsByCommit::new();
            for commit in self.repo.commits(&branch_ref.tip) {
                if let Some(versions) = global.get(&commit.sha) {
                    map.insert(commit.sha.clone(), versions.clone());
                }
            }
            map
        })
    }

    /// Same as `tagged_versions_of_branch`, but records a version against
    /// the *child* commit whose parent carries the tag.
    pub fn tagged_versions_of_merge_target(
        &self,
        config: &Config,
        prefix: &str,
        format: crate::config::SemanticVersionFormat,
        branch: &str,
    ) -> Arc<TagsByCommit> {
        let key = BranchCacheKey {
            branch: branch.to_string(),
            prefix: prefix.to_string(),
            format_tag: format_tag(format),
        };
        self.by_merge_target
            .get_or_insert_with(key, "by_merge_target", || {
                let global = self.tagged_versions(prefix, format, &config.ignore);
                let Some(branch_ref) = self.repo.branch_by_name(branch) else {
                    return TagsByCommit::new();
                };
                let mut map = TagsByCommit::new();
                for commit in self.repo.commits(&branch_ref.tip) {
                    for parent_sha in &commit.parents {
                        if let Some(versions) = global.get(parent_sha) {
                            map.entry(commit.sha.clone())
                                .or_default()
                                .extend(versions.iter().cloned());
                        }
                    }
                }
                map
            })
    }

    fn tagged_versions_of_branches(
        &self,
        config: &Config,
        prefix: &str,
        format: crate::config::SemanticVersionFormat,
        branches: &[String],
    ) -> TagsByCommit {
        let mut out = TagsByCommit::new();
        for branch in branches {
            let map = self.tagged_versions_of_branch(config, prefix, format, branch);
            for (commit, versions) in map.iter() {
                out.entry(commit.clone()).or_default().extend(versions.iter().cloned());
            }
        }
        out
    }

    /// Union across all main branches, excluding `exclude`.
    pub fn tagged_versions_of_main_branches(
        &self,
        config: &Config,
        prefix: &str,
        format: crate::config::SemanticVersionFormat,
        exclude: &str,
    ) -> TagsByCommit {
        let names: Vec<String> = self
            .repo
            .main_branches(config, &[exclude.to_string()])
            .into_iter()
            .map(|b| b.friendly_name)
            .collect();
        self.tagged_versions_of_branches(config, prefix, format, &names)
    }

    /// Union across all release branches, excluding `exclude`.
    pub fn tagged_versions_of_release_branches(
        &self,
        config: &Config,
        prefix: &str,
        format: crate::config::SemanticVersionFormat,
        exclude: &str,
    ) -> TagsByCommit {
        let names: Vec<String> = self
            .repo
            .release_branches(config, &[exclude.to_string()])
            .into_iter()
            .map(|b| b.friendly_name)
            .collect();
        self.tagged_versions_of_branches(config, prefix, format, &names)
    }

    /// Composes the four sources spec.md §4.2 lists, de-duplicates, filters
    /// by branch-specific label and age, and flattens to a single list.
    pub fn all_tagged_versions(
        &self,
        config: &Config,
        effective: &EffectiveConfiguration,
        branch: &str,
        label: &str,
        not_older_than: i64,
    ) -> Vec<SemanticVersionWithTag> {
        let mut all: TagsByCommit = (*self.tagged_versions_of_branch(
            config,
            &effective.tag_prefix,
            effective.semantic_version_format,
            branch,
        ))
        .clone();

        if effective.track_merge_target {
            let merge_target = self.tagged_versions_of_merge_target(
                config,
                &effective.tag_prefix,
                effective.semantic_version_format,
                branch,
            );
            for (commit, versions) in merge_target.iter() {
                all.entry(commit.clone()).or_default().extend(versions.iter().cloned());
            }
        }

        if effective.tracks_release_branches {
            let release = self.tagged_versions_of_release_branches(
                config,
                &effective.tag_prefix,
                effective.semantic_version_format,
                branch,
            );
            for (commit, versions) in release {
                all.entry(commit).or_default().extend(versions);
            }
        }

        if !effective.is_main_branch && !effective.is_release_branch {
            let main = self.tagged_versions_of_main_branches(
                config,
                &effective.tag_prefix,
                effective.semantic_version_format,
                branch,
            );
            for (commit, versions) in main {
                all.entry(commit).or_default().extend(versions);
            }
        }

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for versions in all.into_values() {
            for v in versions {
                if v.commit_when > not_older_than {
                    continue;
                }
                if !v.version.is_match_for_branch_specific_label(label) {
                    continue;
                }
                let key = (v.commit_sha.clone(), v.tag_name.clone());
                if seen.insert(key) {
                    out.push(v);
                }
            }
        }
        out
    }
}

fn format_tag(format: crate::config::SemanticVersionFormat) -> &'static str {
    match format {
        crate::config::SemanticVersionFormat::Strict => "strict",
        crate::config::SemanticVersionFormat::Loose => "loose",
    }
}
