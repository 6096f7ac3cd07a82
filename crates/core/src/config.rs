//! Configuration surface: global defaults, per-branch overrides, and the
//! merged "effective configuration" the calculator actually consumes.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{NextVerError, Result};
use crate::version::IncrementField;

/// How the three deployment modes in spec.md §4.6 post-process a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    ManualDeployment,
    ContinuousDelivery,
    ContinuousDeployment,
}

impl Default for DeploymentMode {
    fn default() -> Self {
        DeploymentMode::ManualDeployment
    }
}

/// Whether bump-messages (`+semver: major`) are honoured for a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMessageIncrementMode {
    Enabled,
    Disabled,
    MergeMessageOnly,
}

impl Default for CommitMessageIncrementMode {
    fn default() -> Self {
        CommitMessageIncrementMode::MergeMessageOnly
    }
}

/// Strict SemVer 2.0 tags only, or a looser "missing components allowed"
/// format used by some legacy tag schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticVersionFormat {
    Strict,
    Loose,
}

impl Default for SemanticVersionFormat {
    fn default() -> Self {
        SemanticVersionFormat::Strict
    }
}

/// The set of base-version strategies a branch configuration may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionStrategy {
    Fallback,
    MergeMessage,
    TaggedVersion,
    /// Not a proposer itself: widens `TaggedVersion`/trunk lookups to also
    /// consider tags on other release branches (consumed by
    /// `TaggedVersionRepository`, see `tags.rs`).
    TrackReleaseBranches,
    VersionInBranchName,
    TrunkBased,
    ConfiguredNextVersion,
}

fn default_version_strategies() -> HashSet<VersionStrategy> {
    [
        VersionStrategy::Fallback,
        VersionStrategy::MergeMessage,
        VersionStrategy::TaggedVersion,
        VersionStrategy::VersionInBranchName,
        VersionStrategy::TrunkBased,
    ]
    .into_iter()
    .collect()
}

/// A set of excluded commit shas plus a "before" cutoff timestamp (Unix
/// seconds), used to filter both commits during trunk iteration and version
/// candidates during arbitration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IgnoreConfig {
    #[serde(default)]
    pub shas: HashSet<String>,
    #[serde(default)]
    pub before: Option<i64>,
}

impl IgnoreConfig {
    /// `None` when the commit is not ignored, otherwise the reason (logged
    /// at `info!` by the caller as an `IgnoredError`).
    pub fn commit_ignore_reason(&self, sha: &str, when: i64) -> Option<String> {
        if self.shas.contains(sha) {
            return Some(format!("commit {sha} is in the ignore list"));
        }
        if let Some(before) = self.before {
            if when < before {
                return Some(format!("commit {sha} predates the ignore cutoff"));
            }
        }
        None
    }
}

/// The resolved `label` field: branch-derived, explicitly stable, or a
/// literal string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LabelSetting {
    /// No entry in configuration: inherit the parent scope's setting.
    Inherit,
    /// Explicit `label = ""`: stable, no pre-release ever.
    Stable,
    /// Explicit `label = "foo"`.
    Literal(String),
}

/// Per-branch overrides, matched against the current branch's friendly name
/// by `pattern` (a regex). Any field left `None` inherits the corresponding
/// global `Config` value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchConfig {
    pub pattern: String,
    pub increment: Option<IncrementField>,
    #[serde(default)]
    pub label: Option<LabelSetting>,
    pub deployment_mode: Option<DeploymentMode>,
    pub tag_prefix: Option<String>,
    pub track_merge_target: Option<bool>,
    pub tracks_release_branches: Option<bool>,
    pub is_main_branch: Option<bool>,
    pub is_release_branch: Option<bool>,
    pub semantic_version_format: Option<SemanticVersionFormat>,
    pub commit_message_incrementing: Option<CommitMessageIncrementMode>,
    pub prevent_increment_when_current_commit_tagged: Option<bool>,
    pub version_strategy: Option<HashSet<VersionStrategy>>,
    /// `ConfiguredNextVersion` strategy: an absolute override version.
    pub next_version: Option<String>,
}

/// The immutable, fully-resolved global + branch configuration the
/// calculator consumes for one branch.
///
/// One `EffectiveConfiguration` is produced per matching `BranchConfig`
/// pattern (spec.md §2: the calculator asks the effective-configuration
/// resolver for one or more branch configurations relevant to the current
/// branch); a branch matched by no pattern gets exactly one, built from
/// global defaults alone.
#[derive(Debug, Clone)]
pub struct EffectiveConfiguration {
    pub increment: IncrementField,
    pub label: LabelSetting,
    pub deployment_mode: DeploymentMode,
    pub tag_prefix: String,
    pub track_merge_target: bool,
    pub tracks_release_branches: bool,
    pub is_main_branch: bool,
    pub is_release_branch: bool,
    pub semantic_version_format: SemanticVersionFormat,
    pub commit_message_incrementing: CommitMessageIncrementMode,
    pub prevent_increment_when_current_commit_tagged: bool,
    pub version_strategies: HashSet<VersionStrategy>,
    pub next_version: Option<String>,
}

/// The global configuration value. Immutable once constructed; the only
/// mutation path is building a fresh `Config` via `from_toml_str`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub increment: IncrementField,
    #[serde(default = "default_label")]
    pub label: LabelSetting,
    pub deployment_mode: DeploymentMode,
    pub tag_prefix: String,
    pub track_merge_target: bool,
    pub tracks_release_branches: bool,
    pub semantic_version_format: SemanticVersionFormat,
    pub commit_message_incrementing: CommitMessageIncrementMode,
    pub prevent_increment_when_current_commit_tagged: bool,
    #[serde(default = "default_version_strategies")]
    pub version_strategy: HashSet<VersionStrategy>,
    pub main_branch_pattern: String,
    pub release_branch_pattern: String,
    #[serde(default)]
    pub ignore: IgnoreConfig,
    #[serde(default)]
    pub branches: Vec<BranchConfig>,
}

fn default_label() -> LabelSetting {
    LabelSetting::Inherit
}

impl Default for Config {
    fn default() -> Self {
        Self {
            increment: IncrementField::Inherit,
            label: LabelSetting::Inherit,
            deployment_mode: DeploymentMode::default(),
            tag_prefix: String::new(),
            track_merge_target: false,
            tracks_release_branches: false,
            semantic_version_format: SemanticVersionFormat::default(),
            commit_message_incrementing: CommitMessageIncrementMode::default(),
            prevent_increment_when_current_commit_tagged: true,
            version_strategy: default_version_strategies(),
            main_branch_pattern: r"^(main|master)$".to_string(),
            release_branch_pattern: r"^(release|support)[/-]".to_string(),
            ignore: IgnoreConfig::default(),
            branches: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a TOML configuration document and merge it onto the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.increment == IncrementField::Inherit {
            return Err(NextVerError::Configuration(
                "global `increment` cannot be `Inherit`: there is no parent scope to inherit from"
                    .to_string(),
            ));
        }
        for branch in &self.branches {
            if Regex::new(&branch.pattern).is_err() {
                return Err(NextVerError::Configuration(format!(
                    "invalid branch pattern regex: {}",
                    branch.pattern
                )));
            }
        }
        Ok(())
    }

    fn main_branch_regex(&self) -> Regex {
        Regex::new(&self.main_branch_pattern).unwrap_or_else(|_| MAIN_FALLBACK.clone())
    }

    fn release_branch_regex(&self) -> Regex {
        Regex::new(&self.release_branch_pattern).unwrap_or_else(|_| RELEASE_FALLBACK.clone())
    }

    /// All `EffectiveConfiguration`s relevant to `branch_name`: one per
    /// matching `branches` pattern, in declaration order, or exactly one
    /// built from the global defaults if nothing matches.
    pub fn effective_configurations_for(&self, branch_name: &str) -> Vec<EffectiveConfiguration> {
        let is_main = self.main_branch_regex().is_match(branch_name);
        let is_release = self.release_branch_regex().is_match(branch_name);

        let matching: Vec<&BranchConfig> = self
            .branches
            .iter()
            .filter(|b| {
                Regex::new(&b.pattern)
                    .map(|re| re.is_match(branch_name))
                    .unwrap_or(false)
            })
            .collect();

        if matching.is_empty() {
            return vec![self.effective_base(is_main, is_release)];
        }

        matching
            .into_iter()
            .map(|branch| self.merge_branch(branch, is_main, is_release))
            .collect()
    }

    fn effective_base(&self, is_main: bool, is_release: bool) -> EffectiveConfiguration {
        EffectiveConfiguration {
            increment: self.increment,
            label: self.label.clone(),
            deployment_mode: self.deployment_mode,
            tag_prefix: self.tag_prefix.clone(),
            track_merge_target: self.track_merge_target,
            tracks_release_branches: self.tracks_release_branches,
            is_main_branch: is_main,
            is_release_branch: is_release,
            semantic_version_format: self.semantic_version_format,
            commit_message_incrementing: self.commit_message_incrementing,
            prevent_increment_when_current_commit_tagged: self
                .prevent_increment_when_current_commit_tagged,
            version_strategies: self.version_strategy.clone(),
            next_version: None,
        }
    }

    fn merge_branch(
        &self,
        branch: &BranchConfig,
        is_main: bool,
        is_release: bool,
    ) -> EffectiveConfiguration {
        let mut effective = self.effective_base(is_main, is_release);
        if let Some(inc) = branch.increment {
            effective.increment = inc;
        }
        if let Some(label) = &branch.label {
            effective.label = label.clone();
        }
        if let Some(mode) = branch.deployment_mode {
            effective.deployment_mode = mode;
        }
        if let Some(prefix) = &branch.tag_prefix {
            effective.tag_prefix = prefix.clone();
        }
        if let Some(v) = branch.track_merge_target {
            effective.track_merge_target = v;
        }
        if let Some(v) = branch.tracks_release_branches {
            effective.tracks_release_branches = v;
        }
        if let Some(v) = branch.is_main_branch {
            effective.is_main_branch = v;
        }
        if let Some(v) = branch.is_release_branch {
            effective.is_release_branch = v;
        }
        if let Some(v) = branch.semantic_version_format {
            effective.semantic_version_format = v;
        }
        if let Some(v) = branch.commit_message_incrementing {
            effective.commit_message_incrementing = v;
        }
        if let Some(v) = branch.prevent_increment_when_current_commit_tagged {
            effective.prevent_increment_when_current_commit_tagged = v;
        }
        if let Some(v) = &branch.version_strategy {
            effective.version_strategies = v.clone();
        }
        effective.next_version = branch.next_version.clone();
        effective
    }

    pub fn is_main_branch_name(&self, name: &str) -> bool {
        self.main_branch_regex().is_match(name)
    }

    pub fn is_release_branch_name(&self, name: &str) -> bool {
        self.release_branch_regex().is_match(name)
    }
}

static MAIN_FALLBACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(main|master)$").unwrap());
static RELEASE_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(release|support)[/-]").unwrap());

/// Resolve a branch's effective label setting and the current branch name
/// into the concrete string `SemanticVersion::increment` expects: an empty
/// string means stable.
pub fn resolve_label(effective: &EffectiveConfiguration, branch_friendly_name: &str) -> String {
    match &effective.label {
        LabelSetting::Stable => String::new(),
        LabelSetting::Literal(s) => s.clone(),
        LabelSetting::Inherit => {
            if effective.is_main_branch {
                String::new()
            } else {
                sanitize_branch_label(branch_friendly_name)
            }
        }
    }
}

/// Escape everything but alphanumerics, mirroring the escaping scheme used
/// by trunk-based versioners (e.g. `feature/foo-bar` -> `feature-foo-bar`).
pub fn sanitize_branch_label(name: &str) -> String {
    let tail = name.rsplit('/').next().unwrap_or(name);
    tail.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .to_lowercase()
}
