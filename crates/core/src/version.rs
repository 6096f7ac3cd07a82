//! Semantic version representation, parsing, comparison, and increment rules.

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SemanticVersionFormat;
use crate::error::{NextVerError, Result};

static STRICT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<major>0|[1-9]\d*)\.(?P<minor>0|[1-9]\d*)\.(?P<patch>0|[1-9]\d*)(?:-(?P<label>[0-9A-Za-z-]+)\.(?P<number>\d+))?(?:\+(?P<build>[0-9A-Za-z.-]+))?$").unwrap()
});

static LOOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?(?:[-.](?P<label>[0-9A-Za-z-]+?)\.?(?P<number>\d+)?)?(?:\+(?P<build>[0-9A-Za-z.-]+))?$").unwrap()
});

/// The field a `SemanticVersion` can be incremented on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementField {
    /// Derive the increment from commit messages / base version context.
    Inherit,
    None,
    Patch,
    Minor,
    Major,
}

impl IncrementField {
    fn rank(self) -> u8 {
        match self {
            IncrementField::Inherit => 0,
            IncrementField::None => 0,
            IncrementField::Patch => 1,
            IncrementField::Minor => 2,
            IncrementField::Major => 3,
        }
    }

    /// The more significant of the two fields, used by the trunk-based
    /// iterator to aggregate increments seen across a commit range.
    pub fn max(self, other: IncrementField) -> IncrementField {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl std::str::FromStr for IncrementField {
    type Err = NextVerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inherit" => Ok(IncrementField::Inherit),
            "none" => Ok(IncrementField::None),
            "patch" | "fix" => Ok(IncrementField::Patch),
            "minor" | "feature" => Ok(IncrementField::Minor),
            "major" | "breaking" => Ok(IncrementField::Major),
            other => Err(NextVerError::Configuration(format!(
                "unrecognised increment field: {other}"
            ))),
        }
    }
}

/// The `{label}.{number}` suffix of a pre-release semantic version.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PreRelease {
    pub label: String,
    pub number: u64,
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.label, self.number)
    }
}

/// Build metadata carried alongside a calculated version: where it came
/// from, how far HEAD has moved since, and the state of the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct BuildMetadata {
    pub source_sha: Option<String>,
    pub commits_since_source: u32,
    pub branch_name: Option<String>,
    pub commit_sha: Option<String>,
    pub short_sha: Option<String>,
    pub commit_timestamp: Option<i64>,
    pub uncommitted_count: u32,
}

/// A fully-formed semantic version: the `(major, minor, patch)` triple, an
/// optional `{label}.{number}` pre-release tag, and build metadata.
///
/// # Examples
/// ```rust
/// use nextver::version::SemanticVersion;
///
/// let version: SemanticVersion = "1.2.3-beta.4".parse().unwrap();
/// assert_eq!(version.to_string(), "1.2.3-beta.4");
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<PreRelease>,
    pub build: BuildMetadata,
}

impl SemanticVersion {
    /// Construct a stable version with no pre-release tag or build metadata.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
            build: BuildMetadata::default(),
        }
    }

    /// Parse `s`, stripping `prefix` first if present. Tags that don't carry
    /// a configured non-empty prefix are rejected, matching the tagged
    /// version repository's prefix filter.
    pub fn parse(s: &str, prefix: &str, format: SemanticVersionFormat) -> Result<Self> {
        let stripped = if prefix.is_empty() {
            s
        } else if let Some(rest) = s.strip_prefix(prefix) {
            rest
        } else {
            return Err(NextVerError::Other(format!(
                "tag '{s}' does not start with configured prefix '{prefix}'"
            )));
        };

        let re = match format {
            SemanticVersionFormat::Strict => &*STRICT_RE,
            SemanticVersionFormat::Loose => &*LOOSE_RE,
        };

        let caps = re
            .captures(stripped)
            .ok_or_else(|| NextVerError::Other(format!("'{stripped}' is not a semantic version")))?;

        let major = caps["major"].parse().unwrap_or(0);
        let minor = caps
            .name("minor")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let patch = caps
            .name("patch")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);

        let pre_release = match (caps.name("label"), caps.name("number")) {
            (Some(label), Some(number)) => Some(PreRelease {
                label: label.as_str().to_string(),
                number: number.as_str().parse().unwrap_or(0),
            }),
            (Some(label), None) => Some(PreRelease {
                label: label.as_str().to_string(),
                number: 0,
            }),
            _ => None,
        };

        let mut build = BuildMetadata::default();
        if let Some(m) = caps.name("build") {
            build.source_sha = Some(m.as_str().to_string());
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre_release,
            build,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre_release.is_some()
    }

    /// `IsMatchForBranchSpecificLabel`: true iff this version's label equals
    /// `label` (case-insensitive), treating "no pre-release" and the empty
    /// label as equivalent.
    pub fn is_match_for_branch_specific_label(&self, label: &str) -> bool {
        match &self.pre_release {
            None => label.is_empty(),
            Some(pre) => !label.is_empty() && pre.label.eq_ignore_ascii_case(label),
        }
    }

    /// Apply the increment rules of spec.md §4.1.
    ///
    /// `label` is the fully resolved target label: an empty string means
    /// "stable" (no pre-release), anything else is a literal pre-release
    /// label. `force` re-numbers the pre-release tag even when the label
    /// already matches and nothing else changed.
    pub fn increment(&self, field: IncrementField, label: &str, force: bool) -> SemanticVersion {
        match field {
            IncrementField::Inherit => self.clone(),
            IncrementField::None => {
                let mut v = self.clone();
                if label.is_empty() {
                    if let Some(pre) = &self.pre_release {
                        v.pre_release = Some(PreRelease {
                            label: pre.label.clone(),
                            number: pre.number + 1,
                        });
                    }
                } else {
                    let same_label = self
                        .pre_release
                        .as_ref()
                        .map(|pre| pre.label.eq_ignore_ascii_case(label))
                        .unwrap_or(false);
                    if same_label {
                        if force {
                            let pre = self.pre_release.as_ref().unwrap();
                            v.pre_release = Some(PreRelease {
                                label: pre.label.clone(),
                                number: pre.number + 1,
                            });
                        }
                        // else: the label already matches and nothing forces
                        // a change, so the pre-release stays exactly as-is.
                    } else {
                        v.pre_release = Some(PreRelease {
                            label: label.to_string(),
                            number: 1,
                        });
                    }
                }
                v
            }
            IncrementField::Patch | IncrementField::Minor | IncrementField::Major => {
                let (major, minor, patch) = match field {
                    IncrementField::Major => (self.major + 1, 0, 0),
                    IncrementField::Minor => (self.major, self.minor + 1, 0),
                    IncrementField::Patch => (self.major, self.minor, self.patch + 1),
                    _ => unreachable!(),
                };
                let pre_release = if label.is_empty() {
                    None
                } else {
                    Some(PreRelease {
                        label: label.to_string(),
                        number: 1,
                    })
                };
                SemanticVersion {
                    major,
                    minor,
                    patch,
                    pre_release,
                    build: BuildMetadata::default(),
                }
            }
        }
    }

    /// `AlternativeSemanticVersion`: lift the `(major, minor, patch)` triple
    /// to `alt` when this version compares lower, ignoring pre-release.
    pub fn with_alternative_floor(&self, alt: (u64, u64, u64)) -> SemanticVersion {
        if (self.major, self.minor, self.patch) < alt {
            SemanticVersion {
                major: alt.0,
                minor: alt.1,
                patch: alt.2,
                pre_release: self.pre_release.clone(),
                build: self.build.clone(),
            }
        } else {
            self.clone()
        }
    }

    /// Attach build metadata describing where this version was calculated.
    pub fn with_build(&self, build: BuildMetadata) -> SemanticVersion {
        let mut v = self.clone();
        v.build = build;
        v
    }

    /// Canonical `{major}.{minor}.{patch}[-{label}.{number}]`, no build
    /// metadata.
    pub fn render(&self) -> String {
        let mut s = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if let Some(pre) = &self.pre_release {
            s.push('-');
            s.push_str(&pre.to_string());
        }
        s
    }

    /// `{render()}[+{commits-since-source}]`.
    pub fn full_sem_ver(&self) -> String {
        let mut s = self.render();
        if self.build.commits_since_source > 0 {
            s.push('+');
            s.push_str(&self.build.commits_since_source.to_string());
        }
        s
    }

    /// The verbose, human-oriented rendering: full semver plus branch and
    /// commit sha, mirroring GitVersion's `InformationalVersion`.
    pub fn informational_version(&self) -> String {
        let mut s = self.full_sem_ver();
        if let Some(branch) = &self.build.branch_name {
            s.push_str(&format!(" ({branch})"));
        }
        if let Some(sha) = &self.build.short_sha {
            s.push_str(&format!(" [{sha}]"));
        }
        s
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl std::str::FromStr for SemanticVersion {
    type Err = NextVerError;

    fn from_str(s: &str) -> Result<Self> {
        SemanticVersion::parse(s, "", SemanticVersionFormat::Strict)
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.pre_release == other.pre_release
    }
}

impl Eq for SemanticVersion {}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                // An absent pre-release outranks any non-empty one.
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a
                    .label
                    .to_lowercase()
                    .cmp(&b.label.to_lowercase())
                    .then(a.number.cmp(&b.number)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strict_roundtrip() {
        for s in ["0.0.0", "1.2.3", "1.2.3-alpha.1", "10.20.30-beta.7"] {
            let v = SemanticVersion::parse(s, "", SemanticVersionFormat::Strict).unwrap();
            assert_eq!(v.render(), s, "parse(render(v)) should be a left-inverse");
        }
    }

    #[test]
    fn parse_with_prefix() {
        let v = SemanticVersion::parse("v1.2.3", "v", SemanticVersionFormat::Strict).unwrap();
        assert_eq!(v.render(), "1.2.3");
        assert!(SemanticVersion::parse("1.2.3", "v", SemanticVersionFormat::Strict).is_err());
    }

    #[test]
    fn empty_prerelease_outranks_any_prerelease() {
        let stable = SemanticVersion::new(1, 0, 0);
        let pre = SemanticVersion::parse("1.0.0-alpha.1", "", SemanticVersionFormat::Strict).unwrap();
        assert!(stable > pre);
    }

    #[test]
    fn increment_major_resets_lower_fields_and_prerelease() {
        let v = SemanticVersion::new(1, 2, 3);
        let next = v.increment(IncrementField::Major, "beta", false);
        assert_eq!(next.render(), "2.0.0-beta.1");
    }

    #[test]
    fn increment_none_with_no_label_is_identity_when_stable() {
        let v = SemanticVersion::new(1, 2, 3);
        let next = v.increment(IncrementField::None, "", false);
        assert_eq!(next, v);
    }

    #[test]
    fn increment_none_with_no_label_bumps_existing_prerelease_number() {
        let v = SemanticVersion::parse("0.0.0-alpha.4", "", SemanticVersionFormat::Strict).unwrap();
        let next = v.increment(IncrementField::None, "", false);
        assert_eq!(next.render(), "0.0.0-alpha.5");
    }

    #[test]
    fn increment_none_matching_label_is_identity_unless_forced() {
        let v = SemanticVersion::parse("1.0.0-foo.2", "", SemanticVersionFormat::Strict).unwrap();
        let unforced = v.increment(IncrementField::None, "foo", false);
        assert_eq!(unforced.render(), "1.0.0-foo.2");
        let forced = v.increment(IncrementField::None, "foo", true);
        assert_eq!(forced.render(), "1.0.0-foo.3");
    }

    #[test]
    fn is_match_for_branch_specific_label_treats_none_and_empty_as_equivalent() {
        let stable = SemanticVersion::new(1, 0, 0);
        assert!(stable.is_match_for_branch_specific_label(""));
        assert!(!stable.is_match_for_branch_specific_label("foo"));

        let labelled =
            SemanticVersion::parse("1.0.0-Foo.1", "", SemanticVersionFormat::Strict).unwrap();
        assert!(labelled.is_match_for_branch_specific_label("foo"));
    }

    #[test]
    fn alternative_floor_lifts_lower_triple() {
        let v = SemanticVersion::new(0, 5, 0);
        let lifted = v.with_alternative_floor((1, 0, 0));
        assert_eq!((lifted.major, lifted.minor, lifted.patch), (1, 0, 0));

        let v2 = SemanticVersion::new(2, 0, 0);
        let unchanged = v2.with_alternative_floor((1, 0, 0));
        assert_eq!(
            (unchanged.major, unchanged.minor, unchanged.patch),
            (2, 0, 0)
        );
    }
}
