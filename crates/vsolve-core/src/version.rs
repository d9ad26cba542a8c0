//! Version and constraint algebra.
//!
//! Versions are semver releases, named branches, or the pseudo-version of the
//! root project. Constraints are single intervals over semver versions, a
//! branch pin, or one of the two trivial sets:
//! - `*` admits everything
//! - `none` admits nothing and is what a disjoint intersection yields
//!
//! Upper bounds derived from caret, tilde, wildcard and `<` comparators exclude
//! the pre-releases of the bound itself, so `^1.0` does not admit `2.0.0-rc.1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Comparator, Op, Prerelease, VersionReq};
use serde::{Deserialize, Serialize};
use vsolve_util::errors::VsolveError;

/// A concrete version of a project.
///
/// Ordering: `Root` first, then semver releases by precedence, then branches
/// by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Version {
    Root,
    Semver(semver::Version),
    Branch(String),
}

impl Version {
    pub fn semver(major: u64, minor: u64, patch: u64) -> Self {
        Self::Semver(semver::Version::new(major, minor, patch))
    }

    pub fn branch(name: impl Into<String>) -> Self {
        Self::Branch(name.into())
    }

    /// Pre-releases and branches.
    pub fn is_unstable(&self) -> bool {
        match self {
            Version::Semver(v) => !v.pre.is_empty(),
            Version::Branch(_) => true,
            Version::Root => false,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Root => f.write_str("(root)"),
            Version::Semver(v) => write!(f, "{v}"),
            Version::Branch(b) => f.write_str(b),
        }
    }
}

impl FromStr for Version {
    type Err = VsolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(branch) = s.strip_prefix("branch:") {
            return Ok(Version::Branch(branch.to_string()));
        }
        let bare = s.strip_prefix('v').unwrap_or(s);
        semver::Version::parse(bare)
            .map(Version::Semver)
            .map_err(|e| VsolveError::Constraint {
                message: format!("invalid version '{s}': {e}"),
            })
    }
}

impl TryFrom<String> for Version {
    type Error = VsolveError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        match v {
            Version::Branch(b) => format!("branch:{b}"),
            other => other.to_string(),
        }
    }
}

impl From<semver::Version> for Version {
    fn from(v: semver::Version) -> Self {
        Self::Semver(v)
    }
}

/// One end of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: semver::Version,
    pub inclusive: bool,
}

/// A contiguous interval of semver versions. A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl VersionRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The single-version range `[v, v]`.
    pub fn exactly(v: &semver::Version) -> Self {
        Self {
            lower: Some(Bound {
                version: v.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version: v.clone(),
                inclusive: true,
            }),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Check if a version falls inside this range.
    pub fn contains(&self, version: &semver::Version) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }

    /// Whether no version can fall inside this range.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => match lo.version.cmp(&hi.version) {
                Ordering::Greater => true,
                Ordering::Equal => !(lo.inclusive && hi.inclusive),
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    /// The tightest range contained in both.
    pub fn intersect(&self, other: &Self) -> Self {
        let lower = match (&self.lower, &other.lower) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Greater => a.clone(),
                Ordering::Less => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
        };
        let upper = match (&self.upper, &other.upper) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Less => a.clone(),
                Ordering::Greater => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
        };
        Self { lower, upper }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (None, None) => f.write_str("*"),
            (Some(lo), Some(hi)) if lo == hi && lo.inclusive => write!(f, "={}", lo.version),
            (lo, hi) => {
                if let Some(lo) = lo {
                    let op = if lo.inclusive { ">=" } else { ">" };
                    write!(f, "{op}{}", lo.version)?;
                    if hi.is_some() {
                        f.write_str(", ")?;
                    }
                }
                if let Some(hi) = hi {
                    if hi.inclusive {
                        write!(f, "<={}", hi.version)?;
                    } else if hi.version.pre.as_str() == "0" {
                        let v = &hi.version;
                        write!(f, "<{}.{}.{}", v.major, v.minor, v.patch)?;
                    } else {
                        write!(f, "<{}", hi.version)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A predicate over versions with an intersection operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Any,
    None,
    Branch(String),
    Range(VersionRange),
}

impl Constraint {
    /// The constraint admitting exactly `v`.
    pub fn exact(v: &Version) -> Self {
        match v {
            Version::Semver(sv) => Constraint::Range(VersionRange::exactly(sv)),
            Version::Branch(b) => Constraint::Branch(b.clone()),
            Version::Root => Constraint::Any,
        }
    }

    fn from_range(range: VersionRange) -> Self {
        if range.is_empty() {
            Constraint::None
        } else if range.is_unbounded() {
            Constraint::Any
        } else {
            Constraint::Range(range)
        }
    }

    /// Does `v` satisfy this constraint.
    pub fn admits(&self, v: &Version) -> bool {
        match (self, v) {
            (Constraint::Any, _) => true,
            (Constraint::None, _) => false,
            (Constraint::Branch(want), Version::Branch(have)) => want == have,
            (Constraint::Range(r), Version::Semver(sv)) => r.contains(sv),
            _ => false,
        }
    }

    /// Intersect two constraints. Disjoint inputs yield [`Constraint::None`].
    pub fn intersect(&self, other: &Constraint) -> Constraint {
        match (self, other) {
            (Constraint::None, _) | (_, Constraint::None) => Constraint::None,
            (Constraint::Any, c) | (c, Constraint::Any) => c.clone(),
            (Constraint::Branch(a), Constraint::Branch(b)) if a == b => self.clone(),
            (Constraint::Range(a), Constraint::Range(b)) => Constraint::from_range(a.intersect(b)),
            _ => Constraint::None,
        }
    }

    pub fn overlaps(&self, other: &Constraint) -> bool {
        !self.intersect(other).is_none()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Constraint::None)
    }

    /// Whether the constraint explicitly names an unstable version: a branch
    /// pin, or a bound carrying a pre-release tag.
    pub fn pins_unstable(&self) -> bool {
        match self {
            Constraint::Branch(_) => true,
            Constraint::Range(r) => {
                let tagged = |b: &Option<Bound>| {
                    b.as_ref()
                        .is_some_and(|b| !b.version.pre.is_empty() && b.version.pre.as_str() != "0")
                };
                tagged(&r.lower) || tagged(&r.upper)
            }
            Constraint::Any | Constraint::None => false,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => f.write_str("*"),
            Constraint::None => f.write_str("none"),
            Constraint::Branch(b) => write!(f, "branch:{b}"),
            Constraint::Range(r) => write!(f, "{r}"),
        }
    }
}

impl FromStr for Constraint {
    type Err = VsolveError;

    /// Parse `*`, `branch:NAME`, or a comma-separated semver requirement.
    /// A bare version such as `1.2.3` is read as `^1.2.3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Constraint::Any);
        }
        if let Some(branch) = s.strip_prefix("branch:") {
            if branch.is_empty() {
                return Err(VsolveError::Constraint {
                    message: format!("empty branch name in '{s}'"),
                });
            }
            return Ok(Constraint::Branch(branch.to_string()));
        }

        let req = VersionReq::parse(s).map_err(|e| VsolveError::Constraint {
            message: format!("'{s}': {e}"),
        })?;
        let mut range = VersionRange::unbounded();
        for comparator in &req.comparators {
            range = range.intersect(&comparator_range(comparator)?);
        }
        match Constraint::from_range(range) {
            Constraint::None => Err(VsolveError::Constraint {
                message: format!("'{s}' admits no versions"),
            }),
            c => Ok(c),
        }
    }
}

fn comparator_range(c: &Comparator) -> Result<VersionRange, VsolveError> {
    let major = c.major;
    let at = |minor: u64, patch: u64| semver::Version {
        major,
        minor,
        patch,
        pre: c.pre.clone(),
        build: BuildMetadata::EMPTY,
    };
    let from = |version: semver::Version, inclusive: bool| Some(Bound { version, inclusive });
    let next = |n: u64| {
        n.checked_add(1).ok_or_else(|| VsolveError::Constraint {
            message: format!("'{c}' is out of range"),
        })
    };

    let range = match (c.op, c.minor, c.patch) {
        (Op::Exact, Some(minor), Some(patch)) => VersionRange::exactly(&at(minor, patch)),
        (Op::Exact | Op::Wildcard, Some(minor), None) => VersionRange {
            lower: from(at(minor, 0), true),
            upper: Some(below(major, next(minor)?, 0)?),
        },
        (Op::Exact | Op::Wildcard, None, _) => VersionRange {
            lower: from(at(0, 0), true),
            upper: Some(below(next(major)?, 0, 0)?),
        },
        (Op::Greater, Some(minor), Some(patch)) => VersionRange {
            lower: from(at(minor, patch), false),
            upper: None,
        },
        (Op::Greater, Some(minor), None) => VersionRange {
            lower: from(semver::Version::new(major, next(minor)?, 0), true),
            upper: None,
        },
        (Op::Greater, None, _) => VersionRange {
            lower: from(semver::Version::new(next(major)?, 0, 0), true),
            upper: None,
        },
        (Op::GreaterEq, minor, patch) => VersionRange {
            lower: from(at(minor.unwrap_or(0), patch.unwrap_or(0)), true),
            upper: None,
        },
        (Op::Less, Some(minor), Some(patch)) if !c.pre.is_empty() => VersionRange {
            lower: None,
            upper: from(at(minor, patch), false),
        },
        (Op::Less, minor, patch) => VersionRange {
            lower: None,
            upper: Some(below(major, minor.unwrap_or(0), patch.unwrap_or(0))?),
        },
        (Op::LessEq, Some(minor), Some(patch)) => VersionRange {
            lower: None,
            upper: from(at(minor, patch), true),
        },
        (Op::LessEq, Some(minor), None) => VersionRange {
            lower: None,
            upper: Some(below(major, next(minor)?, 0)?),
        },
        (Op::LessEq, None, _) => VersionRange {
            lower: None,
            upper: Some(below(next(major)?, 0, 0)?),
        },
        (Op::Tilde, Some(minor), patch) => VersionRange {
            lower: from(at(minor, patch.unwrap_or(0)), true),
            upper: Some(below(major, next(minor)?, 0)?),
        },
        (Op::Tilde | Op::Caret, None, _) => VersionRange {
            lower: from(at(0, 0), true),
            upper: Some(below(next(major)?, 0, 0)?),
        },
        (Op::Caret, Some(minor), patch) => {
            let upper = match (major, minor, patch) {
                (0, 0, Some(patch)) => below(0, 0, next(patch)?)?,
                (0, minor, _) => below(0, next(minor)?, 0)?,
                (major, _, _) => below(next(major)?, 0, 0)?,
            };
            VersionRange {
                lower: from(at(minor, patch.unwrap_or(0)), true),
                upper: Some(upper),
            }
        }
        (op, _, _) => {
            return Err(VsolveError::Constraint {
                message: format!("unsupported comparator operator {op:?}"),
            })
        }
    };
    Ok(range)
}

/// Exclusive upper bound that also shuts out the bound's own pre-releases.
fn below(major: u64, minor: u64, patch: u64) -> Result<Bound, VsolveError> {
    let pre = Prerelease::new("0").map_err(|e| VsolveError::Constraint {
        message: e.to_string(),
    })?;
    Ok(Bound {
        version: semver::Version {
            major,
            minor,
            patch,
            pre,
            build: BuildMetadata::EMPTY,
        },
        inclusive: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn c(s: &str) -> Constraint {
        s.parse().unwrap()
    }

    #[test]
    fn caret_excludes_next_major_prereleases() {
        let caret = c("^1.0");
        assert!(caret.admits(&v("1.0.0")));
        assert!(caret.admits(&v("1.9.9")));
        assert!(!caret.admits(&v("2.0.0-rc.1")));
        assert!(!caret.admits(&v("2.0.0")));
    }

    #[test]
    fn caret_zero_major() {
        let caret = c("^0.2.3");
        assert!(caret.admits(&v("0.2.9")));
        assert!(!caret.admits(&v("0.3.0")));
        let tight = c("^0.0.3");
        assert!(tight.admits(&v("0.0.3")));
        assert!(!tight.admits(&v("0.0.4")));
    }

    #[test]
    fn tilde_and_wildcard() {
        assert!(c("~1.2").admits(&v("1.2.7")));
        assert!(!c("~1.2").admits(&v("1.3.0")));
        assert!(c("1.*").admits(&v("1.4.0")));
        assert!(!c("1.*").admits(&v("2.0.0")));
    }

    #[test]
    fn unsatisfiable_requirement_is_an_input_error() {
        assert!(">=2.0, <1.0".parse::<Constraint>().is_err());
        assert!("not a constraint".parse::<Constraint>().is_err());
    }

    #[test]
    fn largest_component_bump_is_an_input_error() {
        for req in [
            "^18446744073709551615",
            "<=1.18446744073709551615",
            "~1.18446744073709551615",
            ">18446744073709551615",
            "^0.0.18446744073709551615",
        ] {
            match req.parse::<Constraint>() {
                Err(VsolveError::Constraint { message }) => assert!(message.contains("out of range"), "{message}"),
                other => panic!("{req}: expected an out of range error, got {other:?}"),
            }
        }
        assert!(">=18446744073709551615".parse::<Constraint>().is_ok());
    }

    #[test]
    fn exclusive_bound_intersection_at_same_point_is_empty() {
        let a = c(">=1.0.0, <1.5.0");
        let b = c(">=1.5.0");
        assert!(a.intersect(&b).is_none());
    }

    #[test]
    fn display_hides_prerelease_floor() {
        assert_eq!(c(">=1.0, <2.0").to_string(), ">=1.0.0, <2.0.0");
        assert_eq!(c("=1.2.3").to_string(), "=1.2.3");
    }
}
