use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vsolve_util::errors::{VsolveError, VsolveResult};

use crate::identifier::ProjectName;
use crate::version::Version;

/// A prior solution fed back in as a preference: the version listed for a
/// project is tried before any other candidate.
pub type Hint = BTreeMap<ProjectName, Version>;

/// Solver settings, loadable from a TOML file such as:
///
/// ```toml
/// include-tests = true
/// unstable = "pinned-only"
/// max-attempts = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SolveOptions {
    /// Follow the root project's test imports.
    #[serde(default)]
    pub include_tests: bool,

    /// Where pre-release and branch versions go in candidate order.
    #[serde(default)]
    pub unstable: UnstablePolicy,

    /// Abort after this many candidate trials.
    #[serde(default)]
    pub max_attempts: Option<usize>,
}

/// Placement of pre-release and branch versions among candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnstablePolicy {
    /// Stable releases newest first, then pre-releases newest first, then
    /// branches by name.
    #[default]
    Last,
    /// Pre-releases sorted among releases by semver precedence; branches last.
    Interleave,
    /// Ordered like `Last`, but an unstable selection is only accepted when
    /// the final set of constraints on its project names an unstable version.
    PinnedOnly,
}

impl SolveOptions {
    pub fn from_toml_str(content: &str) -> VsolveResult<Self> {
        toml::from_str(content).map_err(|e| {
            VsolveError::Config {
                message: format!("Failed to parse solver options: {e}"),
            }
            .into()
        })
    }

    /// Load options from `path`, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> VsolveResult<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| VsolveError::Config {
            message: format!("Failed to read solver options {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }
}
