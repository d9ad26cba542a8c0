//! Mirror rules: rewrite a project's network address to an alternate
//! location, e.g. a local checkout or a fork.
//!
//! Rules are matched by longest path prefix. The unmatched remainder of the
//! address is appended to the rule's replacement, so a rule for
//! `https://golang.org/x` also rewrites `https://golang.org/x/tools`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vsolve_util::errors::{VsolveError, VsolveResult};

/// A single rewrite rule as written in a mirrors file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRule {
    pub original: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<String>,
}

/// The result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub repo: String,
    pub vcs: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MirrorsFile {
    #[serde(default)]
    repos: Vec<MirrorRule>,
}

/// An immutable, sorted set of mirror rules.
#[derive(Debug, Clone, Default)]
pub struct MirrorSet {
    rules: Vec<MirrorRule>,
}

impl MirrorSet {
    /// Build a set from rules in any order. A later rule for the same
    /// `original` replaces an earlier one.
    pub fn new(rules: impl IntoIterator<Item = MirrorRule>) -> Self {
        let mut rules: Vec<MirrorRule> = rules.into_iter().collect();
        rules.reverse();
        rules.sort_by(|a, b| a.original.cmp(&b.original));
        rules.dedup_by(|a, b| a.original == b.original);
        Self { rules }
    }

    /// Parse a mirrors file:
    ///
    /// ```toml
    /// [[repos]]
    /// original = "https://golang.org/x"
    /// repo = "https://github.com/golang"
    /// vcs = "git"
    /// ```
    pub fn from_toml_str(content: &str) -> VsolveResult<Self> {
        let file: MirrorsFile = toml::from_str(content).map_err(|e| VsolveError::Config {
            message: format!("Failed to parse mirrors: {e}"),
        })?;
        Ok(Self::new(file.repos))
    }

    /// Load a mirrors file, or return an empty set if it doesn't exist.
    pub fn load(path: &Path) -> VsolveResult<Self> {
        if !path.is_file() {
            tracing::debug!("No mirrors file at {}", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| VsolveError::Config {
            message: format!("Failed to read mirrors file {}: {e}", path.display()),
        })?;
        let set = Self::from_toml_str(&content)?;
        tracing::info!("Loaded {} mirror rule(s) from {}", set.len(), path.display());
        Ok(set)
    }

    /// Serialize the rules, sorted by `original`.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(&MirrorsFile {
            repos: self.rules.clone(),
        })
    }

    /// Find the rule for `addr`: an exact match, else the longest rule whose
    /// `original` is a prefix of `addr` ending at a `/`.
    pub fn get(&self, addr: &str) -> Option<Rewrite> {
        let mut prefix = addr;
        loop {
            if let Ok(i) = self
                .rules
                .binary_search_by(|r| r.original.as_str().cmp(prefix))
            {
                let rule = &self.rules[i];
                return Some(Rewrite {
                    repo: format!("{}{}", rule.repo, &addr[prefix.len()..]),
                    vcs: rule.vcs.clone(),
                });
            }
            let cut = prefix.rfind('/')?;
            prefix = &prefix[..cut];
        }
    }

    pub fn rules(&self) -> &[MirrorRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
