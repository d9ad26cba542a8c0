//! Project identity: the local name used in the dependency graph and the
//! network address the source is fetched from.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// The name a project is known by in constraint and dependency edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `import_path` lives under this project root, i.e. equals the
    /// name or extends it at a `/` boundary.
    pub fn contains_import(&self, import_path: &str) -> bool {
        match import_path.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifies a project by local name plus the network address it comes from.
///
/// An empty `network_name` means "same as the local name". Equality, hashing
/// and ordering all operate on the normalized form, so an identifier with an
/// empty address equals one whose address spells out the local name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIdentifier {
    pub local_name: ProjectName,
    #[serde(default)]
    pub network_name: String,
}

impl ProjectIdentifier {
    /// An identifier whose source address is its local name.
    pub fn new(local_name: impl Into<ProjectName>) -> Self {
        Self {
            local_name: local_name.into(),
            network_name: String::new(),
        }
    }

    /// An identifier fetched from an explicit network address.
    pub fn with_network(local_name: impl Into<ProjectName>, network_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            network_name: network_name.into(),
        }
    }

    /// The effective source address.
    pub fn net_name(&self) -> &str {
        if self.network_name.is_empty() {
            self.local_name.as_str()
        } else {
            &self.network_name
        }
    }

    /// Fill an empty network name with the local name.
    pub fn normalize(&self) -> Self {
        Self {
            local_name: self.local_name.clone(),
            network_name: self.net_name().to_string(),
        }
    }

    /// Whether the two identifiers name the same project from different
    /// sources.
    pub fn source_conflicts_with(&self, other: &Self) -> bool {
        self.local_name == other.local_name && self.net_name() != other.net_name()
    }

    /// Fully qualified form: the bare name when the address is the name,
    /// otherwise `name (from address)`.
    pub fn err_string(&self) -> String {
        if self.net_name() == self.local_name.as_str() {
            self.local_name.to_string()
        } else {
            format!("{} (from {})", self.local_name, self.network_name)
        }
    }

    /// Form used inside nested traces. Same shape as [`Self::err_string`],
    /// so a differing source address is never lost.
    pub fn trace_string(&self) -> String {
        self.err_string()
    }
}

impl PartialEq for ProjectIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.local_name == other.local_name && self.net_name() == other.net_name()
    }
}

impl Eq for ProjectIdentifier {}

impl Hash for ProjectIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.local_name.hash(state);
        self.net_name().hash(state);
    }
}

impl Ord for ProjectIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then_with(|| self.net_name().cmp(other.net_name()))
    }
}

impl PartialOrd for ProjectIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.err_string())
    }
}

impl From<&str> for ProjectIdentifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_network_equals_spelled_out_local() {
        let a = ProjectIdentifier::new("github.com/acme/lib");
        let b = ProjectIdentifier::with_network("github.com/acme/lib", "github.com/acme/lib");
        assert_eq!(a, b);
    }

    #[test]
    fn different_addresses_conflict() {
        let a = ProjectIdentifier::with_network("acme/lib", "https://a.example/lib");
        let b = ProjectIdentifier::with_network("acme/lib", "https://b.example/lib");
        assert_ne!(a, b);
        assert!(a.source_conflicts_with(&b));
        assert!(!a.source_conflicts_with(&a.normalize()));
    }

    #[test]
    fn contains_import_respects_path_boundary() {
        let name = ProjectName::from("github.com/acme/lib");
        assert!(name.contains_import("github.com/acme/lib"));
        assert!(name.contains_import("github.com/acme/lib/sub"));
        assert!(!name.contains_import("github.com/acme/library"));
        assert!(!name.contains_import("github.com/acme"));
    }
}
