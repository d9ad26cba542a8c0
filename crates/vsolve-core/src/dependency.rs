//! Atoms and dependency edges.

use std::collections::BTreeSet;
use std::fmt;

use crate::identifier::ProjectIdentifier;
use crate::version::{Constraint, Version};

/// A single committed choice: one identifier at one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    pub id: ProjectIdentifier,
    pub version: Version,
}

impl Atom {
    pub fn new(id: ProjectIdentifier, version: Version) -> Self {
        Self { id, version }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.id.err_string(), self.version)
    }
}

/// An atom plus the subset of its packages the current obligation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomWithPackages {
    pub atom: Atom,
    pub packages: BTreeSet<String>,
}

/// "The depending atom requires `ident` to satisfy `constraint`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDep {
    pub ident: ProjectIdentifier,
    pub constraint: Constraint,
}

impl ProjectDep {
    pub fn new(ident: impl Into<ProjectIdentifier>, constraint: Constraint) -> Self {
        Self {
            ident: ident.into(),
            constraint,
        }
    }
}

/// A project dependency narrowed to the packages actually imported from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteDep {
    pub dep: ProjectDep,
    pub packages: BTreeSet<String>,
}

impl CompleteDep {
    pub fn ident(&self) -> &ProjectIdentifier {
        &self.dep.ident
    }

    pub fn constraint(&self) -> &Constraint {
        &self.dep.constraint
    }
}

/// A dependency edge attributed to the atom that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub depender: Atom,
    pub dep: CompleteDep,
}

/// A work-queue entry: resolve `id`, and verify `packages` are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BimodalIdentifier {
    pub id: ProjectIdentifier,
    pub packages: BTreeSet<String>,
}

impl BimodalIdentifier {
    pub fn new<I, S>(id: ProjectIdentifier, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }
}
