//! Packages, manifests and the root project.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dependency::ProjectDep;
use crate::identifier::ProjectIdentifier;

/// A unit of code inside a project, identified by its import path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Package {
    pub import_path: String,
    #[serde(default)]
    pub comment_path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub test_imports: Vec<String>,
}

impl Package {
    pub fn new(import_path: impl Into<String>) -> Self {
        let import_path = import_path.into();
        let name = import_path
            .rsplit('/')
            .next()
            .unwrap_or(import_path.as_str())
            .to_string();
        Self {
            import_path,
            name,
            ..Self::default()
        }
    }

    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_test_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_imports = imports.into_iter().map(Into::into).collect();
        self
    }
}

/// Why a required package cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageProblem {
    /// No package exists at the path.
    Missing,
    /// A package exists but could not be used (e.g. it does not parse).
    Unusable(String),
}

impl PackageProblem {
    pub fn is_missing(&self) -> bool {
        matches!(self, PackageProblem::Missing)
    }
}

impl fmt::Display for PackageProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageProblem::Missing => f.write_str("is missing"),
            PackageProblem::Unusable(reason) => {
                write!(f, "does not contain usable code ({reason})")
            }
        }
    }
}

/// The declared dependencies of a project at one version.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub dependencies: Vec<ProjectDep>,
}

impl Manifest {
    pub fn new(dependencies: Vec<ProjectDep>) -> Self {
        Self { dependencies }
    }

    /// The declared dependency owning `import_path`, preferring the longest
    /// matching project name.
    pub fn dep_for_import(&self, import_path: &str) -> Option<&ProjectDep> {
        self.dependencies
            .iter()
            .filter(|d| d.ident.local_name.contains_import(import_path))
            .max_by_key(|d| d.ident.local_name.as_str().len())
    }
}

/// The project being solved for. It is local and unversioned, so its packages
/// are supplied directly rather than fetched.
#[derive(Debug, Clone)]
pub struct RootProject {
    pub id: ProjectIdentifier,
    pub manifest: Manifest,
    pub packages: Vec<Package>,
}

impl RootProject {
    pub fn new(id: impl Into<ProjectIdentifier>, manifest: Manifest, packages: Vec<Package>) -> Self {
        Self {
            id: id.into(),
            manifest,
            packages,
        }
    }
}
