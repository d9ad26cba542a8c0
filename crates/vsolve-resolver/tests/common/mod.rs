//! An in-memory [`SourceManager`] for driving the solver in tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use vsolve_core::dependency::ProjectDep;
use vsolve_core::identifier::ProjectIdentifier;
use vsolve_core::package::{Manifest, Package, PackageProblem, RootProject};
use vsolve_core::source::{PackageListing, SourceError, SourceManager};
use vsolve_core::version::{Constraint, Version};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn v(s: &str) -> Version {
    s.parse().unwrap()
}

pub fn c(s: &str) -> Constraint {
    s.parse().unwrap()
}

/// One published version of a project.
#[derive(Default)]
pub struct Release {
    deps: Vec<ProjectDep>,
    packages: BTreeMap<String, Result<Package, PackageProblem>>,
}

impl Release {
    /// Declare a dependency and, unless packages are given explicitly, import
    /// its top-level package from this project's top-level package.
    pub fn dep(&mut self, name: &str, constraint: &str) -> &mut Self {
        self.deps.push(ProjectDep::new(name, c(constraint)));
        self
    }

    /// Declare a dependency fetched from a specific network address.
    pub fn dep_from(&mut self, name: &str, addr: &str, constraint: &str) -> &mut Self {
        self.deps.push(ProjectDep::new(
            ProjectIdentifier::with_network(name, addr),
            c(constraint),
        ));
        self
    }

    pub fn pkg(&mut self, path: &str, imports: &[&str]) -> &mut Self {
        self.packages
            .insert(path.to_string(), Ok(Package::new(path).with_imports(imports.iter().copied())));
        self
    }

    pub fn broken(&mut self, path: &str, reason: &str) -> &mut Self {
        self.packages
            .insert(path.to_string(), Err(PackageProblem::Unusable(reason.to_string())));
        self
    }

    fn listing(&self, name: &str, path: &str) -> Result<Package, PackageProblem> {
        if let Some(entry) = self.packages.get(path) {
            return entry.clone();
        }
        if self.packages.is_empty() && path == name {
            let imports: Vec<String> = self
                .deps
                .iter()
                .map(|d| d.ident.local_name.as_str().to_string())
                .collect();
            return Ok(Package::new(path).with_imports(imports));
        }
        Err(PackageProblem::Missing)
    }
}

/// Published projects keyed by name, then version.
#[derive(Default)]
pub struct Fixture {
    projects: BTreeMap<String, BTreeMap<Version, Release>>,
    unavailable: BTreeSet<String>,
    /// Network addresses asked for, in call order.
    pub seen: RefCell<Vec<String>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&mut self, name: &str, version: &str) -> &mut Release {
        self.projects
            .entry(name.to_string())
            .or_default()
            .entry(v(version))
            .or_default()
    }

    /// A project that exists but has never published a version.
    pub fn unpublished(&mut self, name: &str) {
        self.projects.entry(name.to_string()).or_default();
    }

    /// Make requests for this network address fail.
    pub fn offline(&mut self, addr: &str) {
        self.unavailable.insert(addr.to_string());
    }

    pub fn calls_for(&self, addr: &str) -> usize {
        self.seen.borrow().iter().filter(|s| s.as_str() == addr).count()
    }

    /// The declared dependencies of a release, for checking solutions.
    pub fn deps_of(&self, name: &str, version: &Version) -> Vec<ProjectDep> {
        self.projects
            .get(name)
            .and_then(|r| r.get(version))
            .map(|r| r.deps.clone())
            .unwrap_or_default()
    }

    fn lookup(&self, id: &ProjectIdentifier) -> Result<&BTreeMap<Version, Release>, SourceError> {
        self.seen.borrow_mut().push(id.net_name().to_string());
        if self.unavailable.contains(id.net_name()) {
            return Err(SourceError::unavailable(id, "connection refused"));
        }
        self.projects
            .get(id.local_name.as_str())
            .ok_or_else(|| SourceError::unavailable(id, "no such repository"))
    }

    fn release_of(&self, id: &ProjectIdentifier, version: &Version) -> Result<&Release, SourceError> {
        self.lookup(id)?
            .get(version)
            .ok_or_else(|| SourceError::unavailable(id, format!("no version {version}")))
    }
}

impl SourceManager for Fixture {
    fn list_versions(&self, id: &ProjectIdentifier) -> Result<Vec<Version>, SourceError> {
        Ok(self.lookup(id)?.keys().cloned().collect())
    }

    fn list_packages(
        &self,
        id: &ProjectIdentifier,
        version: &Version,
        paths: &[String],
    ) -> Result<PackageListing, SourceError> {
        let release = self.release_of(id, version)?;
        Ok(paths
            .iter()
            .map(|p| (p.clone(), release.listing(id.local_name.as_str(), p)))
            .collect())
    }

    fn get_manifest(&self, id: &ProjectIdentifier, version: &Version) -> Result<Manifest, SourceError> {
        Ok(Manifest::new(self.release_of(id, version)?.deps.clone()))
    }
}

/// A root project `app` with one package importing the top-level package of
/// every dependency.
pub fn root(deps: &[(&str, &str)]) -> RootProject {
    let manifest = Manifest::new(deps.iter().map(|(n, con)| ProjectDep::new(*n, c(con))).collect());
    let imports: Vec<&str> = deps.iter().map(|(n, _)| *n).collect();
    RootProject::new("app", manifest, vec![Package::new("app").with_imports(imports)])
}

/// A root project with explicit packages.
pub fn root_with(deps: &[(&str, &str)], packages: Vec<Package>) -> RootProject {
    let manifest = Manifest::new(deps.iter().map(|(n, con)| ProjectDep::new(*n, c(con))).collect());
    RootProject::new("app", manifest, packages)
}
