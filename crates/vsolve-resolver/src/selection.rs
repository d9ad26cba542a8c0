//! The evolving partial solution.

use std::collections::{BTreeMap, BTreeSet};

use vsolve_core::dependency::{Atom, Dependency};
use vsolve_core::identifier::{ProjectIdentifier, ProjectName};
use vsolve_core::version::Constraint;

/// A selected atom and the packages verified present in it.
#[derive(Debug, Clone)]
pub struct SelectedProject {
    pub atom: Atom,
    pub packages: BTreeSet<String>,
}

/// Which atoms are chosen and which edges are in force on each project.
///
/// Cloned wholesale into a choice point so that backtracking is a plain
/// restore.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    projects: Vec<SelectedProject>,
    deps: BTreeMap<ProjectName, Vec<Dependency>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, atom: Atom, packages: BTreeSet<String>) {
        self.projects.push(SelectedProject { atom, packages });
    }

    /// Record more verified packages for an already selected project.
    pub fn add_packages(&mut self, name: &ProjectName, packages: BTreeSet<String>) {
        if let Some(p) = self
            .projects
            .iter_mut()
            .find(|p| &p.atom.id.local_name == name)
        {
            p.packages.extend(packages);
        }
    }

    pub fn selected(&self, name: &ProjectName) -> Option<&SelectedProject> {
        self.projects.iter().find(|p| &p.atom.id.local_name == name)
    }

    pub fn push_dep(&mut self, dep: Dependency) {
        self.deps
            .entry(dep.dep.ident().local_name.clone())
            .or_default()
            .push(dep);
    }

    /// Active edges targeting `name`, in the order they were introduced.
    pub fn deps_on(&self, name: &ProjectName) -> &[Dependency] {
        self.deps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every active edge.
    pub fn all_deps(&self) -> impl Iterator<Item = &Dependency> {
        self.deps.values().flatten()
    }

    /// The intersection of every active constraint on `name`.
    pub fn constraint_on(&self, name: &ProjectName) -> Constraint {
        self.deps_on(name)
            .iter()
            .fold(Constraint::Any, |acc, d| acc.intersect(d.dep.constraint()))
    }

    /// The identifier the existing dependers agreed on for `name`.
    pub fn ident_for(&self, name: &ProjectName) -> Option<&ProjectIdentifier> {
        self.deps_on(name).first().map(|d| d.dep.ident())
    }

    /// Every package required of `name`, with the atoms requiring it.
    pub fn required_packages(&self, name: &ProjectName) -> BTreeMap<String, Vec<Atom>> {
        let mut required: BTreeMap<String, Vec<Atom>> = BTreeMap::new();
        for d in self.deps_on(name) {
            for pkg in &d.dep.packages {
                let deppers = required.entry(pkg.clone()).or_default();
                if !deppers.contains(&d.depender) {
                    deppers.push(d.depender.clone());
                }
            }
        }
        required
    }

    /// Selected projects in selection order; the first is the root.
    pub fn projects(&self) -> &[SelectedProject] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsolve_core::dependency::{CompleteDep, ProjectDep};
    use vsolve_core::version::Version;

    fn edge(from: &str, to: &str, constraint: &str, pkgs: &[&str]) -> Dependency {
        Dependency {
            depender: Atom::new(ProjectIdentifier::new(from), Version::semver(1, 0, 0)),
            dep: CompleteDep {
                dep: ProjectDep::new(to, constraint.parse().unwrap()),
                packages: pkgs.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn constraint_on_intersects_every_edge() {
        let mut sel = Selection::new();
        sel.push_dep(edge("x", "p", ">=1.0", &["p"]));
        sel.push_dep(edge("y", "p", "<1.5", &["p"]));
        let c = sel.constraint_on(&ProjectName::from("p"));
        assert!(c.admits(&Version::semver(1, 2, 0)));
        assert!(!c.admits(&Version::semver(1, 6, 0)));
        assert_eq!(sel.constraint_on(&ProjectName::from("q")), Constraint::Any);
    }

    #[test]
    fn required_packages_collects_deppers() {
        let mut sel = Selection::new();
        sel.push_dep(edge("x", "p", "*", &["p", "p/sub"]));
        sel.push_dep(edge("y", "p", "*", &["p/sub"]));
        let required = sel.required_packages(&ProjectName::from("p"));
        assert_eq!(required["p"].len(), 1);
        assert_eq!(required["p/sub"].len(), 2);
    }

    #[test]
    fn add_packages_extends_selected_project() {
        let mut sel = Selection::new();
        let atom = Atom::new(ProjectIdentifier::new("p"), Version::semver(1, 0, 0));
        sel.select(atom, ["p".to_string()].into_iter().collect());
        sel.add_packages(&ProjectName::from("p"), ["p/sub".to_string()].into_iter().collect());
        assert_eq!(sel.selected(&ProjectName::from("p")).unwrap().packages.len(), 2);
    }
}
