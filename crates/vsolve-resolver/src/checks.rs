//! Satisfiability checks run before an atom is committed.

use std::collections::{BTreeMap, BTreeSet};

use vsolve_core::dependency::{Atom, CompleteDep, Dependency};
use vsolve_core::identifier::ProjectName;
use vsolve_core::package::{Manifest, PackageProblem};
use vsolve_core::source::{SourceError, SourceManager};
use vsolve_core::version::Version;

use crate::failure::{Failure, ProblemPackage};
use crate::solver::Solver;

/// Everything learned about an atom that passed every check, ready to be
/// committed.
pub(crate) struct Introduction {
    pub atom: Atom,
    /// Packages verified present, closed over internal imports.
    pub packages: BTreeSet<String>,
    /// External imports grouped under the declared dependency owning them.
    pub deps: Vec<CompleteDep>,
    /// False when packages are being added to an already selected atom.
    pub fresh: bool,
}

#[derive(Default)]
struct Reach {
    packages: BTreeSet<String>,
    external: BTreeSet<String>,
    problems: BTreeMap<String, PackageProblem>,
}

impl<S: SourceManager> Solver<S> {
    /// Check that `atom` can be introduced with `requested` packages.
    ///
    /// A fresh atom must also satisfy every constraint in force and carry
    /// every package already required of its project. A non-fresh atom is
    /// already selected, so only the new packages and their dependencies are
    /// checked.
    pub(crate) fn introduce(
        &mut self,
        atom: &Atom,
        requested: &BTreeSet<String>,
        fresh: bool,
    ) -> Result<Introduction, Failure> {
        let name = &atom.id.local_name;
        let mut requested = requested.clone();
        let known = if fresh {
            self.check_version_allowed(atom)?;
            requested.extend(self.selection.required_packages(name).into_keys());
            BTreeSet::new()
        } else {
            self.selection
                .selected(name)
                .map(|p| p.packages.clone())
                .unwrap_or_default()
        };

        let reach = self.reach(atom, &requested, &known)?;
        if !reach.problems.is_empty() {
            return Err(self.checkee_problem(atom, reach.problems));
        }

        let manifest = self
            .cache
            .manifest(&atom.id, &atom.version)
            .map_err(|e| missing_source(atom, e))?;
        let deps = group_external(atom, &manifest, &reach.external);
        for dep in &deps {
            self.check_dep(atom, dep)?;
        }

        Ok(Introduction {
            atom: atom.clone(),
            packages: reach.packages,
            deps,
            fresh,
        })
    }

    fn check_version_allowed(&self, atom: &Atom) -> Result<(), Failure> {
        if atom.version == Version::Root {
            return Ok(());
        }
        let name = &atom.id.local_name;
        let current = self.selection.constraint_on(name);
        if current.admits(&atom.version) {
            return Ok(());
        }
        let failparent = self
            .selection
            .deps_on(name)
            .iter()
            .filter(|d| !d.dep.constraint().admits(&atom.version))
            .cloned()
            .collect();
        Err(Failure::VersionNotAllowed {
            goal: atom.clone(),
            failparent,
            current,
        })
    }

    /// Walk the internal import graph of `atom` from `requested`, skipping
    /// anything in `known`. Test imports are followed only for the root, and
    /// only when tests are included.
    fn reach(
        &mut self,
        atom: &Atom,
        requested: &BTreeSet<String>,
        known: &BTreeSet<String>,
    ) -> Result<Reach, Failure> {
        let with_tests = atom.version == Version::Root && self.options.include_tests;
        let mut reach = Reach::default();
        let mut frontier: Vec<String> = requested.difference(known).cloned().collect();

        while !frontier.is_empty() {
            let listing = self
                .cache
                .packages(&atom.id, &atom.version, &frontier)
                .map_err(|e| missing_source(atom, e))?;

            let mut next = BTreeSet::new();
            for (path, entry) in listing {
                let pkg = match entry {
                    Ok(pkg) => pkg,
                    Err(problem) => {
                        reach.problems.insert(path, problem);
                        continue;
                    }
                };
                let tests: &[String] = if with_tests { &pkg.test_imports } else { &[] };
                for import in pkg.imports.iter().chain(tests) {
                    if !atom.id.local_name.contains_import(import) {
                        reach.external.insert(import.clone());
                    } else if !known.contains(import) && !frontier.contains(import) {
                        next.insert(import.clone());
                    }
                }
                reach.packages.insert(path);
            }

            frontier = next
                .into_iter()
                .filter(|p| !reach.packages.contains(p) && !reach.problems.contains_key(p))
                .collect();
        }
        Ok(reach)
    }

    fn checkee_problem(&self, atom: &Atom, problems: BTreeMap<String, PackageProblem>) -> Failure {
        let name = &atom.id.local_name;
        let required = self.selection.required_packages(name);
        let mut everyone: Vec<Atom> = Vec::new();
        for d in self.selection.deps_on(name) {
            if !everyone.contains(&d.depender) {
                everyone.push(d.depender.clone());
            }
        }
        let failpkg = problems
            .into_iter()
            .map(|(pkg, problem)| {
                let deppers = required.get(&pkg).cloned().unwrap_or_else(|| everyone.clone());
                (pkg, ProblemPackage { problem, deppers })
            })
            .collect();
        Failure::CheckeeHasProblemPackages {
            goal: atom.clone(),
            failpkg,
        }
    }

    /// Check one outgoing dependency of `atom` against the current selection.
    fn check_dep(&mut self, atom: &Atom, dep: &CompleteDep) -> Result<(), Failure> {
        let goal = || Dependency {
            depender: atom.clone(),
            dep: dep.clone(),
        };
        let target = &dep.ident().local_name;
        let siblings = self.selection.deps_on(target);

        let current = self.selection.constraint_on(target);
        if !dep.constraint().overlaps(&current) {
            let (failsib, nofailsib): (Vec<Dependency>, Vec<Dependency>) = siblings
                .iter()
                .cloned()
                .partition(|s| !s.dep.constraint().overlaps(dep.constraint()));
            return Err(Failure::DisjointConstraint {
                goal: goal(),
                failsib,
                nofailsib,
                current,
            });
        }

        let selected = self.selection.selected(target);
        if let Some(sp) = selected {
            if !dep.constraint().admits(&sp.atom.version) {
                return Err(Failure::ConstraintNotAllowed {
                    goal: goal(),
                    selected: sp.atom.version.clone(),
                });
            }
        }

        let agreed = selected
            .map(|sp| &sp.atom.id)
            .or_else(|| self.selection.ident_for(target));
        if let Some(agreed) = agreed {
            if agreed.source_conflicts_with(dep.ident()) {
                return Err(Failure::SourceMismatch {
                    shared: target.clone(),
                    selected_by: siblings.to_vec(),
                    current: agreed.net_name().to_string(),
                    mismatch: dep.ident().net_name().to_string(),
                    problem: atom.clone(),
                });
            }
        }

        let Some(sp) = selected else {
            return Ok(());
        };
        let missing: Vec<String> = dep
            .packages
            .iter()
            .filter(|p| !sp.packages.contains(*p))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let selected_atom = sp.atom.clone();
        let listing = self
            .cache
            .packages(&selected_atom.id, &selected_atom.version, &missing)
            .map_err(|e| missing_source(&selected_atom, e))?;
        let problems: BTreeMap<String, PackageProblem> = listing
            .into_iter()
            .filter_map(|(path, entry)| entry.err().map(|problem| (path, problem)))
            .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Failure::DepHasProblemPackages {
                goal: goal(),
                version: selected_atom.version,
                problems,
            })
        }
    }
}

fn missing_source(atom: &Atom, err: SourceError) -> Failure {
    Failure::MissingSource {
        id: atom.id.clone(),
        reason: err.to_string(),
    }
}

/// Group external imports under the declared dependency that owns them.
/// Imports no declared dependency covers are left out.
fn group_external(atom: &Atom, manifest: &Manifest, external: &BTreeSet<String>) -> Vec<CompleteDep> {
    let mut grouped: BTreeMap<ProjectName, CompleteDep> = BTreeMap::new();
    for import in external {
        let Some(declared) = manifest.dep_for_import(import) else {
            tracing::debug!("{atom} imports {import}, which no declared dependency covers");
            continue;
        };
        grouped
            .entry(declared.ident.local_name.clone())
            .or_insert_with(|| CompleteDep {
                dep: declared.clone(),
                packages: BTreeSet::new(),
            })
            .packages
            .insert(import.clone());
    }
    grouped.into_values().collect()
}
