//! Why a candidate, an obligation, or a whole solve was rejected.
//!
//! Every rejection is a [`Failure`] value carrying the atoms and edges
//! involved. Each variant renders two ways: [`Failure::summary`] is the
//! fully qualified explanation for top-level reporting, [`Failure::trace`] is
//! the compact form nested inside a parent failure.

use std::collections::BTreeMap;
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;
use vsolve_core::dependency::{Atom, Dependency};
use vsolve_core::identifier::{ProjectIdentifier, ProjectName};
use vsolve_core::package::PackageProblem;
use vsolve_core::version::{Constraint, Version};
use vsolve_util::errors::VsolveError;

/// A version that was tried and the reason it was rejected.
#[derive(Debug, Clone)]
pub struct FailedVersion {
    pub version: Version,
    pub failure: Failure,
}

/// A problem package together with every atom that requires it.
#[derive(Debug, Clone)]
pub struct ProblemPackage {
    pub problem: PackageProblem,
    pub deppers: Vec<Atom>,
}

#[derive(Debug, Clone)]
pub enum Failure {
    /// The identifier has no versions, or every version failed another check.
    NoVersionFound {
        id: ProjectIdentifier,
        fails: Vec<FailedVersion>,
    },
    /// The goal's constraint has no overlap with the constraints already in
    /// force. `failsib` conflict individually; `nofailsib` only conflict in
    /// combination.
    DisjointConstraint {
        goal: Dependency,
        failsib: Vec<Dependency>,
        nofailsib: Vec<Dependency>,
        current: Constraint,
    },
    /// The goal's constraint rejects the version already selected.
    ConstraintNotAllowed { goal: Dependency, selected: Version },
    /// The candidate is rejected by one or more active constraints.
    VersionNotAllowed {
        goal: Atom,
        failparent: Vec<Dependency>,
        current: Constraint,
    },
    /// The source could not be located at all.
    MissingSource { id: ProjectIdentifier, reason: String },
    /// The same project is wanted from two different network addresses.
    SourceMismatch {
        shared: ProjectName,
        selected_by: Vec<Dependency>,
        current: String,
        mismatch: String,
        problem: Atom,
    },
    /// The candidate itself lacks, or has broken, required packages.
    CheckeeHasProblemPackages {
        goal: Atom,
        failpkg: BTreeMap<String, ProblemPackage>,
    },
    /// The goal requires packages that the selected version of its target
    /// lacks or cannot use.
    DepHasProblemPackages {
        goal: Dependency,
        version: Version,
        problems: BTreeMap<String, PackageProblem>,
    },
}

impl Failure {
    /// Fully qualified explanation.
    pub fn summary(&self) -> String {
        match self {
            Failure::NoVersionFound { id, fails } => {
                if fails.is_empty() {
                    return format!("No versions found for project {}.", id.err_string());
                }
                let mut buf = format!("No versions of {} met constraints:", id.err_string());
                for f in fails {
                    buf.push_str(&format!("\n\t{}: {}", f.version, indent(&f.failure.summary(), "\t")));
                }
                buf
            }
            Failure::DisjointConstraint {
                goal,
                failsib,
                nofailsib,
                ..
            } => {
                let head = format!(
                    "Could not introduce {}, as it has a dependency on {} with constraint {}",
                    goal.depender,
                    goal.dep.ident().err_string(),
                    goal.dep.constraint()
                );
                if let [sib] = failsib.as_slice() {
                    return format!(
                        "{head}, which has no overlap with existing constraint {} from {}",
                        sib.dep.constraint(),
                        sib.depender
                    );
                }
                let (sibs, tail) = if failsib.is_empty() {
                    (
                        nofailsib,
                        "which does not overlap with the intersection of existing constraints from other currently selected packages:",
                    )
                } else {
                    (failsib, "which has no overlap with the following existing constraints:")
                };
                let mut buf = format!("{head}, {tail}");
                for sib in sibs {
                    buf.push_str(&format!("\n\t{} from {}", sib.dep.constraint(), sib.depender));
                }
                buf
            }
            Failure::ConstraintNotAllowed { goal, selected } => format!(
                "Could not introduce {}, as it has a dependency on {} with constraint {}, which does not allow the currently selected version of {}",
                goal.depender,
                goal.dep.ident().err_string(),
                goal.dep.constraint(),
                selected
            ),
            Failure::VersionNotAllowed { goal, failparent, .. } => {
                if let [parent] = failparent.as_slice() {
                    return format!(
                        "Could not introduce {}, as it is not allowed by constraint {} from project {}.",
                        goal,
                        parent.dep.constraint(),
                        parent.depender.id.err_string()
                    );
                }
                let mut buf = format!(
                    "Could not introduce {}, as it is not allowed by constraints from the following projects:",
                    goal
                );
                for parent in failparent {
                    buf.push_str(&format!("\n\t{} from {}", parent.dep.constraint(), parent.depender));
                }
                buf
            }
            Failure::MissingSource { id, reason } => {
                format!("Could not find a source for {}: {reason}", id.err_string())
            }
            Failure::SourceMismatch {
                shared,
                selected_by,
                current,
                mismatch,
                problem,
            } => {
                let by: Vec<String> = selected_by
                    .iter()
                    .map(|d| d.depender.id.trace_string())
                    .collect();
                format!(
                    "Could not introduce {problem}, as it depends on {shared} from {mismatch}, but {shared} is already marked as coming from {current} by {}",
                    by.join(", ")
                )
            }
            Failure::CheckeeHasProblemPackages { goal, failpkg } => {
                let mut buf = String::new();
                let multiple = failpkg.len() > 1;
                if multiple {
                    buf.push_str(&format!(
                        "Could not introduce {goal} due to multiple problematic subpackages:"
                    ));
                }
                for (pkg, pp) in failpkg {
                    if multiple {
                        buf.push_str(&format!("\n\tSubpackage {pkg} {}.", pp.problem));
                    } else {
                        buf.push_str(&format!(
                            "Could not introduce {goal}, as its subpackage {pkg} {}.",
                            pp.problem
                        ));
                    }
                    match pp.deppers.as_slice() {
                        [] => {}
                        [only] => buf.push_str(&format!(" (Package is required by {only}.)")),
                        many => {
                            buf.push_str(" Package is required by:");
                            for a in many {
                                buf.push_str(&format!("\n\t\t{a}"));
                            }
                        }
                    }
                }
                buf
            }
            Failure::DepHasProblemPackages {
                goal,
                version,
                problems,
            } => {
                if problems.len() == 1 {
                    if let Some((pkg, problem)) = problems.iter().next() {
                        return format!(
                            "Could not introduce {}, as it requires package {pkg} from {}, but in version {version} that package {problem}.",
                            goal.depender,
                            goal.dep.ident().err_string()
                        );
                    }
                }
                let mut buf = format!(
                    "Could not introduce {}, as it requires problematic packages from {} (current version {version}):",
                    goal.depender,
                    goal.dep.ident().err_string()
                );
                for (pkg, problem) in problems {
                    buf.push_str(&format!("\n\t{pkg} {problem}"));
                }
                buf
            }
        }
    }

    /// Compact explanation for nesting inside another failure.
    pub fn trace(&self) -> String {
        match self {
            Failure::NoVersionFound { id, fails } => {
                if fails.is_empty() {
                    return format!("no versions of {} found", id.trace_string());
                }
                let mut buf = format!("no versions of {} met constraints:", id.trace_string());
                for f in fails {
                    buf.push_str(&format!("\n  {}: {}", f.version, indent(&f.failure.trace(), "    ")));
                }
                buf
            }
            Failure::DisjointConstraint {
                goal,
                failsib,
                nofailsib,
                ..
            } => {
                let mut buf = format!(
                    "constraint {} on {} disjoint with other dependers:",
                    goal.dep.constraint(),
                    goal.dep.ident().trace_string()
                );
                for sib in failsib {
                    buf.push_str(&format!("\n  {} (no overlap)", short_edge(sib)));
                }
                for sib in nofailsib {
                    buf.push_str(&format!("\n  {} (some overlap)", short_edge(sib)));
                }
                buf
            }
            Failure::ConstraintNotAllowed { goal, selected } => format!(
                "{} at {} depends on {} with {}, but that's already selected at {selected}",
                goal.depender.id.trace_string(),
                goal.depender.version,
                goal.dep.ident().trace_string(),
                goal.dep.constraint()
            ),
            Failure::VersionNotAllowed {
                goal,
                failparent,
                current,
            } => {
                let mut buf = format!(
                    "{} at {} not allowed by constraint {current}:",
                    goal.id.trace_string(),
                    goal.version
                );
                for parent in failparent {
                    buf.push_str(&format!("\n  {}", short_edge(parent)));
                }
                buf
            }
            Failure::MissingSource { id, reason } => {
                format!("source for {} unavailable ({reason})", id.trace_string())
            }
            Failure::SourceMismatch {
                shared,
                selected_by,
                current,
                mismatch,
                problem,
            } => {
                let mut buf = format!("disagreement on network addr for {shared}:");
                buf.push_str(&format!("\n  {mismatch} from {}", problem.id.err_string()));
                for dep in selected_by {
                    buf.push_str(&format!("\n  {current} from {}", dep.depender.id.err_string()));
                }
                buf
            }
            Failure::CheckeeHasProblemPackages { goal, failpkg } => {
                let mut buf = format!(
                    "{} at {} has problem subpkg(s):",
                    goal.id.trace_string(),
                    goal.version
                );
                for (pkg, pp) in failpkg {
                    buf.push_str(&format!("\n  {pkg} {}", pp.problem));
                    match pp.deppers.as_slice() {
                        [] => {}
                        [only] => buf.push_str(&format!("; required by {only}")),
                        many => {
                            buf.push_str("; required by:");
                            for a in many {
                                buf.push_str(&format!("\n    {a}"));
                            }
                        }
                    }
                }
                buf
            }
            Failure::DepHasProblemPackages {
                goal,
                version,
                problems,
            } => {
                let mut buf = format!(
                    "{} depping on {} at {version} has problem subpkg(s):",
                    goal.depender,
                    goal.dep.ident().err_string()
                );
                for (pkg, problem) in problems {
                    buf.push_str(&format!("\n  {pkg} {problem}"));
                }
                buf
            }
        }
    }

    /// Visit this failure and every failure nested inside it, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Failure)) {
        visit(self);
        if let Failure::NoVersionFound { fails, .. } = self {
            for f in fails {
                f.failure.walk(visit);
            }
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for Failure {}

fn short_edge(d: &Dependency) -> String {
    format!(
        "{} from {} at {}",
        d.dep.constraint(),
        d.depender.id.trace_string(),
        d.depender.version
    )
}

fn indent(s: &str, prefix: &str) -> String {
    s.replace('\n', &format!("\n{prefix}"))
}

/// The outcome of an exhausted search.
#[derive(Debug, Clone)]
pub struct SolveFailure {
    /// The failure that caused the deepest backtrack.
    pub cause: Failure,
    /// Atoms unwound after `cause`, in the order they were unwound.
    pub retreats: Vec<Atom>,
    /// The failure of the first obligation, which nests every rejection.
    pub proof: Failure,
}

impl SolveFailure {
    pub fn summary(&self) -> String {
        self.cause.summary()
    }

    pub fn trace(&self) -> String {
        let mut buf = self.cause.trace();
        if !self.retreats.is_empty() {
            buf.push_str("\nbacktracked through:");
            for atom in &self.retreats {
                buf.push_str(&format!("\n  {atom}"));
            }
        }
        buf
    }
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for SolveFailure {}

/// Errors that escape [`crate::Solver::solve`].
#[derive(Debug, Error, Diagnostic)]
pub enum SolveError {
    /// The root project's own packages or declared dependencies are
    /// inconsistent; reported before any version is tried.
    #[error("Root project {id} is invalid: {failure}")]
    #[diagnostic(help("Check the root project's imports and declared dependencies"))]
    InvalidRoot { id: String, failure: Failure },

    /// No consistent assignment exists.
    #[error("{0}")]
    #[diagnostic(help("The full trace lists every rejected version and why"))]
    Exhausted(SolveFailure),

    /// The configured attempt budget ran out.
    #[error("Gave up after {attempts} candidate attempts")]
    #[diagnostic(help("Raise `max-attempts` in the solver options"))]
    AttemptsExceeded { attempts: usize },
}

impl From<SolveError> for VsolveError {
    fn from(err: SolveError) -> Self {
        let message = match &err {
            SolveError::Exhausted(failure) => failure.trace(),
            other => other.to_string(),
        };
        VsolveError::Resolution { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpublished() -> Failure {
        Failure::NoVersionFound {
            id: "example.com/z".into(),
            fails: Vec::new(),
        }
    }

    #[test]
    fn exhausted_solve_converts_with_full_trace() {
        let failure = SolveFailure {
            cause: unpublished(),
            retreats: vec![Atom::new("example.com/a".into(), "1.0.0".parse().unwrap())],
            proof: unpublished(),
        };
        let err: VsolveError = SolveError::Exhausted(failure).into();
        let rendered = err.to_string();
        assert!(rendered.contains("no versions of example.com/z found"));
        assert!(rendered.contains("backtracked through:"));
    }

    #[test]
    fn compact_trace_keeps_differing_source_address() {
        let failure = Failure::MissingSource {
            id: ProjectIdentifier::with_network("acme/lib", "https://a.example/lib"),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            failure.trace(),
            "source for acme/lib (from https://a.example/lib) unavailable (connection refused)"
        );
    }

    #[test]
    fn walk_visits_nested_failures() {
        let outer = Failure::NoVersionFound {
            id: "example.com/a".into(),
            fails: vec![FailedVersion {
                version: "1.0.0".parse().unwrap(),
                failure: unpublished(),
            }],
        };
        let mut seen = 0;
        outer.walk(&mut |_| seen += 1);
        assert_eq!(seen, 2);
    }
}
