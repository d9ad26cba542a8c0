//! Dependency resolution engine: a backtracking search that picks one version
//! per project such that every constraint holds and every imported package
//! exists, with a structured explanation when no such assignment exists.

pub mod cache;
pub mod failure;
pub mod graph;
pub mod queue;
pub mod selection;
pub mod solver;

mod checks;

pub use failure::{Failure, SolveError, SolveFailure};
pub use solver::{LockedProject, Solution, Solver};
