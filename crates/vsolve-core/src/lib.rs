//! Core data types for the vsolve dependency solver.
//!
//! This crate defines the vocabulary the solver works in: project identity,
//! the version and constraint algebra, packages and manifests, dependency
//! edges, the injected [`source::SourceManager`] capability, solver options,
//! and mirror rewrite rules.
//!
//! Nothing here holds solver state; the only I/O is loading small TOML files.

pub mod config;
pub mod dependency;
pub mod identifier;
pub mod mirrors;
pub mod package;
pub mod source;
pub mod version;
