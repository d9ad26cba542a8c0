//! Shared utilities for vsolve.
//!
//! This crate provides the cross-cutting error type used by the other vsolve
//! crates when loading configuration, parsing constraints, or surfacing a
//! failed resolution to a user.

pub mod errors;
