use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all vsolve operations outside the solve loop.
#[derive(Debug, Error, Diagnostic)]
pub enum VsolveError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed configuration (solver options, mirror rules).
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the TOML file for syntax errors and unknown keys"))]
    Config { message: String },

    /// A version or constraint string could not be parsed.
    #[error("Invalid constraint: {message}")]
    #[diagnostic(help("Constraints use semver syntax such as `^1.2`, `>=1.0, <2.0`, `*` or `branch:NAME`"))]
    Constraint { message: String },

    /// The external source capability failed.
    #[error("Source error: {message}")]
    Source { message: String },

    /// Dependency resolution failed (no consistent assignment exists).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type VsolveResult<T> = miette::Result<T>;
