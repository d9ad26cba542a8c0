//! The injected capability the solver reads version and package data from.

use std::collections::BTreeMap;

use thiserror::Error;
use vsolve_util::errors::VsolveError;

use crate::identifier::ProjectIdentifier;
use crate::mirrors::MirrorSet;
use crate::package::{Manifest, Package, PackageProblem};
use crate::version::Version;

/// Per-path package lookup results. A requested path absent from the map is
/// treated as [`PackageProblem::Missing`].
pub type PackageListing = BTreeMap<String, Result<Package, PackageProblem>>;

/// Failure of the external source capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source cannot be located or reached at all.
    #[error("source for {id} could not be reached: {reason}")]
    Unavailable { id: String, reason: String },

    #[error("{message}")]
    Other { message: String },
}

impl SourceError {
    pub fn unavailable(id: &ProjectIdentifier, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            id: id.err_string(),
            reason: reason.into(),
        }
    }
}

impl From<SourceError> for VsolveError {
    fn from(e: SourceError) -> Self {
        VsolveError::Source {
            message: e.to_string(),
        }
    }
}

/// Version and package data for projects.
///
/// Implementations may cache or parallelize internally, but must return stable
/// results for a given identifier and version during one solve.
pub trait SourceManager {
    /// All published versions of a project, in any order.
    fn list_versions(&self, id: &ProjectIdentifier) -> Result<Vec<Version>, SourceError>;

    /// Look up the given package paths of a project at a version.
    fn list_packages(
        &self,
        id: &ProjectIdentifier,
        version: &Version,
        paths: &[String],
    ) -> Result<PackageListing, SourceError>;

    /// The declared dependencies of a project at a version.
    fn get_manifest(&self, id: &ProjectIdentifier, version: &Version) -> Result<Manifest, SourceError>;
}

impl<S: SourceManager + ?Sized> SourceManager for &S {
    fn list_versions(&self, id: &ProjectIdentifier) -> Result<Vec<Version>, SourceError> {
        (**self).list_versions(id)
    }

    fn list_packages(
        &self,
        id: &ProjectIdentifier,
        version: &Version,
        paths: &[String],
    ) -> Result<PackageListing, SourceError> {
        (**self).list_packages(id, version, paths)
    }

    fn get_manifest(&self, id: &ProjectIdentifier, version: &Version) -> Result<Manifest, SourceError> {
        (**self).get_manifest(id, version)
    }
}

/// A source that rewrites network addresses through a [`MirrorSet`] before
/// delegating to the wrapped source.
pub struct MirroredSource<S> {
    inner: S,
    mirrors: MirrorSet,
}

impl<S: SourceManager> MirroredSource<S> {
    pub fn new(inner: S, mirrors: MirrorSet) -> Self {
        Self { inner, mirrors }
    }

    /// The identifier as the wrapped source will see it.
    pub fn rewrite(&self, id: &ProjectIdentifier) -> ProjectIdentifier {
        match self.mirrors.get(id.net_name()) {
            Some(rewrite) => {
                tracing::debug!("Mirroring {} to {}", id.net_name(), rewrite.repo);
                ProjectIdentifier::with_network(id.local_name.clone(), rewrite.repo)
            }
            None => id.clone(),
        }
    }
}

impl<S: SourceManager> SourceManager for MirroredSource<S> {
    fn list_versions(&self, id: &ProjectIdentifier) -> Result<Vec<Version>, SourceError> {
        self.inner.list_versions(&self.rewrite(id))
    }

    fn list_packages(
        &self,
        id: &ProjectIdentifier,
        version: &Version,
        paths: &[String],
    ) -> Result<PackageListing, SourceError> {
        self.inner.list_packages(&self.rewrite(id), version, paths)
    }

    fn get_manifest(&self, id: &ProjectIdentifier, version: &Version) -> Result<Manifest, SourceError> {
        self.inner.get_manifest(&self.rewrite(id), version)
    }
}
