//! Memoizes source lookups for the duration of one solve.

use std::collections::{BTreeMap, HashMap};

use vsolve_core::identifier::ProjectIdentifier;
use vsolve_core::package::{Manifest, Package, PackageProblem, RootProject};
use vsolve_core::source::{PackageListing, SourceError, SourceManager};
use vsolve_core::version::Version;

type AtomKey = (ProjectIdentifier, Version);

/// Wraps a [`SourceManager`] so that each question is asked at most once.
pub struct SourceCache<S> {
    source: S,
    versions: HashMap<ProjectIdentifier, Result<Vec<Version>, SourceError>>,
    manifests: HashMap<AtomKey, Result<Manifest, SourceError>>,
    packages: HashMap<AtomKey, BTreeMap<String, Result<Package, PackageProblem>>>,
}

impl<S: SourceManager> SourceCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            versions: HashMap::new(),
            manifests: HashMap::new(),
            packages: HashMap::new(),
        }
    }

    /// Answer for the root from the caller-supplied project instead of the
    /// source.
    pub fn seed_root(&mut self, root: &RootProject) {
        let key = (root.id.clone(), Version::Root);
        self.manifests
            .insert(key.clone(), Ok(root.manifest.clone()));
        let listing = root
            .packages
            .iter()
            .map(|p| (p.import_path.clone(), Ok(p.clone())))
            .collect();
        self.packages.insert(key, listing);
        self.versions.insert(root.id.clone(), Ok(vec![Version::Root]));
    }

    pub fn versions(&mut self, id: &ProjectIdentifier) -> Result<Vec<Version>, SourceError> {
        if let Some(cached) = self.versions.get(id) {
            return cached.clone();
        }
        let result = self.source.list_versions(id);
        if let Err(ref e) = result {
            tracing::debug!("Listing versions of {id} failed: {e}");
        }
        self.versions.insert(id.clone(), result.clone());
        result
    }

    /// Number of versions, zero when the source is unavailable.
    pub fn version_count(&mut self, id: &ProjectIdentifier) -> usize {
        self.versions(id).map(|v| v.len()).unwrap_or(0)
    }

    pub fn manifest(&mut self, id: &ProjectIdentifier, version: &Version) -> Result<Manifest, SourceError> {
        let key = (id.clone(), version.clone());
        if let Some(cached) = self.manifests.get(&key) {
            return cached.clone();
        }
        let result = self.source.get_manifest(id, version);
        self.manifests.insert(key, result.clone());
        result
    }

    /// Look up `paths` in `id` at `version`. Every requested path is present
    /// in the result; paths the source did not return are `Missing`.
    pub fn packages(
        &mut self,
        id: &ProjectIdentifier,
        version: &Version,
        paths: &[String],
    ) -> Result<PackageListing, SourceError> {
        let key = (id.clone(), version.clone());
        let is_root = *version == Version::Root;
        let known = self.packages.entry(key).or_default();

        let unknown: Vec<String> = paths
            .iter()
            .filter(|p| !known.contains_key(*p))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            let mut fetched = if is_root {
                PackageListing::new()
            } else {
                self.source.list_packages(id, version, &unknown)?
            };
            for path in unknown {
                let entry = fetched.remove(&path).unwrap_or(Err(PackageProblem::Missing));
                known.insert(path, entry);
            }
        }

        Ok(paths
            .iter()
            .filter_map(|p| known.get(p).map(|r| (p.clone(), r.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting {
        calls: Cell<usize>,
    }

    impl SourceManager for Counting {
        fn list_versions(&self, _id: &ProjectIdentifier) -> Result<Vec<Version>, SourceError> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![Version::semver(1, 0, 0)])
        }

        fn list_packages(
            &self,
            _id: &ProjectIdentifier,
            _version: &Version,
            paths: &[String],
        ) -> Result<PackageListing, SourceError> {
            self.calls.set(self.calls.get() + 1);
            Ok(paths
                .iter()
                .filter(|p| p.as_str() == "p")
                .map(|p| (p.clone(), Ok(Package::new(p.clone()))))
                .collect())
        }

        fn get_manifest(&self, _id: &ProjectIdentifier, _version: &Version) -> Result<Manifest, SourceError> {
            Ok(Manifest::default())
        }
    }

    #[test]
    fn repeated_lookups_hit_the_source_once() {
        let source = Counting { calls: Cell::new(0) };
        let mut cache = SourceCache::new(&source);
        let id = ProjectIdentifier::new("p");
        cache.versions(&id).unwrap();
        cache.versions(&id).unwrap();
        assert_eq!(source.calls.get(), 1);

        let v = Version::semver(1, 0, 0);
        let paths = vec!["p".to_string(), "p/gone".to_string()];
        let first = cache.packages(&id, &v, &paths).unwrap();
        let second = cache.packages(&id, &v, &paths).unwrap();
        assert_eq!(source.calls.get(), 2);
        assert_eq!(first, second);
        assert_eq!(first["p/gone"], Err(PackageProblem::Missing));
    }
}
