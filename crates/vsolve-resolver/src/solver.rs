//! The backtracking solve loop.
//!
//! The loop drains the [`UnselectedQueue`]. For an obligation on a project
//! that is not selected yet, a choice point is pushed holding a snapshot of
//! the selection and queue plus the untried candidate versions; the first
//! candidate that passes every check is committed. When a choice point runs
//! out of candidates, the stack is popped, the previous snapshot restored, and
//! that choice point's next candidate tried. The solve fails once the first
//! choice point is exhausted.

use std::collections::{BTreeSet, VecDeque};

use vsolve_core::config::{Hint, SolveOptions, UnstablePolicy};
use vsolve_core::dependency::{Atom, AtomWithPackages, BimodalIdentifier, Dependency};
use vsolve_core::identifier::ProjectName;
use vsolve_core::package::RootProject;
use vsolve_core::source::SourceManager;
use vsolve_core::version::Version;

use crate::cache::SourceCache;
use crate::checks::Introduction;
use crate::failure::{FailedVersion, Failure, SolveError, SolveFailure};
use crate::graph::SolutionGraph;
use crate::queue::UnselectedQueue;
use crate::selection::Selection;

/// A selected project and the packages verified present in it.
pub type LockedProject = AtomWithPackages;

/// A consistent assignment of one version to every required project.
#[derive(Debug, Clone)]
pub struct Solution {
    pub root: Atom,
    /// Every selected project except the root, ordered by identifier.
    pub projects: Vec<LockedProject>,
    /// Committed edges as (depender, target).
    pub dependencies: Vec<(Atom, ProjectName)>,
    /// Candidate versions tried during the search.
    pub attempts: usize,
}

impl Solution {
    pub fn get(&self, name: &str) -> Option<&LockedProject> {
        self.projects
            .iter()
            .find(|p| p.atom.id.local_name.as_str() == name)
    }

    pub fn version_of(&self, name: &str) -> Option<&Version> {
        self.get(name).map(|p| &p.atom.version)
    }

    /// Feed this solution back in as the preference for the next solve.
    pub fn to_hint(&self) -> Hint {
        self.projects
            .iter()
            .map(|p| (p.atom.id.local_name.clone(), p.atom.version.clone()))
            .collect()
    }

    pub fn graph(&self) -> SolutionGraph {
        let mut graph = SolutionGraph::new();
        let root = graph.add_node(self.root.clone());
        graph.set_root(root);
        for p in &self.projects {
            graph.add_node(p.atom.clone());
        }
        for (depender, target) in &self.dependencies {
            if let (Some(from), Some(to)) = (
                graph.find(depender.id.local_name.as_str()),
                graph.find(target.as_str()),
            ) {
                graph.add_edge(from, to);
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// A decision that can be revisited: the obligation, the state before it was
/// decided, and the versions not yet tried.
struct ChoicePoint {
    bmi: BimodalIdentifier,
    selection: Selection,
    queue: UnselectedQueue,
    candidates: VecDeque<Version>,
    current: Option<Version>,
    fails: Vec<FailedVersion>,
    unavailable: Option<String>,
}

impl ChoicePoint {
    fn exhausted(&mut self) -> Failure {
        match self.unavailable.take() {
            Some(reason) => Failure::MissingSource {
                id: self.bmi.id.clone(),
                reason,
            },
            None => Failure::NoVersionFound {
                id: self.bmi.id.clone(),
                fails: std::mem::take(&mut self.fails),
            },
        }
    }
}

/// Resolves a [`RootProject`] against a [`SourceManager`]. One solver runs one
/// solve.
pub struct Solver<S> {
    pub(crate) cache: SourceCache<S>,
    pub(crate) options: SolveOptions,
    pub(crate) selection: Selection,
    hint: Hint,
    queue: UnselectedQueue,
    choices: Vec<ChoicePoint>,
    attempts: usize,
    deepest: Option<(usize, Failure)>,
    retreats: Vec<Atom>,
}

impl<S: SourceManager> Solver<S> {
    pub fn new(source: S) -> Self {
        Self {
            cache: SourceCache::new(source),
            options: SolveOptions::default(),
            selection: Selection::new(),
            hint: Hint::new(),
            queue: UnselectedQueue::new(),
            choices: Vec::new(),
            attempts: 0,
            deepest: None,
            retreats: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Prefer these versions when they are available.
    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hint = hint;
        self
    }

    pub fn solve(mut self, root: &RootProject) -> Result<Solution, SolveError> {
        tracing::info!("Solving dependencies of {}", root.id);
        self.cache.seed_root(root);

        let root_atom = Atom::new(root.id.clone(), Version::Root);
        let requested: BTreeSet<String> = root
            .packages
            .iter()
            .map(|p| p.import_path.clone())
            .collect();
        let intro = self
            .introduce(&root_atom, &requested, true)
            .map_err(|failure| SolveError::InvalidRoot {
                id: root.id.err_string(),
                failure,
            })?;
        self.commit(intro);

        loop {
            while let Some(bmi) = self.next_obligation() {
                if let Some(selected) = self.selection.selected(&bmi.id.local_name) {
                    let atom = selected.atom.clone();
                    tracing::trace!("Adding {} package(s) to {atom}", bmi.packages.len());
                    match self.introduce(&atom, &bmi.packages, false) {
                        Ok(intro) => self.commit(intro),
                        Err(failure) => self.backtrack(failure)?,
                    }
                    continue;
                }

                let mut cp = self.choice_point(bmi);
                match self.try_candidates(&mut cp)? {
                    Some(intro) => {
                        self.commit(intro);
                        self.choices.push(cp);
                    }
                    None => {
                        let failure = cp.exhausted();
                        self.backtrack(failure)?;
                    }
                }
            }

            // Under pinned-only, every unstable selection must be named by the
            // final edge set.
            match self.unpinned_unstable() {
                Some(failure) => self.backtrack(failure)?,
                None => break,
            }
        }

        tracing::info!(
            "Solved {} project(s) after {} attempt(s)",
            self.selection.len().saturating_sub(1),
            self.attempts
        );
        Ok(self.into_solution(root_atom))
    }

    /// Obligations on selected projects first (they cost no choice), then the
    /// project with the fewest versions, to fail fast.
    fn next_obligation(&mut self) -> Option<BimodalIdentifier> {
        let cache = &mut self.cache;
        let selection = &self.selection;
        self.queue.pop_by(|bmi| match selection.selected(&bmi.id.local_name) {
            Some(_) => (0, 0),
            None => (1, cache.version_count(&bmi.id)),
        })
    }

    /// Under [`UnstablePolicy::PinnedOnly`], the first selected unstable
    /// version that no active constraint names.
    fn unpinned_unstable(&self) -> Option<Failure> {
        if self.options.unstable != UnstablePolicy::PinnedOnly {
            return None;
        }
        self.selection.projects().iter().find_map(|p| {
            let name = &p.atom.id.local_name;
            let current = self.selection.constraint_on(name);
            if !p.atom.version.is_unstable() || current.pins_unstable() {
                return None;
            }
            tracing::debug!("{} is unstable and nothing pins it", p.atom);
            Some(Failure::VersionNotAllowed {
                goal: p.atom.clone(),
                failparent: self.selection.deps_on(name).to_vec(),
                current,
            })
        })
    }

    fn choice_point(&mut self, bmi: BimodalIdentifier) -> ChoicePoint {
        let (candidates, unavailable) = match self.cache.versions(&bmi.id) {
            Ok(versions) => {
                let candidates = order_candidates(
                    versions,
                    self.options.unstable,
                    self.hint.get(&bmi.id.local_name),
                );
                (candidates, None)
            }
            Err(e) => (VecDeque::new(), Some(e.to_string())),
        };
        tracing::debug!("Choosing a version of {} from {} candidate(s)", bmi.id, candidates.len());
        ChoicePoint {
            selection: self.selection.clone(),
            queue: self.queue.clone(),
            bmi,
            candidates,
            current: None,
            fails: Vec::new(),
            unavailable,
        }
    }

    /// Try the remaining candidates of `cp` from its snapshot. Returns the
    /// first introduction that passes every check.
    fn try_candidates(&mut self, cp: &mut ChoicePoint) -> Result<Option<Introduction>, SolveError> {
        while let Some(version) = cp.candidates.pop_front() {
            self.attempts += 1;
            if let Some(max) = self.options.max_attempts {
                if self.attempts > max {
                    tracing::warn!("Giving up after {max} attempts");
                    return Err(SolveError::AttemptsExceeded { attempts: max });
                }
            }

            self.selection = cp.selection.clone();
            self.queue = cp.queue.clone();
            let atom = Atom::new(cp.bmi.id.clone(), version.clone());
            match self.introduce(&atom, &cp.bmi.packages, true) {
                Ok(intro) => {
                    cp.current = Some(version);
                    return Ok(Some(intro));
                }
                Err(failure) => {
                    tracing::debug!("Rejected {atom}: {}", failure.trace());
                    cp.fails.push(FailedVersion { version, failure });
                }
            }
        }
        Ok(None)
    }

    /// Unwind to the most recent choice point with an untried candidate that
    /// passes, attributing `failure` to the version being abandoned.
    fn backtrack(&mut self, mut failure: Failure) -> Result<(), SolveError> {
        loop {
            self.note_failure(&failure);
            let Some(mut cp) = self.choices.pop() else {
                return Err(SolveError::Exhausted(self.exhausted(failure)));
            };
            if let Some(version) = cp.current.take() {
                let atom = Atom::new(cp.bmi.id.clone(), version.clone());
                tracing::debug!("Backtracking from {atom}");
                self.retreats.push(atom);
                cp.fails.push(FailedVersion { version, failure });
            }
            match self.try_candidates(&mut cp)? {
                Some(intro) => {
                    self.commit(intro);
                    self.choices.push(cp);
                    return Ok(());
                }
                None => failure = cp.exhausted(),
            }
        }
    }

    fn note_failure(&mut self, failure: &Failure) {
        let depth = self.choices.len();
        let deeper = match &self.deepest {
            Some((d, _)) => depth > *d,
            None => true,
        };
        if deeper {
            self.deepest = Some((depth, failure.clone()));
            self.retreats.clear();
        }
    }

    fn exhausted(&mut self, proof: Failure) -> SolveFailure {
        let cause = match self.deepest.take() {
            Some((_, cause)) => cause,
            None => proof.clone(),
        };
        tracing::info!("No solution: {}", cause.summary());
        SolveFailure {
            cause,
            retreats: std::mem::take(&mut self.retreats),
            proof,
        }
    }

    /// Record an introduction in the selection and queue its dependencies.
    fn commit(&mut self, intro: Introduction) {
        let Introduction {
            atom,
            packages,
            deps,
            fresh,
        } = intro;
        if fresh {
            tracing::debug!("Selected {atom}");
            self.selection.select(atom.clone(), packages);
        } else {
            self.selection.add_packages(&atom.id.local_name, packages);
        }

        for dep in deps {
            match self.selection.selected(&dep.ident().local_name) {
                Some(sp) => {
                    let new: BTreeSet<String> = dep.packages.difference(&sp.packages).cloned().collect();
                    if !new.is_empty() {
                        self.queue.push(BimodalIdentifier {
                            id: sp.atom.id.clone(),
                            packages: new,
                        });
                    }
                }
                None => self.queue.push(BimodalIdentifier {
                    id: dep.ident().clone(),
                    packages: dep.packages.clone(),
                }),
            }
            self.selection.push_dep(Dependency {
                depender: atom.clone(),
                dep,
            });
        }
    }

    fn into_solution(self, root: Atom) -> Solution {
        let mut projects: Vec<LockedProject> = self
            .selection
            .projects()
            .iter()
            .filter(|p| p.atom.version != Version::Root)
            .map(|p| LockedProject {
                atom: p.atom.clone(),
                packages: p.packages.clone(),
            })
            .collect();
        projects.sort_by(|a, b| a.atom.id.cmp(&b.atom.id));
        let dependencies = self
            .selection
            .all_deps()
            .map(|d| (d.depender.clone(), d.dep.ident().local_name.clone()))
            .collect();
        Solution {
            root,
            projects,
            dependencies,
            attempts: self.attempts,
        }
    }
}

/// Candidate order for one project; `preferred` goes first when present.
///
/// [`UnstablePolicy::PinnedOnly`] orders like [`UnstablePolicy::Last`]: a pin
/// may only arrive later in the search, so unstable versions stay as trailing
/// candidates and the pin is enforced once the queue drains.
pub fn order_candidates(
    versions: Vec<Version>,
    policy: UnstablePolicy,
    preferred: Option<&Version>,
) -> VecDeque<Version> {
    let mut stable = Vec::new();
    let mut pre = Vec::new();
    let mut branches = Vec::new();
    for v in versions {
        match &v {
            Version::Semver(sv) if sv.pre.is_empty() => stable.push(v),
            Version::Semver(_) => pre.push(v),
            Version::Branch(_) => branches.push(v),
            Version::Root => {}
        }
    }
    stable.sort_by(|a, b| b.cmp(a));
    pre.sort_by(|a, b| b.cmp(a));
    branches.sort();

    let mut ordered: Vec<Version> = match policy {
        UnstablePolicy::Last | UnstablePolicy::PinnedOnly => {
            stable.into_iter().chain(pre).chain(branches).collect()
        }
        UnstablePolicy::Interleave => {
            let mut semver: Vec<Version> = stable.into_iter().chain(pre).collect();
            semver.sort_by(|a, b| b.cmp(a));
            semver.into_iter().chain(branches).collect()
        }
    };
    ordered.dedup();

    if let Some(preferred) = preferred {
        if let Some(pos) = ordered.iter().position(|v| v == preferred) {
            let v = ordered.remove(pos);
            ordered.insert(0, v);
        }
    }
    ordered.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn mixed() -> Vec<Version> {
        vec![
            v("1.0.0"),
            Version::branch("main"),
            v("2.0.0-beta.1"),
            v("1.5.0"),
            v("2.0.0"),
        ]
    }

    #[test]
    fn unstable_last_by_default() {
        let order: Vec<Version> = order_candidates(mixed(), UnstablePolicy::Last, None).into();
        assert_eq!(
            order,
            vec![v("2.0.0"), v("1.5.0"), v("1.0.0"), v("2.0.0-beta.1"), Version::branch("main")]
        );
    }

    #[test]
    fn interleave_sorts_prereleases_by_precedence() {
        let order: Vec<Version> = order_candidates(mixed(), UnstablePolicy::Interleave, None).into();
        assert_eq!(
            order,
            vec![v("2.0.0"), v("2.0.0-beta.1"), v("1.5.0"), v("1.0.0"), Version::branch("main")]
        );
    }

    #[test]
    fn pinned_only_keeps_unstable_as_trailing_candidates() {
        let pinned_only = order_candidates(mixed(), UnstablePolicy::PinnedOnly, None);
        let last = order_candidates(mixed(), UnstablePolicy::Last, None);
        assert_eq!(pinned_only, last);
    }

    #[test]
    fn preferred_version_goes_first() {
        let preferred = v("1.0.0");
        let order = order_candidates(mixed(), UnstablePolicy::Last, Some(&preferred));
        assert_eq!(order.front(), Some(&preferred));
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn absent_preference_is_ignored() {
        let preferred = v("9.9.9");
        let order = order_candidates(mixed(), UnstablePolicy::Last, Some(&preferred));
        assert_eq!(order.front(), Some(&v("2.0.0")));
    }
}
