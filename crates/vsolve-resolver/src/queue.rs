//! The worklist of pending obligations.

use vsolve_core::dependency::BimodalIdentifier;

/// Obligations not yet satisfied, at most one per project.
///
/// Pushing an obligation for a project that is already queued merges the
/// package lists, since a later depender may need more packages of it.
#[derive(Debug, Clone, Default)]
pub struct UnselectedQueue {
    items: Vec<BimodalIdentifier>,
}

impl UnselectedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bmi: BimodalIdentifier) {
        match self
            .items
            .iter_mut()
            .find(|b| b.id.local_name == bmi.id.local_name)
        {
            Some(existing) => existing.packages.extend(bmi.packages),
            None => self.items.push(bmi),
        }
    }

    /// Remove and return the obligation with the smallest `priority`. Ties go
    /// to the one queued first.
    pub fn pop_by<K, F>(&mut self, mut priority: F) -> Option<BimodalIdentifier>
    where
        K: Ord,
        F: FnMut(&BimodalIdentifier) -> K,
    {
        let idx = self
            .items
            .iter()
            .enumerate()
            .min_by_key(|(_, b)| priority(b))
            .map(|(i, _)| i)?;
        Some(self.items.remove(idx))
    }
}
