//! Update records: the atomic sparse deltas stored on a tapefile.

use std::collections::HashMap;

/// Timestamp of the synthetic initial-state update. Precedes every
/// legitimate engine timestamp, so the cursor parked on it reads as
/// "before the first real update".
pub const INITIAL_TIMESTAMP: f64 = f64::NEG_INFINITY;

/// Iteration seeded before any engine iteration has been accepted. Older
/// than any legitimate iteration.
pub const INITIAL_ITERATION: i64 = i64::MIN;

/// Prior values needed to undo one update.
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback<T> {
    /// Values aligned element-for-element with the update's `indices`.
    Partial(Vec<Option<T>>),

    /// Snapshot of the entire state array as it stood going into the
    /// update. Reconstructs the full prior array, not just the touched
    /// subset, which makes it a keyframe for backward seeking (and a
    /// candidate for trimming once a later keyframe exists).
    Full(Vec<Option<T>>),
}

impl<T> Rollback<T> {
    /// True for a whole-array snapshot.
    pub fn is_full(&self) -> bool {
        matches!(self, Rollback::Full(_))
    }
}

/// One coalesced delta at one logical timestamp.
///
/// Stored updates hold non-decreasing timestamps and no two stored updates
/// share one: same-timestamp deltas are merged into the existing record in
/// place, bumping `version` so that cached external references can detect
/// the change without deep-comparing arrays.
#[derive(Debug, Clone)]
pub struct Update<T> {
    /// Scenario-relative time this update takes effect.
    pub timestamp: f64,

    /// Positions touched, unique within one update. Aligned with `data`.
    pub indices: Vec<usize>,

    /// New values, aligned with `indices`. Null entries were filtered
    /// during ingestion, so every stored value is real information.
    pub data: Vec<T>,

    /// Prior values at `indices` (or a full snapshot), captured the
    /// instant before this update was first applied. `None` until the
    /// cursor first crosses the update under lazy ingestion.
    pub rollback: Option<Rollback<T>>,

    version: u64,
}

impl<T> Update<T> {
    /// Creates a fresh update with no rollback and version 0.
    pub fn new(timestamp: f64, indices: Vec<usize>, data: Vec<T>) -> Self {
        debug_assert_eq!(indices.len(), data.len());
        Self {
            timestamp,
            indices,
            data,
            rollback: None,
            version: 0,
        }
    }

    /// Invalidation token: bumped on every in-place merge, never on append
    /// or rollback trimming.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True when this update carries a whole-array rollback snapshot.
    pub fn has_full_rollback(&self) -> bool {
        self.rollback.as_ref().is_some_and(Rollback::is_full)
    }

    /// Folds a later-arriving delta at the same timestamp into this record.
    ///
    /// Index sets are unioned; on overlap the later delta wins. Ordering is
    /// this record's indices followed by any newly introduced ones. The
    /// rollback is dropped (the caller recomputes it when the merged record
    /// is applied) and `version` is bumped.
    pub(crate) fn merge_from(&mut self, other: Update<T>) {
        debug_assert_eq!(self.timestamp, other.timestamp);

        let mut slot_of: HashMap<usize, usize> = self
            .indices
            .iter()
            .enumerate()
            .map(|(slot, index)| (*index, slot))
            .collect();

        for (index, value) in other.indices.into_iter().zip(other.data) {
            match slot_of.get(&index) {
                Some(&slot) => self.data[slot] = value,
                None => {
                    slot_of.insert(index, self.indices.len());
                    self.indices.push(index);
                    self.data.push(value);
                }
            }
        }

        self.rollback = None;
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_second_wins_on_overlap() {
        let mut first = Update::new(0.0, vec![0, 1], vec![1, 1]);
        let second = Update::new(0.0, vec![1, 2], vec![2, 2]);

        first.merge_from(second);

        assert_eq!(first.indices, vec![0, 1, 2]);
        assert_eq!(first.data, vec![1, 2, 2]);
    }

    #[test]
    fn test_merge_bumps_version_and_drops_rollback() {
        let mut first = Update::new(1.0, vec![0], vec![10]);
        first.rollback = Some(Rollback::Partial(vec![Some(0)]));
        assert_eq!(first.version(), 0);

        first.merge_from(Update::new(1.0, vec![3], vec![30]));

        assert_eq!(first.version(), 1);
        assert!(first.rollback.is_none());
    }

    #[test]
    fn test_merge_keeps_first_ordering() {
        let mut first = Update::new(0.0, vec![5, 2], vec!["a", "b"]);

        first.merge_from(Update::new(0.0, vec![9, 5], vec!["c", "d"]));

        // Existing positions keep their slots; position 9 is appended.
        assert_eq!(first.indices, vec![5, 2, 9]);
        assert_eq!(first.data, vec!["d", "b", "c"]);
    }
}
