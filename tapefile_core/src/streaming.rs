//! Live-ingestion tapefile.
//!
//! The streaming variant accepts new updates while scrubbing is already in
//! progress. It differs from the batch path in three ways:
//!
//! - appended updates carry no rollback; one is computed and cached the
//!   first time the cursor crosses the update (the only moment the
//!   pre-update state is in hand),
//! - a same-timestamp merge mutates the stored update in place and bumps
//!   its version token, so cached external references detect staleness by
//!   comparing an integer instead of deep-comparing arrays,
//! - historical whole-array rollback snapshots can be trimmed once a newer
//!   one exists, reclaiming memory without losing backward seekability.

use std::sync::Arc;

use crate::error::Result;
use crate::index::EntityIndex;
use crate::payload::{AttributeKey, EntityGroupPayload, UpdateDelta};
use crate::tapefile::{IngestOutcome, RollbackPolicy, SinglePropertyTapefile};
use crate::update::Update;

/// Construction options for a streaming tapefile.
#[derive(Debug)]
pub struct InitializeOptions<T> {
    /// Pre-built identity index to share across attributes of the same
    /// population; built from `initial_data`'s ids when absent.
    pub index: Option<Arc<EntityIndex>>,

    /// Initial entity-group payload (full id array, optional seed values).
    pub initial_data: EntityGroupPayload<T>,
}

/// Open-for-writes tapefile over one attribute.
#[derive(Debug)]
pub struct StreamingTapefile<T> {
    inner: SinglePropertyTapefile<T>,
    last_arrival_seq: Option<u64>,
}

impl<T: Clone> StreamingTapefile<T> {
    /// Seeds the tapefile with initial data, optionally reusing a shared
    /// index.
    pub fn initialize(key: AttributeKey, options: InitializeOptions<T>) -> Self {
        let index = options
            .index
            .unwrap_or_else(|| Arc::new(EntityIndex::new(options.initial_data.ids())));
        Self {
            inner: SinglePropertyTapefile::seeded(key, index, &options.initial_data),
            last_arrival_seq: None,
        }
    }

    /// Ingests one delta while consumption may already be in progress.
    ///
    /// Filtering and coalescing follow the batch rules; appended updates
    /// are not applied to the state until the cursor reaches them, so
    /// `max_time` simply grows. `arrival_seq` is a reserved ordering hint
    /// from the transport layer, recorded for diagnostics only.
    pub fn add_update(&mut self, delta: &UpdateDelta<T>, arrival_seq: u64) -> Result<IngestOutcome> {
        self.last_arrival_seq = Some(arrival_seq);
        self.inner.ingest(delta, RollbackPolicy::Lazy)
    }

    /// Seeks to `timestamp`; identical semantics to the batch tapefile.
    pub fn move_to(&mut self, timestamp: f64) -> Result<()> {
        self.inner.move_to(timestamp)
    }

    /// Shrinks historical whole-array rollbacks to their touched subsets.
    ///
    /// The most recent whole-array snapshot is never touched: it remains
    /// the anchor that, together with the intervening partial rollbacks,
    /// keeps all earlier history reachable. Idempotent; invoked
    /// opportunistically by the host.
    pub fn trim_rollbacks(&mut self) {
        self.inner.trim_rollbacks();
    }

    /// Defensive copy of the materialized state at the cursor.
    pub fn copy_state(&self) -> Vec<Option<T>> {
        self.inner.copy_state()
    }

    /// Timestamp of the update under the cursor.
    pub fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    /// Timestamp of the next update, or `+inf` at the last one.
    pub fn next_time(&self) -> f64 {
        self.inner.next_time()
    }

    /// Timestamp of the first stored update.
    pub fn min_time(&self) -> f64 {
        self.inner.min_time()
    }

    /// Timestamp of the most recent stored update.
    pub fn max_time(&self) -> f64 {
        self.inner.max_time()
    }

    /// Population size N.
    pub fn num_entities(&self) -> usize {
        self.inner.num_entities()
    }

    /// Number of stored updates, the initial-state sentinel included.
    pub fn num_updates(&self) -> usize {
        self.inner.num_updates()
    }

    /// Borrow a stored update, e.g. to watch its version token.
    pub fn update_at(&self, position: usize) -> Option<&Update<T>> {
        self.inner.update_at(position)
    }

    /// The attribute this tapefile reconstructs.
    pub fn key(&self) -> &AttributeKey {
        self.inner.key()
    }

    /// The identity index, shareable with sibling attributes.
    pub fn index(&self) -> &Arc<EntityIndex> {
        self.inner.index()
    }

    /// Arrival hint of the most recent `add_update` call.
    pub fn last_arrival_seq(&self) -> Option<u64> {
        self.last_arrival_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::EntityId;

    fn key() -> AttributeKey {
        AttributeKey::new("prop")
    }

    fn initial() -> EntityGroupPayload<i64> {
        EntityGroupPayload::new(vec![EntityId(1), EntityId(2), EntityId(3)])
            .with_attribute(key(), vec![Some(0), Some(0), Some(0)])
    }

    fn streaming() -> StreamingTapefile<i64> {
        StreamingTapefile::initialize(
            key(),
            InitializeOptions {
                index: None,
                initial_data: initial(),
            },
        )
    }

    fn delta(timestamp: f64, iteration: i64, entries: &[(u64, i64)]) -> UpdateDelta<i64> {
        let ids = entries.iter().map(|(id, _)| EntityId(*id)).collect();
        let values = entries.iter().map(|(_, value)| Some(*value)).collect();
        UpdateDelta::new(
            timestamp,
            iteration,
            EntityGroupPayload::new(ids).with_attribute(key(), values),
        )
    }

    #[test]
    fn test_add_update_extends_history_without_moving_cursor() {
        let mut tapefile = streaming();

        tapefile.add_update(&delta(1.0, 1, &[(1, 7)]), 0).unwrap();

        // Not applied until the cursor crosses it.
        assert_eq!(tapefile.copy_state(), vec![Some(0), Some(0), Some(0)]);
        assert_eq!(tapefile.max_time(), 1.0);
        assert_eq!(tapefile.next_time(), 1.0);

        tapefile.move_to(1.0).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(7), Some(0), Some(0)]);
    }

    #[test]
    fn test_lazy_rollback_enables_backward_seek() {
        let mut tapefile = streaming();
        tapefile.add_update(&delta(1.0, 1, &[(1, 1)]), 0).unwrap();
        tapefile.add_update(&delta(2.0, 2, &[(1, 2), (2, 2)]), 1).unwrap();

        tapefile.move_to(2.0).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(2), Some(2), Some(0)]);

        tapefile.move_to(1.0).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn test_max_time_grows_mid_consumption() {
        let mut tapefile = streaming();
        tapefile.add_update(&delta(1.0, 1, &[(1, 1)]), 0).unwrap();
        tapefile.move_to(1.0).unwrap();

        tapefile.add_update(&delta(5.0, 2, &[(2, 5)]), 1).unwrap();
        assert_eq!(tapefile.max_time(), 5.0);

        tapefile.move_to(10.0).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(1), Some(5), Some(0)]);
    }

    #[test]
    fn test_merge_bumps_version_append_does_not() {
        let mut tapefile = streaming();
        tapefile.add_update(&delta(1.0, 1, &[(1, 1)]), 0).unwrap();
        let before = tapefile.update_at(1).unwrap().version();

        let outcome = tapefile.add_update(&delta(1.0, 2, &[(2, 2)]), 1).unwrap();
        assert_eq!(outcome, IngestOutcome::Merged);
        assert!(tapefile.update_at(1).unwrap().version() > before);

        let merged_version = tapefile.update_at(1).unwrap().version();
        tapefile.add_update(&delta(2.0, 3, &[(3, 3)]), 2).unwrap();
        assert_eq!(tapefile.update_at(1).unwrap().version(), merged_version);
        assert_eq!(tapefile.update_at(2).unwrap().version(), 0);
    }

    #[test]
    fn test_merge_behind_cursor_applies_on_crossing() {
        let mut tapefile = streaming();
        tapefile.add_update(&delta(1.0, 1, &[(1, 1)]), 0).unwrap();
        tapefile.add_update(&delta(1.0, 2, &[(2, 9)]), 1).unwrap();

        tapefile.move_to(1.0).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(1), Some(9), Some(0)]);
    }

    #[test]
    fn test_merge_at_cursor_reapplies_in_place() {
        let mut tapefile = streaming();
        tapefile.add_update(&delta(1.0, 1, &[(1, 1)]), 0).unwrap();
        tapefile.move_to(1.0).unwrap();

        // Cursor sits on the t=1 update; the merge must undo, fold, reapply.
        tapefile.add_update(&delta(1.0, 2, &[(1, 4), (3, 4)]), 1).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(4), Some(0), Some(4)]);

        tapefile.move_to(0.0).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn test_shared_index_across_attributes() {
        let index = Arc::new(EntityIndex::new(&[EntityId(1), EntityId(2), EntityId(3)]));

        let first = StreamingTapefile::<i64>::initialize(
            AttributeKey::new("a"),
            InitializeOptions {
                index: Some(index.clone()),
                initial_data: EntityGroupPayload::new(vec![EntityId(1), EntityId(2), EntityId(3)]),
            },
        );
        let second = StreamingTapefile::<i64>::initialize(
            AttributeKey::new("b"),
            InitializeOptions {
                index: Some(index.clone()),
                initial_data: EntityGroupPayload::new(vec![EntityId(1), EntityId(2), EntityId(3)]),
            },
        );

        assert!(Arc::ptr_eq(first.index(), second.index()));
        assert_eq!(first.num_entities(), 3);
        assert_eq!(second.num_entities(), 3);
    }

    #[test]
    fn test_trim_keeps_most_recent_full_rollback() {
        let mut tapefile = streaming();
        // Two updates each touching 2 of 3 entities: both rollbacks get
        // promoted to full snapshots when crossed.
        tapefile.add_update(&delta(1.0, 1, &[(1, 1), (2, 1)]), 0).unwrap();
        tapefile.add_update(&delta(2.0, 2, &[(2, 2), (3, 2)]), 1).unwrap();
        tapefile.move_to(2.0).unwrap();

        assert!(tapefile.update_at(1).unwrap().has_full_rollback());
        assert!(tapefile.update_at(2).unwrap().has_full_rollback());

        tapefile.trim_rollbacks();

        assert!(!tapefile.update_at(1).unwrap().has_full_rollback());
        assert!(tapefile.update_at(2).unwrap().has_full_rollback());

        // Trimmed history still seeks backward correctly.
        tapefile.move_to(f64::NEG_INFINITY).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn test_trim_is_idempotent() {
        let mut tapefile = streaming();
        tapefile.add_update(&delta(1.0, 1, &[(1, 1), (2, 1)]), 0).unwrap();
        tapefile.add_update(&delta(2.0, 2, &[(2, 2), (3, 2)]), 1).unwrap();
        tapefile.move_to(2.0).unwrap();

        tapefile.trim_rollbacks();
        let first_pass: Vec<bool> = (0..tapefile.num_updates())
            .map(|pos| tapefile.update_at(pos).unwrap().has_full_rollback())
            .collect();

        tapefile.trim_rollbacks();
        let second_pass: Vec<bool> = (0..tapefile.num_updates())
            .map(|pos| tapefile.update_at(pos).unwrap().has_full_rollback())
            .collect();

        assert_eq!(first_pass, second_pass);

        tapefile.move_to(1.0).unwrap();
        assert_eq!(tapefile.copy_state(), vec![Some(1), Some(1), Some(0)]);
    }

    #[test]
    fn test_sparse_update_stays_partial() {
        let mut tapefile = streaming();
        // 1 of 3 entities touched: below the keyframe promotion threshold.
        tapefile.add_update(&delta(1.0, 1, &[(1, 1)]), 0).unwrap();
        tapefile.move_to(1.0).unwrap();

        assert!(!tapefile.update_at(1).unwrap().has_full_rollback());
    }

    #[test]
    fn test_arrival_seq_is_recorded() {
        let mut tapefile = streaming();
        assert_eq!(tapefile.last_arrival_seq(), None);

        tapefile.add_update(&delta(1.0, 1, &[(1, 1)]), 17).unwrap();
        assert_eq!(tapefile.last_arrival_seq(), Some(17));
    }
}
