//! Random-access scrubbing tapefile.
//!
//! A [`SinglePropertyTapefile`] reconstructs the value of one
//! entity-population attribute at any requested timestamp by replaying a
//! sparse update stream forward and backward over an in-place state array.
//! The cursor invariant: the state always reflects `updates[0..=cursor]`
//! applied in order. Seeking costs O(updates crossed), never O(history).
//!
//! The ingestion routine here is shared between the batch builder and the
//! streaming variant; the two differ only in their [`RollbackPolicy`].

use std::sync::Arc;

use crate::error::{Result, TapefileError};
use crate::index::EntityIndex;
use crate::payload::{AttributeKey, EntityGroupPayload, UpdateDelta};
use crate::state::PropertyState;
use crate::update::{Rollback, Update, INITIAL_ITERATION, INITIAL_TIMESTAMP};

/// Share of the population an update must touch for its lazily computed
/// rollback to be promoted to a whole-array keyframe snapshot.
const FULL_ROLLBACK_RATIO: f64 = 0.5;

/// How ingestion handles rollbacks and the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RollbackPolicy {
    /// Batch construction: every accepted update gets its rollback computed
    /// up front and is applied immediately, keeping the cursor pinned at
    /// the end of history.
    Eager,

    /// Live ingestion: appended updates carry no rollback and leave the
    /// cursor (and the state) untouched; rollbacks are computed when the
    /// cursor first crosses them.
    Lazy,
}

/// What an ingestion call did with an incoming delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored as a new update at a fresh timestamp.
    Appended,

    /// Coalesced into the existing update at the same timestamp.
    Merged,

    /// Carried nothing for this attribute; ignored.
    Skipped,
}

/// Extracts the configured attribute from a payload as (positions, values).
///
/// Null values and ids unknown to the index are dropped. Returns `None`
/// when the payload doesn't carry the attribute, or carries it in a shape
/// that doesn't match the id array (the delta is simply about something
/// else).
pub(crate) fn extract_sparse<T: Clone>(
    key: &AttributeKey,
    payload: &EntityGroupPayload<T>,
    index: &EntityIndex,
) -> Option<(Vec<usize>, Vec<T>)> {
    let values = payload.attribute(key)?;
    if values.len() != payload.ids().len() {
        return None;
    }

    let positions = index.get_array(payload.ids());
    let mut indices = Vec::new();
    let mut data = Vec::new();
    for (position, value) in positions.iter().zip(values) {
        if let (Some(position), Some(value)) = (position, value) {
            indices.push(*position);
            data.push(value.clone());
        }
    }
    Some((indices, data))
}

/// Snapshot the prior values for `indices`, deciding partial vs full.
///
/// Under the lazy policy an update touching at least half the population is
/// promoted to a whole-array snapshot: at that size the full copy costs
/// little more than the touched subset and doubles as a trimmable keyframe.
/// Eager (batch) rollbacks are always partial; trimming is a streaming
/// concern.
fn compute_rollback<T: Clone>(
    state: &PropertyState<T>,
    indices: &[usize],
    policy: RollbackPolicy,
) -> Rollback<T> {
    let promote = policy == RollbackPolicy::Lazy
        && !state.is_empty()
        && indices.len() as f64 >= state.len() as f64 * FULL_ROLLBACK_RATIO;

    if promote {
        Rollback::Full(state.copy_state())
    } else {
        Rollback::Partial(state.get_data_for_indices(indices))
    }
}

/// Immutable-history, random-access tapefile over one attribute.
///
/// Produced by [`TapefileBuilder::finalize`](crate::TapefileBuilder) (batch)
/// or wrapped by [`StreamingTapefile`](crate::StreamingTapefile) (live).
#[derive(Debug)]
pub struct SinglePropertyTapefile<T> {
    key: AttributeKey,
    index: Arc<EntityIndex>,
    state: PropertyState<T>,
    updates: Vec<Update<T>>,
    cursor: usize,
    last_iteration: i64,
}

impl<T: Clone> SinglePropertyTapefile<T> {
    /// Builds the tapefile seeded with initial data.
    ///
    /// The initial values (if the attribute is present in the payload) are
    /// folded in as the first stored update at a timestamp preceding all
    /// real timestamps, so the cursor state machine never special-cases
    /// "before the first update".
    pub(crate) fn seeded(
        key: AttributeKey,
        index: Arc<EntityIndex>,
        initial_data: &EntityGroupPayload<T>,
    ) -> Self {
        let mut state = PropertyState::new(index.len());

        let (indices, data) =
            extract_sparse(&key, initial_data, &index).unwrap_or((Vec::new(), Vec::new()));
        let mut first = Update::new(INITIAL_TIMESTAMP, indices, data);
        first.rollback = Some(Rollback::Partial(
            state.get_data_for_indices(&first.indices),
        ));
        state.apply_update(&first);

        Self {
            key,
            index,
            state,
            updates: vec![first],
            cursor: 0,
            last_iteration: INITIAL_ITERATION,
        }
    }

    /// Core ingestion routine, shared by the batch and streaming variants.
    ///
    /// Implements the full accept pipeline: iteration precondition,
    /// attribute extraction (silent no-op on shape mismatch), null and
    /// unknown-id filtering, same-timestamp coalescing, and — under the
    /// eager policy — rollback capture plus immediate apply.
    pub(crate) fn ingest(
        &mut self,
        delta: &UpdateDelta<T>,
        policy: RollbackPolicy,
    ) -> Result<IngestOutcome> {
        if delta.iteration <= self.last_iteration {
            return Err(TapefileError::OutOfOrderIteration {
                last: self.last_iteration,
                got: delta.iteration,
            });
        }

        let Some((indices, data)) = extract_sparse(&self.key, &delta.data, &self.index) else {
            return Ok(IngestOutcome::Skipped);
        };
        if indices.is_empty() {
            return Ok(IngestOutcome::Skipped);
        }

        let last_pos = self.updates.len() - 1;
        debug_assert!(delta.timestamp >= self.updates[last_pos].timestamp);

        let outcome = if delta.timestamp == self.updates[last_pos].timestamp {
            self.coalesce(last_pos, Update::new(delta.timestamp, indices, data), policy)?;
            IngestOutcome::Merged
        } else {
            let mut update = Update::new(delta.timestamp, indices, data);
            if policy == RollbackPolicy::Eager {
                update.rollback = Some(compute_rollback(&self.state, &update.indices, policy));
                self.state.apply_update(&update);
                self.updates.push(update);
                self.cursor = self.updates.len() - 1;
            } else {
                self.updates.push(update);
            }
            IngestOutcome::Appended
        };

        self.last_iteration = delta.iteration;
        Ok(outcome)
    }

    /// Folds `draft` into the stored update at `target` (same timestamp).
    ///
    /// When the cursor sits on the target, the state includes it: undo it,
    /// merge in place, recompute the rollback against the pre-update state
    /// and reapply. When the cursor hasn't reached it yet (lazy ingestion),
    /// the arrays merge in place and the rollback stays unset.
    fn coalesce(
        &mut self,
        target: usize,
        draft: Update<T>,
        policy: RollbackPolicy,
    ) -> Result<()> {
        if self.cursor == target {
            let existing = &mut self.updates[target];
            let rollback = existing
                .rollback
                .take()
                .ok_or(TapefileError::MissingRollback { cursor: target })?;
            self.state.apply_rollback(&existing.indices, &rollback);

            existing.merge_from(draft);
            existing.rollback = Some(compute_rollback(&self.state, &existing.indices, policy));
            self.state.apply_update(&*existing);
        } else {
            self.updates[target].merge_from(draft);
        }
        Ok(())
    }

    /// Seeks the cursor so the state reflects the last update with
    /// `timestamp <= t` (step-function semantics, never interpolated).
    ///
    /// Timestamps outside `[min_time, max_time]` clamp to the nearest end.
    pub fn move_to(&mut self, timestamp: f64) -> Result<()> {
        let target = timestamp.clamp(self.min_time(), self.max_time());

        if target > self.current_time() {
            while self.cursor + 1 < self.updates.len()
                && self.updates[self.cursor + 1].timestamp <= target
            {
                self.step_forward()?;
            }
        } else {
            while self.current_time() > target {
                self.step_backward()?;
            }
        }
        Ok(())
    }

    /// Advances the cursor one update and applies it.
    ///
    /// Computes and caches the update's rollback first if it was ingested
    /// lazily — this is the only moment the pre-update state is in hand.
    pub fn step_forward(&mut self) -> Result<()> {
        let next = self.cursor + 1;
        if next >= self.updates.len() {
            return Err(TapefileError::AtLastUpdate {
                cursor: self.cursor,
            });
        }

        if self.updates[next].rollback.is_none() {
            let rollback =
                compute_rollback(&self.state, &self.updates[next].indices, RollbackPolicy::Lazy);
            self.updates[next].rollback = Some(rollback);
        }
        self.state.apply_update(&self.updates[next]);
        self.cursor = next;
        Ok(())
    }

    /// Undoes the current update via its rollback and retreats the cursor.
    pub fn step_backward(&mut self) -> Result<()> {
        if self.cursor == 0 {
            return Err(TapefileError::AtFirstUpdate);
        }

        let current = &self.updates[self.cursor];
        let rollback = current
            .rollback
            .as_ref()
            .ok_or(TapefileError::MissingRollback {
                cursor: self.cursor,
            })?;
        self.state.apply_rollback(&current.indices, rollback);
        self.cursor -= 1;
        Ok(())
    }

    /// Shrinks every historical whole-array rollback to the positions its
    /// update actually touched, keeping the most recent one intact as the
    /// backward-seek anchor. Idempotent.
    pub(crate) fn trim_rollbacks(&mut self) {
        let Some(anchor) = self.updates.iter().rposition(Update::has_full_rollback) else {
            return;
        };

        for update in &mut self.updates[..anchor] {
            if let Some(Rollback::Full(snapshot)) = &update.rollback {
                let trimmed = update
                    .indices
                    .iter()
                    .map(|&index| snapshot[index].clone())
                    .collect();
                update.rollback = Some(Rollback::Partial(trimmed));
            }
        }
    }

    /// Timestamp of the update under the cursor.
    pub fn current_time(&self) -> f64 {
        self.updates[self.cursor].timestamp
    }

    /// Timestamp of the next update, or `+inf` at the last one.
    pub fn next_time(&self) -> f64 {
        self.updates
            .get(self.cursor + 1)
            .map_or(f64::INFINITY, |update| update.timestamp)
    }

    /// Timestamp of the first stored update (the initial-state sentinel).
    pub fn min_time(&self) -> f64 {
        self.updates[0].timestamp
    }

    /// Timestamp of the last stored update. Grows as a streaming wrapper
    /// appends new history.
    pub fn max_time(&self) -> f64 {
        self.updates[self.updates.len() - 1].timestamp
    }

    /// Defensive copy of the materialized state, in dense-position order.
    pub fn copy_state(&self) -> Vec<Option<T>> {
        self.state.copy_state()
    }

    /// Population size N.
    pub fn num_entities(&self) -> usize {
        self.index.len()
    }

    /// Number of stored updates, the initial-state sentinel included.
    pub fn num_updates(&self) -> usize {
        self.updates.len()
    }

    /// Borrow a stored update (e.g. to watch its version token).
    pub fn update_at(&self, position: usize) -> Option<&Update<T>> {
        self.updates.get(position)
    }

    /// The attribute this tapefile reconstructs.
    pub fn key(&self) -> &AttributeKey {
        &self.key
    }

    /// The shared identity index.
    pub fn index(&self) -> &Arc<EntityIndex> {
        &self.index
    }
}
