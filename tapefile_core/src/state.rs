//! Materialized per-entity attribute state.
//!
//! One array of length N, created once and mutated in place as the cursor
//! replays updates forward and backward. `None` means "no data for this
//! entity" (yet, or ever).

use crate::update::{Rollback, Update};

/// Mutable array of the attribute's current value per dense position.
#[derive(Debug, Clone)]
pub struct PropertyState<T> {
    values: Vec<Option<T>>,
}

impl<T: Clone> PropertyState<T> {
    /// Creates an all-null state for a population of `len` entities.
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![None; len],
        }
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for an empty population.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes the update's values at its touched positions.
    pub fn apply_update(&mut self, update: &Update<T>) {
        for (index, value) in update.indices.iter().zip(&update.data) {
            self.values[*index] = Some(value.clone());
        }
    }

    /// Restores the prior values captured in `rollback`.
    ///
    /// `indices` must be the touched positions of the update the rollback
    /// belongs to (ignored for a full snapshot).
    pub fn apply_rollback(&mut self, indices: &[usize], rollback: &Rollback<T>) {
        match rollback {
            Rollback::Partial(values) => {
                for (index, value) in indices.iter().zip(values) {
                    self.values[*index] = value.clone();
                }
            }
            Rollback::Full(snapshot) => {
                debug_assert_eq!(snapshot.len(), self.values.len());
                self.values.clone_from(snapshot);
            }
        }
    }

    /// Snapshot of the current values at the given positions. Used to
    /// capture a rollback just before those positions are overwritten.
    pub fn get_data_for_indices(&self, indices: &[usize]) -> Vec<Option<T>> {
        indices.iter().map(|index| self.values[*index].clone()).collect()
    }

    /// Defensive copy of the whole array, in dense-position order.
    pub fn copy_state(&self) -> Vec<Option<T>> {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_then_rollback_restores_prior_values() {
        let mut state: PropertyState<i64> = PropertyState::new(3);
        let mut update = Update::new(1.0, vec![0, 2], vec![7, 9]);

        update.rollback = Some(Rollback::Partial(state.get_data_for_indices(&update.indices)));
        state.apply_update(&update);
        assert_eq!(state.copy_state(), vec![Some(7), None, Some(9)]);

        state.apply_rollback(&update.indices, update.rollback.as_ref().unwrap());
        assert_eq!(state.copy_state(), vec![None, None, None]);
    }

    #[test]
    fn test_full_rollback_restores_entire_array() {
        let mut state: PropertyState<i64> = PropertyState::new(2);
        state.apply_update(&Update::new(0.0, vec![0, 1], vec![1, 2]));

        let snapshot = Rollback::Full(state.copy_state());
        state.apply_update(&Update::new(1.0, vec![0], vec![99]));

        state.apply_rollback(&[0], &snapshot);
        assert_eq!(state.copy_state(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_copy_state_is_defensive() {
        let state: PropertyState<i64> = PropertyState::new(1);

        let mut copy = state.copy_state();
        copy[0] = Some(42);

        assert_eq!(state.copy_state(), vec![None]);
    }
}
