//! Entity identity index.
//!
//! Maps stable entity IDs to dense positions in the materialized state
//! array. The index is built once from the initial entity list and never
//! changes, so a single instance can be shared (via `Arc`) across every
//! attribute tapefile of the same population.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier of one simulated entity within its population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable map from entity ID to dense position in `[0, N)`.
///
/// N is fixed at construction from the initial entity list. Positions are
/// assigned in list order, so `copy_state()` output lines up with the
/// original id array.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    positions: HashMap<EntityId, usize>,
}

impl EntityIndex {
    /// Builds the index from the full initial entity list.
    pub fn new(ids: &[EntityId]) -> Self {
        let positions = ids.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();
        Self { positions }
    }

    /// Returns the dense position for an entity, or `None` for unknown ids.
    pub fn get(&self, id: EntityId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Resolves a batch of ids, order-preserving.
    ///
    /// Unknown ids map to `None` so callers can filter them out while
    /// keeping alignment with a parallel value array.
    pub fn get_array(&self, ids: &[EntityId]) -> Vec<Option<usize>> {
        ids.iter().map(|id| self.get(*id)).collect()
    }

    /// Number of entities in the population.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when the population is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_positions_follow_list_order() {
        let index = EntityIndex::new(&[EntityId(10), EntityId(20), EntityId(30)]);

        assert_eq!(index.len(), 3);
        assert_eq!(index.get(EntityId(10)), Some(0));
        assert_eq!(index.get(EntityId(20)), Some(1));
        assert_eq!(index.get(EntityId(30)), Some(2));
    }

    #[test]
    fn test_index_unknown_id_is_none() {
        let index = EntityIndex::new(&[EntityId(1)]);

        assert_eq!(index.get(EntityId(99)), None);
    }

    #[test]
    fn test_get_array_preserves_order_and_gaps() {
        let index = EntityIndex::new(&[EntityId(5), EntityId(6)]);

        let positions = index.get_array(&[EntityId(6), EntityId(7), EntityId(5)]);

        assert_eq!(positions, vec![Some(1), None, Some(0)]);
    }
}
