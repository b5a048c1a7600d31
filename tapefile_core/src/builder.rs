//! Batch construction of a tapefile.
//!
//! The builder consumes the initial entity-group payload plus an ordered
//! update list, then finalizes into an immutable random-access
//! [`SinglePropertyTapefile`]. Because `finalize` takes the builder by
//! value, ingesting after finalization is a compile error rather than a
//! runtime one.

use std::sync::Arc;

use crate::error::Result;
use crate::index::EntityIndex;
use crate::payload::{AttributeKey, EntityGroupPayload, UpdateDelta};
use crate::tapefile::{IngestOutcome, RollbackPolicy, SinglePropertyTapefile};

/// Batch ingestion front-end for one attribute.
#[derive(Debug)]
pub struct TapefileBuilder<T> {
    tapefile: SinglePropertyTapefile<T>,
}

impl<T: Clone> TapefileBuilder<T> {
    /// Creates a builder for `key` over the population described by
    /// `initial_data`.
    ///
    /// The payload must carry the full id array for all N entities; if the
    /// attribute itself is present, its values seed the initial state.
    pub fn new(key: AttributeKey, initial_data: &EntityGroupPayload<T>) -> Self {
        let index = Arc::new(EntityIndex::new(initial_data.ids()));
        Self {
            tapefile: SinglePropertyTapefile::seeded(key, index, initial_data),
        }
    }

    /// Folds one delta into the accumulating history.
    ///
    /// Deltas must arrive with strictly increasing iterations and
    /// non-decreasing timestamps; rollbacks are computed eagerly so the
    /// finished tapefile can seek backward immediately.
    pub fn add_update(&mut self, delta: &UpdateDelta<T>) -> Result<IngestOutcome> {
        self.tapefile.ingest(delta, RollbackPolicy::Eager)
    }

    /// Closes the builder and returns the finished tapefile, positioned at
    /// the end of its history.
    pub fn finalize(self) -> SinglePropertyTapefile<T> {
        self.tapefile
    }
}
