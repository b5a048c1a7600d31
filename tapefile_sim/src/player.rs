//! Playback host.
//!
//! The Player is the event-loop collaborator the tapefile is designed for:
//! it ingests deltas as they "arrive", scrubs a cursor in response to
//! seek requests, trims rollbacks opportunistically, and can verify every
//! reconstruction against a brute-force reference replay of the retained
//! delta history.

use std::sync::Arc;

use tracing::{debug, trace};

use tapefile_core::{
    AttributeKey, EntityGroupPayload, EntityId, EntityIndex, InitializeOptions, StreamingTapefile,
    TapefileError, UpdateDelta,
};

/// Host-side playback configuration.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Trim rollbacks after this many ingested deltas (0 = never)
    pub trim_interval: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { trim_interval: 16 }
    }
}

/// Brute-force reference reconstruction: per entity, the value of the last
/// delta with `timestamp <= t` that touched it, else the initial value,
/// else null. O(total history) on every call; only suitable for
/// verification.
pub fn reference_state(
    key: &AttributeKey,
    initial_data: &EntityGroupPayload<f64>,
    deltas: &[UpdateDelta<f64>],
    index: &EntityIndex,
    timestamp: f64,
) -> Vec<Option<f64>> {
    let mut state = vec![None; index.len()];

    let fold = |ids: &[EntityId], values: &[Option<f64>], state: &mut Vec<Option<f64>>| {
        if ids.len() != values.len() {
            return;
        }
        for (id, value) in ids.iter().zip(values) {
            if let (Some(position), Some(value)) = (index.get(*id), value) {
                state[position] = Some(*value);
            }
        }
    };

    if let Some(values) = initial_data.attribute(key) {
        fold(initial_data.ids(), values, &mut state);
    }
    for delta in deltas {
        if delta.timestamp > timestamp {
            break;
        }
        if let Some(values) = delta.data.attribute(key) {
            fold(delta.data.ids(), values, &mut state);
        }
    }
    state
}

/// One streaming tapefile per tracked attribute, over a shared index.
pub struct Player {
    config: PlayerConfig,
    index: Arc<EntityIndex>,
    initial_data: EntityGroupPayload<f64>,
    tapefiles: Vec<StreamingTapefile<f64>>,
    history: Vec<UpdateDelta<f64>>,
    arrival_seq: u64,
    since_trim: usize,
}

impl Player {
    /// Creates the host, one tapefile per attribute key, all sharing one
    /// identity index built from the initial id array.
    pub fn new(
        keys: &[AttributeKey],
        initial_data: EntityGroupPayload<f64>,
        config: PlayerConfig,
    ) -> Self {
        let index = Arc::new(EntityIndex::new(initial_data.ids()));
        let tapefiles = keys
            .iter()
            .map(|key| {
                StreamingTapefile::initialize(
                    key.clone(),
                    InitializeOptions {
                        index: Some(index.clone()),
                        initial_data: initial_data.clone(),
                    },
                )
            })
            .collect();

        Self {
            config,
            index,
            initial_data,
            tapefiles,
            history: Vec::new(),
            arrival_seq: 0,
            since_trim: 0,
        }
    }

    /// Feeds one arriving delta to every tracked tapefile.
    pub fn ingest(&mut self, delta: UpdateDelta<f64>) -> Result<(), TapefileError> {
        for tapefile in &mut self.tapefiles {
            let outcome = tapefile.add_update(&delta, self.arrival_seq)?;
            trace!(
                attribute = %tapefile.key(),
                iteration = delta.iteration,
                timestamp = delta.timestamp,
                ?outcome,
                "ingested delta"
            );
        }
        self.arrival_seq += 1;
        self.history.push(delta);

        self.since_trim += 1;
        if self.config.trim_interval > 0 && self.since_trim >= self.config.trim_interval {
            self.trim();
        }
        Ok(())
    }

    /// Trims historical rollbacks on every tapefile.
    pub fn trim(&mut self) {
        for tapefile in &mut self.tapefiles {
            tapefile.trim_rollbacks();
        }
        self.since_trim = 0;
        debug!("trimmed rollbacks");
    }

    /// Seeks one attribute's tapefile and copies its state.
    pub fn scrub(
        &mut self,
        key: &AttributeKey,
        timestamp: f64,
    ) -> Result<Vec<Option<f64>>, TapefileError> {
        let tapefile = self.tapefile_mut(key);
        tapefile.move_to(timestamp)?;
        Ok(tapefile.copy_state())
    }

    /// Scrubs to `timestamp` and compares against the brute-force
    /// reference reconstruction.
    pub fn verify(
        &mut self,
        key: &AttributeKey,
        timestamp: f64,
    ) -> Result<bool, TapefileError> {
        let expected = reference_state(
            key,
            &self.initial_data,
            &self.history,
            &self.index,
            timestamp,
        );
        let actual = self.scrub(key, timestamp)?;
        Ok(actual == expected)
    }

    /// Latest timestamp across ingested history.
    pub fn max_time(&self, key: &AttributeKey) -> f64 {
        self.tapefile(key).max_time()
    }

    /// Number of deltas retained for verification.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn tapefile(&self, key: &AttributeKey) -> &StreamingTapefile<f64> {
        self.tapefiles
            .iter()
            .find(|tapefile| tapefile.key() == key)
            .expect("unknown attribute key")
    }

    fn tapefile_mut(&mut self, key: &AttributeKey) -> &mut StreamingTapefile<f64> {
        self.tapefiles
            .iter_mut()
            .find(|tapefile| tapefile.key() == key)
            .expect("unknown attribute key")
    }
}
