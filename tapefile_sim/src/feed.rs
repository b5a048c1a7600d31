//! Synthetic update feed.
//!
//! Stands in for the upstream engine plus downloader: emits sparse
//! entity-group deltas over a fixed population, deterministically from a
//! seed. Deltas fan out several attributes per update (only one of which a
//! given tapefile reads), occasionally repeat a timestamp across
//! iterations, and inject nulls, so the full ingestion surface gets
//! exercised.

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use tapefile_core::{AttributeKey, EntityGroupPayload, EntityId, UpdateDelta};

/// Configuration for the synthetic feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Population size
    pub num_entities: usize,

    /// Entities touched per delta
    pub touched_per_update: usize,

    /// Probability that a touched entity carries a null value
    pub null_probability: f64,

    /// Probability that an iteration reuses the previous timestamp,
    /// exercising same-timestamp coalescing downstream
    pub repeat_timestamp_probability: f64,

    /// Probability that a delta omits the primary attribute entirely,
    /// exercising the silent no-op path
    pub skip_primary_probability: f64,

    /// Engine time step between distinct timestamps, in seconds
    pub time_step: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_entities: 50,
            touched_per_update: 8,
            null_probability: 0.1,
            repeat_timestamp_probability: 0.2,
            skip_primary_probability: 0.1,
            time_step: 1.0,
        }
    }
}

/// Deterministic generator of entity-group deltas.
pub struct UpdateFeed {
    config: FeedConfig,
    rng: ChaCha8Rng,
    ids: Vec<EntityId>,
    iteration: i64,
    timestamp: f64,
}

impl UpdateFeed {
    /// The attribute the harness tracks and verifies.
    pub fn primary_key() -> AttributeKey {
        AttributeKey::nested("flow", "discharge")
    }

    /// A sibling attribute carried in the same deltas.
    pub fn secondary_key() -> AttributeKey {
        AttributeKey::nested("flow", "velocity")
    }

    /// Creates a feed over entities `1..=num_entities`.
    pub fn new(config: FeedConfig) -> Self {
        let ids = (0..config.num_entities)
            .map(|i| EntityId(i as u64 + 1))
            .collect();
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            ids,
            iteration: 0,
            timestamp: 0.0,
            config,
        }
    }

    /// The full id array of the population.
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Iteration of the most recently emitted delta.
    pub fn iteration(&self) -> i64 {
        self.iteration
    }

    /// Initial entity-group payload: the full id array plus seed values
    /// for both attributes.
    pub fn initial_payload(&mut self) -> EntityGroupPayload<f64> {
        let primary = (0..self.ids.len())
            .map(|_| Some(self.rng.gen_range(0.0..100.0)))
            .collect();
        let secondary = (0..self.ids.len())
            .map(|_| Some(self.rng.gen_range(0.0..10.0)))
            .collect();

        EntityGroupPayload::new(self.ids.clone())
            .with_attribute(Self::primary_key(), primary)
            .with_attribute(Self::secondary_key(), secondary)
    }

    /// Emits the next delta: strictly increasing iteration, non-decreasing
    /// timestamp, random sparse touch set.
    pub fn next_delta(&mut self) -> UpdateDelta<f64> {
        self.iteration += 1;

        let repeat =
            self.iteration > 1 && self.rng.gen_bool(self.config.repeat_timestamp_probability);
        if !repeat {
            self.timestamp += self.config.time_step;
        }

        let touched = self.config.touched_per_update.min(self.ids.len());
        let chosen = sample(&mut self.rng, self.ids.len(), touched);

        let ids: Vec<EntityId> = chosen.iter().map(|i| self.ids[i]).collect();
        let primary: Vec<Option<f64>> = (0..touched)
            .map(|_| {
                if self.rng.gen_bool(self.config.null_probability) {
                    None
                } else {
                    Some(self.rng.gen_range(0.0..100.0))
                }
            })
            .collect();
        let secondary: Vec<Option<f64>> = (0..touched)
            .map(|_| Some(self.rng.gen_range(0.0..10.0)))
            .collect();

        let mut data = EntityGroupPayload::new(ids).with_attribute(Self::secondary_key(), secondary);
        if !self.rng.gen_bool(self.config.skip_primary_probability) {
            data.set_attribute(Self::primary_key(), primary);
        }

        UpdateDelta::new(self.timestamp, self.iteration, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_is_deterministic() {
        let config = FeedConfig {
            seed: 7,
            num_entities: 10,
            ..Default::default()
        };
        let mut feed1 = UpdateFeed::new(config.clone());
        let mut feed2 = UpdateFeed::new(config);

        feed1.initial_payload();
        feed2.initial_payload();

        for _ in 0..20 {
            let delta1 = feed1.next_delta();
            let delta2 = feed2.next_delta();

            assert_eq!(delta1.iteration, delta2.iteration);
            assert_eq!(delta1.timestamp, delta2.timestamp);
            assert_eq!(delta1.data.ids(), delta2.data.ids());
            assert_eq!(
                delta1.data.attribute(&UpdateFeed::primary_key()),
                delta2.data.attribute(&UpdateFeed::primary_key())
            );
        }
    }

    #[test]
    fn test_feed_iterations_strictly_increase() {
        let mut feed = UpdateFeed::new(FeedConfig::default());

        let mut last = feed.iteration();
        for _ in 0..50 {
            let delta = feed.next_delta();
            assert!(delta.iteration > last);
            last = delta.iteration;
        }
    }

    #[test]
    fn test_feed_timestamps_never_decrease() {
        let mut feed = UpdateFeed::new(FeedConfig {
            repeat_timestamp_probability: 0.5,
            ..Default::default()
        });

        let mut last = 0.0;
        for _ in 0..50 {
            let delta = feed.next_delta();
            assert!(delta.timestamp >= last);
            last = delta.timestamp;
        }
    }
}
