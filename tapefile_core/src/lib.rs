//! Tapefile - time-scrubbing reconstruction of entity attributes.
//!
//! A tapefile rebuilds the value of one entity-population attribute at any
//! requested simulation timestamp, given only a sparse, time-ordered stream
//! of partial updates. It supports efficient bidirectional seeking
//! ("scrubbing") and, in the streaming variant, incremental ingestion of
//! new updates while already in use.
//!
//! # Architecture
//!
//! - [`EntityIndex`]: immutable entity-ID → dense-position map, built once
//!   and shareable across every attribute of the same population.
//! - [`PropertyState`]: the materialized value array, mutated in place as
//!   the cursor replays updates forward (apply) and backward (rollback).
//! - [`Update`]: one coalesced sparse delta at one timestamp, carrying the
//!   prior values needed to undo it.
//! - [`TapefileBuilder`]: batch ingestion, finalizing into an immutable
//!   [`SinglePropertyTapefile`].
//! - [`StreamingTapefile`]: the open-for-writes variant, adding lazy
//!   rollback computation, in-place merge version tokens, and trimming of
//!   historical whole-array snapshots.
//!
//! Everything is single-threaded, synchronous, and purely in-memory:
//! fetching updates and rendering reconstructed state belong to external
//! collaborators.

pub mod builder;
pub mod error;
pub mod index;
pub mod payload;
pub mod state;
pub mod streaming;
pub mod tapefile;
pub mod update;

pub use builder::TapefileBuilder;
pub use error::{Result, TapefileError};
pub use index::{EntityId, EntityIndex};
pub use payload::{AttributeKey, EntityGroupPayload, UpdateDelta};
pub use state::PropertyState;
pub use streaming::{InitializeOptions, StreamingTapefile};
pub use tapefile::{IngestOutcome, SinglePropertyTapefile};
pub use update::{Rollback, Update, INITIAL_ITERATION, INITIAL_TIMESTAMP};
