//! Tapefile playback harness.
//!
//! This crate is the deterministic host-side environment for
//! `tapefile_core`: a seeded synthetic update feed stands in for the
//! upstream engine and downloader, a Player drives ingestion, scrubbing
//! and rollback trimming from one logical loop, and every reconstruction
//! can be checked against a brute-force reference replay.
//!
//! # Usage
//!
//! ```ignore
//! use tapefile_sim::{FeedConfig, UpdateFeed, Player, PlayerConfig};
//!
//! let mut feed = UpdateFeed::new(FeedConfig { seed: 42, ..Default::default() });
//! let initial = feed.initial_payload();
//! let mut player = Player::new(&[UpdateFeed::primary_key()], initial, PlayerConfig::default());
//!
//! player.ingest(feed.next_delta())?;
//! let state = player.scrub(&UpdateFeed::primary_key(), 1.0)?;
//! ```

mod exporter;
mod feed;
mod player;

pub use exporter::{ScrubExport, SnapshotFrame};
pub use feed::{FeedConfig, UpdateFeed};
pub use player::{reference_state, Player, PlayerConfig};
