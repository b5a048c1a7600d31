//! JSON exporter for scrub snapshots.
//!
//! Writes the frames collected during a playback run so external tooling
//! (charts, notebooks) can inspect reconstructed state over time.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// One reconstructed snapshot at one scrub target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFrame {
    /// Scrub target time in seconds
    pub time_sec: f64,

    /// Reconstructed attribute values in dense-position order
    pub values: Vec<Option<f64>>,
}

/// Complete playback run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrubExport {
    /// Attribute the frames belong to
    pub attribute: String,

    /// Seed used for the synthetic feed
    pub seed: u64,

    /// All collected frames, in scrub order
    pub frames: Vec<SnapshotFrame>,

    /// Whether every frame matched the reference reconstruction
    pub passed: bool,
}

impl ScrubExport {
    /// Creates an empty export container.
    pub fn new(attribute: &str, seed: u64) -> Self {
        Self {
            attribute: attribute.to_string(),
            seed,
            frames: Vec::new(),
            passed: false,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SnapshotFrame) {
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool) {
        self.passed = passed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
