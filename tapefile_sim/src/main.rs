//! Tapefile playback CLI
//!
//! Streams a seeded synthetic update feed into live tapefiles, scrubs back
//! and forth while ingestion is still in progress, and verifies every
//! reconstruction against a brute-force reference replay.

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use tapefile_sim::{
    FeedConfig, Player, PlayerConfig, ScrubExport, SnapshotFrame, UpdateFeed,
};

/// Deterministic playback exercise for the tapefile library
#[derive(Parser, Debug)]
#[command(name = "tapefile-sim")]
#[command(about = "Stream, scrub and verify a synthetic tapefile run", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Population size
    #[arg(short, long, default_value = "50")]
    entities: usize,

    /// Number of deltas to stream
    #[arg(short, long, default_value = "200")]
    updates: usize,

    /// Entities touched per delta
    #[arg(short, long, default_value = "8")]
    touched: usize,

    /// Mid-stream scrub-and-verify checks
    #[arg(long, default_value = "40")]
    scrubs: usize,

    /// Trim rollbacks after this many deltas (0 = never)
    #[arg(long, default_value = "16")]
    trim_interval: usize,

    /// Export scrub snapshots to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64
    } else {
        args.seed
    };

    info!("tapefile-sim: seed={seed} entities={} updates={}", args.entities, args.updates);

    let mut feed = UpdateFeed::new(FeedConfig {
        seed,
        num_entities: args.entities,
        touched_per_update: args.touched,
        ..Default::default()
    });
    let initial = feed.initial_payload();

    let key = UpdateFeed::primary_key();
    let mut player = Player::new(
        &[UpdateFeed::primary_key(), UpdateFeed::secondary_key()],
        initial,
        PlayerConfig {
            trim_interval: args.trim_interval,
        },
    );

    // Separate scrub seed so changing the scrub pattern doesn't perturb
    // the feed.
    let mut scrub_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_mul(0x9e3779b97f4a7c15));
    let scrub_every = (args.updates / args.scrubs.max(1)).max(1);

    let mut export = ScrubExport::new(&key.to_string(), seed);
    let mut failures = 0usize;
    let mut checks = 0usize;

    for tick in 0..args.updates {
        let delta = feed.next_delta();
        if let Err(e) = player.ingest(delta) {
            error!("ingestion failed at tick {tick}: {e}");
            std::process::exit(1);
        }

        if tick % scrub_every == 0 {
            // Scrub somewhere in the currently known time range, past or
            // frontier alike.
            let max_time = player.max_time(&key).max(0.0);
            let target = scrub_rng.gen_range(0.0..=max_time.max(f64::MIN_POSITIVE));

            checks += 1;
            match player.verify(&key, target) {
                Ok(true) => debug!("t={target:.2} verified ({} deltas in)", player.history_len()),
                Ok(false) => {
                    error!("t={target:.2} reconstruction mismatch");
                    failures += 1;
                }
                Err(e) => {
                    error!("scrub failed at t={target:.2}: {e}");
                    std::process::exit(1);
                }
            }

            if args.export.is_some() {
                match player.scrub(&key, target) {
                    Ok(values) => export.add_frame(SnapshotFrame {
                        time_sec: target,
                        values,
                    }),
                    Err(e) => error!("export scrub failed: {e}"),
                }
            }
        }
    }

    // Final sweep: forward through the whole history, then all the way back.
    let max_time = player.max_time(&key);
    let mut t = 0.0;
    while t <= max_time {
        checks += 1;
        if !player.verify(&key, t).unwrap_or(false) {
            error!("final sweep mismatch at t={t:.2}");
            failures += 1;
        }
        t += 1.0;
    }
    checks += 1;
    if !player.verify(&key, 0.0).unwrap_or(false) {
        error!("final rewind mismatch at t=0");
        failures += 1;
    }

    let passed = failures == 0;
    if let Some(path) = &args.export {
        export.finalize(passed);
        if let Err(e) = export.write_to_file(path) {
            error!("Failed to write export: {e}");
        } else {
            info!("Exported {} frames to {path}", export.frames.len());
        }
    }

    if passed {
        info!("✅ {checks} scrub checks passed ({} deltas)", player.history_len());
    } else {
        error!("❌ {failures}/{checks} scrub checks failed");
        std::process::exit(1);
    }
}
