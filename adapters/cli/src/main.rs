#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a headless Lane Defence match.

mod config;
mod headless;
mod snapshot_transfer;
mod terminal;

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result as AnyResult};
use clap::Parser;
use lane_defence_core::{ParticipantId, RoomId};
use tracing_subscriber::EnvFilter;

use crate::{
    config::MatchConfig,
    headless::{run_match, RunOptions},
    snapshot_transfer::TransferSnapshot,
};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "lane-defence", version, about = "Plays a headless Lane Defence match")]
struct Cli {
    /// TOML match configuration; the default 12x8 board is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Room shared with other participants.
    #[arg(long, default_value = "local")]
    room: String,
    /// Name of the local participant.
    #[arg(long, default_value = "host")]
    participant: String,
    /// Spawn seed; overrides the config and the room-derived seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Clearing this wave wins the match.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    waves: Option<u32>,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,
    /// Upper bound on simulated frames.
    #[arg(long, default_value_t = 36_000)]
    max_frames: u64,
    /// Snapshot string produced by `--export` to resume from.
    #[arg(long)]
    import: Option<String>,
    /// Prints a snapshot string of the final state.
    #[arg(long)]
    export: bool,
    /// Prints the board every N frames.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    render_every: Option<u64>,
    /// Raises log verbosity; repeat for more detail. `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> AnyResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => MatchConfig::load(path)
            .with_context(|| format!("loading match config from {}", path.display()))?,
        None => MatchConfig::default(),
    };
    if cli.waves.is_some() {
        config.rules.max_waves = cli.waves;
    }
    config.validate().context("validating match config")?;

    let import = cli
        .import
        .as_deref()
        .map(TransferSnapshot::decode)
        .transpose()
        .context("decoding --import snapshot")?;
    let options = RunOptions {
        room: RoomId::new(cli.room),
        participant: ParticipantId::new(cli.participant),
        seed: cli.seed,
        fps: cli.fps,
        max_frames: cli.max_frames,
        render_every: cli.render_every,
        import,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = run_match(&config, options, &mut out)?;
    writeln!(out, "{summary}")?;
    if cli.export {
        let encoded = summary.snapshot.encode().context("encoding final state")?;
        writeln!(out, "{encoded}")?;
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
