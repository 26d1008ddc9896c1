//! Headless match loop driven by the command line.

use std::{collections::BTreeMap, fmt, io::Write, sync::Arc, time::Duration};

use anyhow::{ensure, Context, Result as AnyResult};
use lane_defence_core::{Event, GameStatus, ParticipantId, ProgressSnapshot, RoomId};
use lane_defence_session::{Session, SessionConfig};
use lane_defence_system_reconciler::{InMemoryStore, SharedStore};
use lane_defence_world::query;
use tracing::{info, warn};

use crate::{config::MatchConfig, snapshot_transfer::TransferSnapshot, terminal::AsciiSurface};

/// Parameters of a single headless run.
#[derive(Clone, Debug)]
pub(crate) struct RunOptions {
    pub(crate) room: RoomId,
    pub(crate) participant: ParticipantId,
    /// Overrides the configured spawn seed.
    pub(crate) seed: Option<u64>,
    pub(crate) fps: u32,
    pub(crate) max_frames: u64,
    /// Prints the board every this many frames.
    pub(crate) render_every: Option<u64>,
    /// State loaded into the room before the session joins it.
    pub(crate) import: Option<TransferSnapshot>,
}

/// Counters gathered from the events of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub(crate) waves_started: u32,
    pub(crate) waves_cleared: u32,
    pub(crate) shots: u32,
    pub(crate) kills: u32,
    pub(crate) leaks: u32,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::WaveStarted { .. } => self.waves_started += 1,
                Event::WaveCleared { .. } => self.waves_cleared += 1,
                Event::ProjectileFired { .. } => self.shots += 1,
                Event::EnemyKilled { .. } => self.kills += 1,
                Event::EnemyArrived { .. } => self.leaks += 1,
                _ => {}
            }
        }
    }
}

/// Outcome of a headless run.
#[derive(Clone, Debug)]
pub(crate) struct MatchSummary {
    pub(crate) frames: u64,
    pub(crate) elapsed: Duration,
    pub(crate) progress: ProgressSnapshot,
    pub(crate) resources: u64,
    pub(crate) base_health: u32,
    pub(crate) towers: usize,
    pub(crate) scores: BTreeMap<ParticipantId, u64>,
    pub(crate) tally: Tally,
    /// Final shared state, ready for `--export`.
    pub(crate) snapshot: TransferSnapshot,
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.progress.status {
            GameStatus::Waiting => "waiting",
            GameStatus::InProgress => "in progress",
            GameStatus::GameOverWin => "victory",
            GameStatus::GameOverLoss => "defeat",
        };
        writeln!(
            f,
            "{status} after wave {} ({} frames, {:.1}s simulated)",
            self.progress.wave,
            self.frames,
            self.elapsed.as_secs_f32()
        )?;
        writeln!(
            f,
            "resources {} | base {} | towers {}",
            self.resources, self.base_health, self.towers
        )?;
        write!(
            f,
            "waves started {} | cleared {} | shots {} | kills {} | leaks {}",
            self.tally.waves_started,
            self.tally.waves_cleared,
            self.tally.shots,
            self.tally.kills,
            self.tally.leaks
        )?;
        for (participant, score) in &self.scores {
            write!(f, "\n{}: {score}", participant.as_str())?;
        }
        Ok(())
    }
}

/// Plays a match with an in-process store, starting each wave as soon as the
/// board is waiting, until the match ends or `max_frames` run out.
pub(crate) fn run_match<W>(
    config: &MatchConfig,
    options: RunOptions,
    out: &mut W,
) -> AnyResult<MatchSummary>
where
    W: Write + ?Sized,
{
    ensure!(options.fps > 0, "frame rate must be positive");
    let dt = Duration::from_secs_f64(1.0 / f64::from(options.fps));
    let lanes = config.lanes();
    let grid = config.grid_layout(&lanes);
    let (columns, rows, cell_size) = (grid.columns, grid.rows, grid.cell_size);

    let store = Arc::new(InMemoryStore::new());
    let imported = options.import.is_some();
    if let Some(snapshot) = options.import {
        ensure!(
            (snapshot.columns, snapshot.rows) == (columns, rows),
            "imported snapshot is for a {}x{} board, config describes {columns}x{rows}",
            snapshot.columns,
            snapshot.rows
        );
        store.publish(&options.room, snapshot.into_patch(&options.participant));
    }

    let mut session_config = SessionConfig::new(options.room, options.participant);
    session_config.seed = options.seed.or(config.director.seed);
    session_config.drip_interval = config.drip_interval();
    let mut session = Session::new(session_config, grid, lanes, config.rules(), store);

    if imported {
        let report = session.step(Duration::ZERO);
        info!(snapshots = report.snapshots, "imported snapshot applied");
    } else {
        for tower in &config.towers {
            if !session.build(tower.cell(), tower.kind) {
                warn!(kind = ?tower.kind, cell = ?tower.cell(), "opening tower refused");
            }
        }
    }

    let mut surface = AsciiSurface::new(columns, rows, cell_size);
    let mut tally = Tally::default();
    let mut frames = 0;
    while frames < options.max_frames {
        let progress = query::progress(session.world());
        if progress.status.is_game_over() {
            break;
        }
        if progress.status == GameStatus::Waiting {
            ensure!(
                session.start_wave(),
                "wave {} could not start",
                progress.wave + 1
            );
        }

        let report = match options.render_every {
            Some(every) if every > 0 && frames % every == 0 => {
                let report = session.frame(dt, &mut surface)?;
                writeln!(out, "frame {frames}\n{}\n", surface.render())
                    .context("writing frame")?;
                report
            }
            _ => session.step(dt),
        };
        tally.record(&report.events);
        frames += 1;
    }

    let world = session.world();
    let ledger = query::ledger(world);
    let summary = MatchSummary {
        frames,
        elapsed: query::clock(world),
        progress: query::progress(world),
        resources: ledger.resources,
        base_health: ledger.base_health,
        towers: query::towers(world).count(),
        scores: ledger.scores.clone(),
        tally,
        snapshot: TransferSnapshot {
            columns,
            rows,
            state: query::shared_state(world),
        },
    };
    session.shutdown();
    info!(
        frames = summary.frames,
        wave = summary.progress.wave,
        status = ?summary.progress.status,
        "headless match finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use lane_defence_core::TowerKind;

    use super::*;
    use crate::config::OpeningTower;

    fn options(max_frames: u64) -> RunOptions {
        RunOptions {
            room: RoomId::new("test"),
            participant: ParticipantId::new("host"),
            seed: Some(9),
            fps: 60,
            max_frames,
            render_every: None,
            import: None,
        }
    }

    #[test]
    fn undefended_base_falls() {
        let mut config = MatchConfig::default();
        config.rules.base_health = 3;

        let summary = run_match(&config, options(60 * 60), &mut Vec::new()).expect("run");

        assert_eq!(summary.progress.status, GameStatus::GameOverLoss);
        assert_eq!(summary.base_health, 0);
        assert!(summary.tally.leaks >= 1);
        assert!(summary.frames < 60 * 60);
    }

    #[test]
    fn opening_towers_are_built_and_fire() {
        let mut config = MatchConfig::default();
        config.towers = vec![
            OpeningTower {
                kind: TowerKind::Basic,
                cell: [3, 2],
            },
            OpeningTower {
                kind: TowerKind::Basic,
                cell: [3, 3],
            },
        ];

        let summary = run_match(&config, options(120), &mut Vec::new()).expect("run");

        assert_eq!(summary.towers, 1, "the path cell is refused");
        assert_eq!(summary.tally.waves_started, 1);
        assert!(summary.tally.shots > 0);
        assert_eq!(summary.frames, 120);
    }

    #[test]
    fn render_every_prints_frames() {
        let mut out = Vec::new();
        let mut run = options(4);
        run.render_every = Some(2);

        let _ = run_match(&MatchConfig::default(), run, &mut out).expect("run");

        let printed = String::from_utf8(out).expect("utf8");
        assert!(printed.contains("frame 0\n"));
        assert!(printed.contains("frame 2\n"));
        assert!(!printed.contains("frame 1\n"));
        assert!(printed.contains("wave 1 | in progress | resources 100 | base 20"));
        assert_eq!(printed.lines().filter(|line| line.len() == 12).count(), 16);
    }

    #[test]
    fn exported_state_can_be_resumed() {
        let mut config = MatchConfig::default();
        config.rules.max_waves = Some(1);
        config.towers = vec![OpeningTower {
            kind: TowerKind::Basic,
            cell: [11, 0],
        }];
        let first = run_match(&config, options(10), &mut Vec::new()).expect("first run");
        let encoded = first.snapshot.encode().expect("encode");

        let mut resumed = options(0);
        resumed.import = Some(TransferSnapshot::decode(&encoded).expect("decode"));
        let second = run_match(&config, resumed, &mut Vec::new()).expect("second run");

        assert_eq!(second.snapshot.state, first.snapshot.state);
        assert_eq!(second.towers, 1);
        assert_eq!(second.resources, 75);
    }

    #[test]
    fn mismatched_import_is_refused() {
        let mut run = options(1);
        run.import = Some(TransferSnapshot {
            columns: 3,
            rows: 3,
            state: Default::default(),
        });

        assert!(run_match(&MatchConfig::default(), run, &mut Vec::new()).is_err());
    }
}
