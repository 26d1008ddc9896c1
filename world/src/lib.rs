#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative local mirror of a Lane Defence match.
//!
//! The [`World`] is the single owned copy of the game state on one client.
//! Every mutation flows through [`apply`]; reads go through [`query`].

mod enemies;
mod grid;
mod ledger;
mod projectiles;
mod tick;
mod towers;

use std::time::Duration;

use lane_defence_core::{
    Command, EnemySpawn, Event, GameStatus, GridLayout, Lane, LaneId, MatchRules,
    ProgressSnapshot, SharedFields, SharedPatch, TowerId, WavePlan, WaveStartError, WorldPoint,
    DEFAULT_CELL_SIZE,
};
use tracing::{debug, info};

pub use grid::Grid;

use enemies::EnemyStore;
use ledger::Ledger;
use projectiles::ProjectileQueue;
use towers::TowerRegistry;

const DEFAULT_COLUMNS: u32 = 12;
const DEFAULT_ROWS: u32 = 8;
const DEFAULT_LANE_ROW: u32 = 3;

/// Represents the local mirror of a Lane Defence match.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    lanes: Vec<Lane>,
    rules: MatchRules,
    towers: TowerRegistry,
    enemies: EnemyStore,
    projectiles: ProjectileQueue,
    ledger: Ledger,
    progress: ProgressSnapshot,
    selected: Option<TowerId>,
    clock: Duration,
}

impl World {
    /// Creates a world on the default board: a 12x8 grid crossed by one straight lane.
    #[must_use]
    pub fn new() -> Self {
        let lanes = default_lanes();
        let layout = GridLayout::traced(DEFAULT_COLUMNS, DEFAULT_ROWS, DEFAULT_CELL_SIZE, &lanes);
        let rules = MatchRules::default();
        Self {
            grid: Grid::from_layout(&layout),
            lanes,
            towers: TowerRegistry::new(),
            enemies: EnemyStore::new(),
            projectiles: ProjectileQueue::new(),
            ledger: Ledger::from_rules(&rules),
            progress: ProgressSnapshot::default(),
            selected: None,
            clock: Duration::ZERO,
            rules,
        }
    }

    fn transition(&mut self, to: GameStatus, out: &mut Vec<Event>) {
        let from = self.progress.status;
        if from == to {
            return;
        }
        self.progress.status = to;
        if from == GameStatus::InProgress {
            self.projectiles.clear();
        }
        info!(?from, ?to, wave = self.progress.wave, "match status changed");
        out.push(Event::StatusChanged { from, to });
    }

    fn reset(&mut self, out: &mut Vec<Event>) {
        self.towers.clear();
        self.enemies.clear();
        self.projectiles.clear();
        self.ledger = Ledger::from_rules(&self.rules);
        self.progress.wave = 0;
        self.set_selection(None, out);
        self.transition(GameStatus::Waiting, out);
        out.push(Event::GameReset);
    }

    fn set_selection(&mut self, tower: Option<TowerId>, out: &mut Vec<Event>) {
        if self.selected != tower {
            self.selected = tower;
            out.push(Event::SelectionChanged { tower });
        }
    }

    fn spawn_enemy(&mut self, spawn: EnemySpawn, out: &mut Vec<Event>) -> bool {
        let Some(lane) = self.lanes.iter().find(|lane| lane.id() == spawn.lane) else {
            debug!(lane = spawn.lane.get(), "spawn references an unknown lane");
            return false;
        };
        let Some(origin) = lane.waypoints().first().copied() else {
            debug!(lane = spawn.lane.get(), "spawn references an empty lane");
            return false;
        };

        let offset = spawn.offset_slots as f32 * self.grid.cell_size() * 0.5;
        let position = WorldPoint::new(origin.x - offset, origin.y);
        let enemy = self.enemies.spawn(spawn, position);
        out.push(Event::EnemySpawned {
            enemy,
            kind: spawn.kind,
            lane: spawn.lane,
        });
        true
    }

    fn start_wave(&mut self, plan: WavePlan, out: &mut Vec<Event>) {
        let status = self.progress.status;
        if status != GameStatus::Waiting {
            debug!(?status, "wave start rejected");
            out.push(Event::WaveStartRejected {
                reason: WaveStartError::NotWaiting { status },
            });
            return;
        }
        let expected = self.progress.wave.saturating_add(1);
        if plan.wave != expected {
            debug!(expected, received = plan.wave, "wave plan is out of date");
            out.push(Event::WaveStartRejected {
                reason: WaveStartError::WaveMismatch {
                    expected,
                    received: plan.wave,
                },
            });
            return;
        }

        self.progress.wave = plan.wave;
        self.transition(GameStatus::InProgress, out);
        let mut spawned = 0;
        for spawn in plan.spawns {
            if self.spawn_enemy(spawn, out) {
                spawned += 1;
            }
        }
        info!(wave = plan.wave, enemies = spawned, "wave started");
        out.push(Event::WaveStarted {
            wave: plan.wave,
            enemies: spawned,
        });
    }

    fn apply_remote(&mut self, patch: SharedPatch, out: &mut Vec<Event>) {
        let mut replaced = SharedFields::default();
        if let Some(towers) = patch.towers {
            let grid = &self.grid;
            let dropped = self
                .towers
                .replace_all(towers, |cell| grid.contains(cell) && !grid.is_path(cell));
            if dropped > 0 {
                debug!(dropped, "remote towers dropped from unbuildable or shared cells");
            }
            if let Some(selected) = self.selected {
                if self.towers.get(selected).is_none() {
                    self.set_selection(None, out);
                }
            }
            replaced.towers = true;
        }
        if let Some(enemies) = patch.enemies {
            self.enemies.replace_all(enemies);
            replaced.enemies = true;
        }
        if let Some(ledger) = patch.ledger {
            self.ledger.replace(ledger);
            replaced.ledger = true;
        }
        if let Some(progress) = patch.progress {
            self.progress.wave = progress.wave;
            self.transition(progress.status, out);
            replaced.progress = true;
        }
        out.push(Event::RemoteStateApplied { replaced });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureMatch { grid, lanes, rules } => {
            world.grid = Grid::from_layout(&grid);
            world.lanes = lanes;
            world.rules = rules;
            world.reset(out_events);
            out_events.push(Event::MatchConfigured);
        }
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
            tick::run(world, dt, out_events);
        }
        Command::BuildTower {
            participant,
            kind,
            cell,
        } => match query::build_preview(world, cell, kind) {
            Ok(cost) => {
                if world.ledger.try_debit(cost) {
                    let tower =
                        world
                            .towers
                            .insert(kind, cell, participant.clone(), world.grid.cell_size());
                    out_events.push(Event::TowerBuilt {
                        tower,
                        kind,
                        cell,
                        owner: participant,
                        cost,
                    });
                }
            }
            Err(reason) => {
                debug!(?kind, ?cell, ?reason, "build rejected");
                out_events.push(Event::BuildRejected { kind, cell, reason });
            }
        },
        Command::UpgradeTower { tower } => match query::upgrade_preview(world, tower) {
            Ok(cost) => {
                if let Some(state) = world.towers.get_mut(tower) {
                    if world.ledger.try_debit(cost) {
                        towers::upgrade(state);
                        out_events.push(Event::TowerUpgraded {
                            tower,
                            level: state.level,
                            cost,
                        });
                    }
                }
            }
            Err(reason) => {
                debug!(tower = tower.get(), ?reason, "upgrade rejected");
                out_events.push(Event::UpgradeRejected { tower, reason });
            }
        },
        Command::SelectCell { cell } => {
            let tower = world.towers.at(cell);
            world.set_selection(tower, out_events);
        }
        Command::StartWave { plan } => world.start_wave(plan, out_events),
        Command::SpawnEnemy { spawn } => {
            if world.progress.status == GameStatus::InProgress {
                let _ = world.spawn_enemy(spawn, out_events);
            } else {
                debug!("drip spawn ignored outside of an active wave");
            }
        }
        Command::ApplyRemoteState { patch } => world.apply_remote(patch, out_events),
        Command::ResetGame => world.reset(out_events),
    }
}

fn default_lanes() -> Vec<Lane> {
    let y = (DEFAULT_LANE_ROW as f32 + 0.5) * DEFAULT_CELL_SIZE;
    let start = WorldPoint::new(0.5 * DEFAULT_CELL_SIZE, y);
    let end = WorldPoint::new((DEFAULT_COLUMNS as f32 - 0.5) * DEFAULT_CELL_SIZE, y);
    vec![Lane::new(LaneId::new(0), vec![start, end])]
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{Grid, World};
    use lane_defence_core::{
        BuildError, CellCoord, EnemySnapshot, Lane, LedgerSnapshot, MatchRules,
        ProgressSnapshot, ProjectileSnapshot, SharedState, TowerId, TowerKind, TowerSnapshot,
        UpgradeError,
    };

    /// Provides read-only access to the board.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Lanes enemies walk along.
    #[must_use]
    pub fn lanes(world: &World) -> &[Lane] {
        &world.lanes
    }

    /// Rules the match was configured with.
    #[must_use]
    pub fn rules(world: &World) -> MatchRules {
        world.rules
    }

    /// Total wall-clock time delivered through ticks.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Towers in identifier order.
    pub fn towers(world: &World) -> impl Iterator<Item = &TowerSnapshot> {
        world.towers.iter()
    }

    /// Looks up a tower by identifier.
    #[must_use]
    pub fn tower(world: &World, tower: TowerId) -> Option<&TowerSnapshot> {
        world.towers.get(tower)
    }

    /// Identifier of the tower occupying `cell`, if any.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world.towers.at(cell)
    }

    /// Live enemies in store order.
    #[must_use]
    pub fn enemies(world: &World) -> &[EnemySnapshot] {
        world.enemies.as_slice()
    }

    /// Projectiles currently in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> &[ProjectileSnapshot] {
        world.projectiles.as_slice()
    }

    /// Economy counters.
    #[must_use]
    pub fn ledger(world: &World) -> &LedgerSnapshot {
        world.ledger.snapshot()
    }

    /// Wave counter and match status.
    #[must_use]
    pub fn progress(world: &World) -> ProgressSnapshot {
        world.progress
    }

    /// Tower currently selected by the local player.
    #[must_use]
    pub fn selected_tower(world: &World) -> Option<&TowerSnapshot> {
        world.selected.and_then(|tower| world.towers.get(tower))
    }

    /// Checks whether `kind` could be built on `cell` right now.
    ///
    /// Returns the cost that would be debited on success.
    pub fn build_preview(world: &World, cell: CellCoord, kind: TowerKind) -> Result<u64, BuildError> {
        if world.progress.status.is_game_over() {
            return Err(BuildError::GameOver);
        }
        if !world.grid.contains(cell) {
            return Err(BuildError::OutOfBounds);
        }
        if world.grid.is_path(cell) {
            return Err(BuildError::PathCell);
        }
        if world.towers.at(cell).is_some() {
            return Err(BuildError::Occupied);
        }
        let cost = kind.cost();
        let available = world.ledger.resources();
        if available < cost {
            return Err(BuildError::InsufficientFunds {
                required: cost,
                available,
            });
        }
        Ok(cost)
    }

    /// Checks whether `tower` could be upgraded right now.
    ///
    /// Returns the cost that would be debited on success.
    pub fn upgrade_preview(world: &World, tower: TowerId) -> Result<u64, UpgradeError> {
        if world.progress.status.is_game_over() {
            return Err(UpgradeError::GameOver);
        }
        let state = world.towers.get(tower).ok_or(UpgradeError::MissingTower)?;
        let cost = state.upgrade_cost();
        let available = world.ledger.resources();
        if available < cost {
            return Err(UpgradeError::InsufficientFunds {
                required: cost,
                available,
            });
        }
        Ok(cost)
    }

    /// Captures every shared field of the mirror.
    #[must_use]
    pub fn shared_state(world: &World) -> SharedState {
        SharedState {
            towers: world.towers.iter().cloned().collect(),
            enemies: world.enemies.as_slice().to_vec(),
            ledger: world.ledger.snapshot().clone(),
            progress: world.progress,
        }
    }
}
