#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame orchestration for one participant of a Lane Defence room.
//!
//! A [`Session`] owns the local mirror and the systems around it and runs a
//! frame in a fixed order: drain remote snapshots, tick the world, feed the
//! wave director, publish changes, draw. Player actions execute between
//! frames and publish immediately when they succeed.

use std::{mem, sync::Arc, time::Duration};

use anyhow::{Context, Result as AnyResult};
use lane_defence_core::{
    CellCoord, Command, Event, GridLayout, Lane, MatchRules, ParticipantId, ProgressSnapshot,
    RoomId, TowerId, TowerKind, DRIP_SPAWN_INTERVAL,
};
use lane_defence_rendering::{
    draw_frame, palette, to_vec2, FrameInput, GridPresentation, Hud, RenderingError, Scene,
    SceneEnemy, SceneProjectile, SceneTower, Surface, TowerPreview,
};
use lane_defence_system_builder::{Builder, BuilderInput};
use lane_defence_system_reconciler::{Reconciler, SharedStore};
use lane_defence_system_wave_director::{Config as DirectorConfig, WaveDirector};
use lane_defence_world::{self as world, query, World};
use tracing::{debug, info};

/// Parameters identifying the participant and tuning the local systems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Room shared with the other participants.
    pub room: RoomId,
    /// Local participant; owns the towers it builds.
    pub participant: ParticipantId,
    /// Spawn seed. Derived from the room when `None`.
    pub seed: Option<u64>,
    /// Wall-clock time between drip spawns.
    pub drip_interval: Duration,
    /// Whether this participant advances the simulation. A follower only
    /// mirrors remote state and forwards its own actions.
    pub simulate: bool,
}

impl SessionConfig {
    /// Creates a simulating configuration with a room-derived seed.
    #[must_use]
    pub fn new(room: RoomId, participant: ParticipantId) -> Self {
        Self {
            room,
            participant,
            seed: None,
            drip_interval: DRIP_SPAWN_INTERVAL,
            simulate: true,
        }
    }
}

/// Outcome of a single frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Events produced while the frame ran, including those of actions taken
    /// since the previous frame.
    pub events: Vec<Event>,
    /// Snapshots drained from the store.
    pub snapshots: usize,
    /// Whether the frame published a patch.
    pub published: bool,
    /// Wave counter and status at the end of the frame.
    pub progress: ProgressSnapshot,
}

/// One participant's view of a room.
#[derive(Debug)]
pub struct Session<S: SharedStore> {
    world: World,
    builder: Builder,
    director: WaveDirector,
    reconciler: Reconciler,
    store: Arc<S>,
    simulate: bool,
    pending: Vec<Event>,
    hovered: Option<CellCoord>,
    active: bool,
}

impl<S: SharedStore> Session<S> {
    /// Configures a fresh match and subscribes to the room.
    pub fn new(
        config: SessionConfig,
        grid: GridLayout,
        lanes: Vec<Lane>,
        rules: MatchRules,
        store: Arc<S>,
    ) -> Self {
        let director = match config.seed {
            Some(seed) => DirectorConfig::new(seed, config.drip_interval),
            None => {
                let derived = DirectorConfig::from_room(&config.room);
                DirectorConfig::new(derived.rng_seed(), config.drip_interval)
            }
        };
        let reconciler =
            Reconciler::connect(config.room.clone(), config.participant.clone(), &*store);
        info!(
            room = config.room.as_str(),
            participant = config.participant.as_str(),
            simulate = config.simulate,
            "session started"
        );

        let mut session = Self {
            world: World::new(),
            builder: Builder::new(config.participant),
            director: WaveDirector::new(director),
            reconciler,
            store,
            simulate: config.simulate,
            pending: Vec::new(),
            hovered: None,
            active: true,
        };
        let events = session.execute(Command::ConfigureMatch { grid, lanes, rules });
        session.pending.extend(events);
        session
    }

    /// Local mirror of the match.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Reconciler bound to the room.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Builder translating pointer input.
    #[must_use]
    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    /// Reports whether the session still accepts actions and frames.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Builds `kind` on `cell` for the local participant. Returns whether a tower was built.
    pub fn build(&mut self, cell: CellCoord, kind: TowerKind) -> bool {
        let participant = self.builder.participant().clone();
        self.act(
            Command::BuildTower {
                participant,
                kind,
                cell,
            },
            |event| matches!(event, Event::TowerBuilt { .. }),
        )
    }

    /// Upgrades `tower` by one level. Returns whether the upgrade happened.
    pub fn upgrade(&mut self, tower: TowerId) -> bool {
        self.act(Command::UpgradeTower { tower }, |event| {
            matches!(event, Event::TowerUpgraded { .. })
        })
    }

    /// Selects the tower on `cell`, or clears the selection for an empty cell.
    pub fn select(&mut self, cell: CellCoord) -> Option<TowerId> {
        if self.active {
            let events = self.execute(Command::SelectCell { cell });
            self.pending.extend(events);
        }
        query::selected_tower(&self.world).map(|tower| tower.id)
    }

    /// Starts the next wave. Returns whether the wave began.
    pub fn start_wave(&mut self) -> bool {
        if !self.active {
            return false;
        }
        let plan = self
            .director
            .plan_wave(query::progress(&self.world), query::lanes(&self.world));
        let Some(plan) = plan else {
            debug!("no wave can start right now");
            return false;
        };
        self.act(Command::StartWave { plan }, |event| {
            matches!(event, Event::WaveStarted { .. })
        })
    }

    /// Re-initialises the match from its rules.
    pub fn reset(&mut self) {
        if !self.active {
            return;
        }
        self.director.cancel();
        let _ = self.act(Command::ResetGame, |event| matches!(event, Event::GameReset));
    }

    /// Chooses the tower kind placed by subsequent clicks.
    pub fn arm(&mut self, kind: TowerKind) {
        self.builder.arm(kind);
    }

    /// Feeds builder input for the hovered cell and executes the resulting commands.
    pub fn pointer(&mut self, input: BuilderInput) -> Vec<Event> {
        if !self.active {
            return Vec::new();
        }
        self.hovered = input.cursor_cell;

        let preview = input.cursor_cell.map(|cell| {
            self.builder
                .preview_build(cell, |cell, kind| query::build_preview(&self.world, cell, kind))
        });
        let mut commands = Vec::new();
        let world = &self.world;
        self.builder.handle(
            &[],
            preview,
            input,
            |cell| query::tower_at(world, cell),
            &mut commands,
        );

        let mut events = Vec::new();
        for command in commands {
            events.extend(self.execute(command));
        }
        if events
            .iter()
            .any(|event| matches!(event, Event::TowerBuilt { .. } | Event::TowerUpgraded { .. }))
        {
            let _ = self.publish();
        }
        self.pending.extend(events.iter().cloned());
        events
    }

    /// Applies adapter input gathered for the coming frame.
    pub fn input(&mut self, input: &FrameInput) {
        if let Some(kind) = input.arm {
            self.arm(kind);
        }
        if input.start_wave {
            let _ = self.start_wave();
        }
        let cursor_cell = input
            .cursor_world_space
            .and_then(|position| self.grid_presentation().ok()?.cell_at(position));
        let _ = self.pointer(BuilderInput::new(
            input.confirm_action,
            input.upgrade_action,
            cursor_cell,
        ));
    }

    /// Runs one frame without drawing.
    pub fn step(&mut self, dt: Duration) -> FrameReport {
        if !self.active {
            return FrameReport {
                progress: query::progress(&self.world),
                ..FrameReport::default()
            };
        }

        let mut events = mem::take(&mut self.pending);
        let mut remote = Vec::new();
        let snapshots = self.reconciler.drain(&mut remote);
        for command in remote {
            events.extend(self.execute(command));
        }

        if self.simulate {
            events.extend(self.execute(Command::Tick { dt }));
            let mut spawns = Vec::new();
            self.director.handle(
                &events,
                query::progress(&self.world),
                query::lanes(&self.world),
                &mut spawns,
            );
            for command in spawns {
                events.extend(self.execute(command));
            }
        }

        let published = self.publish();
        FrameReport {
            events,
            snapshots,
            published,
            progress: query::progress(&self.world),
        }
    }

    /// Runs one frame and draws the resulting scene onto `surface`.
    pub fn frame<F>(&mut self, dt: Duration, surface: &mut F) -> AnyResult<FrameReport>
    where
        F: Surface + ?Sized,
    {
        let active = self.active;
        let report = self.step(dt);
        if active {
            let scene = self.scene().context("building scene")?;
            draw_frame(surface, &scene).context("drawing frame")?;
        }
        Ok(report)
    }

    /// Describes the current mirror for drawing.
    pub fn scene(&self) -> Result<Scene, RenderingError> {
        let mut scene = Scene::new(self.grid_presentation()?);
        let world = &self.world;
        let selected = query::selected_tower(world).map(|tower| tower.id);
        let clock = query::clock(world);

        scene.path_cells = query::grid(world).path_cells();
        scene.lanes = query::lanes(world)
            .iter()
            .map(|lane| lane.waypoints().iter().copied().map(to_vec2).collect())
            .collect();
        scene.towers = query::towers(world)
            .map(|tower| SceneTower {
                id: tower.id,
                kind: tower.kind,
                cell: tower.cell,
                level: tower.level,
                range: tower.range,
                selected: Some(tower.id) == selected,
            })
            .collect();
        scene.enemies = query::enemies(world)
            .iter()
            .map(|enemy| SceneEnemy {
                id: enemy.id,
                kind: enemy.kind,
                position: to_vec2(enemy.position),
                health_fraction: if enemy.max_health > 0.0 {
                    enemy.health / enemy.max_health
                } else {
                    0.0
                },
            })
            .collect();
        scene.projectiles = query::projectiles(world)
            .iter()
            .map(|projectile| SceneProjectile {
                from: to_vec2(projectile.from),
                to: to_vec2(projectile.to),
                progress: flight_progress(
                    clock.saturating_sub(projectile.spawned_at),
                    projectile.flight,
                ),
            })
            .collect();
        scene.preview = self.hovered.map(|cell| {
            let kind = self.builder.armed();
            TowerPreview {
                kind,
                cell,
                rejection: query::build_preview(world, cell, kind).err(),
            }
        });

        let ledger = query::ledger(world);
        let progress = query::progress(world);
        scene.hud = Hud {
            resources: ledger.resources,
            base_health: ledger.base_health,
            wave: progress.wave,
            status: progress.status,
        };
        Ok(scene)
    }

    /// Cancels the drip timer and drops the subscription. Further actions and
    /// frames are ignored.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.director.cancel();
        self.reconciler.disconnect();
        self.pending.clear();
        info!(room = self.reconciler.room().as_str(), "session shut down");
    }

    fn act<P>(&mut self, command: Command, succeeded: P) -> bool
    where
        P: Fn(&Event) -> bool,
    {
        if !self.active {
            return false;
        }
        let events = self.execute(command);
        let success = events.iter().any(succeeded);
        if success {
            let _ = self.publish();
        }
        self.pending.extend(events);
        success
    }

    fn execute(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        let mut ignored = Vec::new();
        self.builder.handle(
            &events,
            None,
            BuilderInput::default(),
            |_| None,
            &mut ignored,
        );
        events
    }

    fn publish(&mut self) -> bool {
        let state = query::shared_state(&self.world);
        self.reconciler.publish(&state, &*self.store)
    }

    fn grid_presentation(&self) -> Result<GridPresentation, RenderingError> {
        let grid = query::grid(&self.world);
        GridPresentation::new(
            grid.columns(),
            grid.rows(),
            grid.cell_size(),
            palette::GRID_LINE,
        )
    }
}

impl<S: SharedStore> Drop for Session<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn flight_progress(elapsed: Duration, flight: Duration) -> f32 {
    if flight.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / flight.as_secs_f32()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flight_progress_is_clamped() {
        let flight = Duration::from_millis(150);

        assert!((flight_progress(Duration::from_millis(75), flight) - 0.5).abs() < 1e-6);
        assert!((flight_progress(Duration::from_secs(1), flight) - 1.0).abs() < f32::EPSILON);
        assert!((flight_progress(Duration::ZERO, Duration::ZERO) - 1.0).abs() < f32::EPSILON);
    }
}
