#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative mirror, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! The records in this crate ([`TowerSnapshot`], [`EnemySnapshot`],
//! [`LedgerSnapshot`], [`ProgressSnapshot`]) double as the schema of the shared
//! game record exchanged with the external store.

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

/// Upper bound applied to a tower's fire rate when upgrading.
pub const FIRE_RATE_CAP: f32 = 5.0;

/// Number of simulation frames per second that enemy speeds are expressed against.
pub const REFERENCE_FRAMES_PER_SECOND: f32 = 60.0;

/// Time a projectile spends in flight before it resolves.
pub const PROJECTILE_FLIGHT: Duration = Duration::from_millis(150);

/// Radius around a projectile's destination within which an enemy is hit.
pub const PROJECTILE_HIT_RADIUS: f32 = 20.0;

/// Wall-clock cadence of the mid-wave drip spawn.
pub const DRIP_SPAWN_INTERVAL: Duration = Duration::from_secs(3);

/// Side length of a grid cell used when no explicit size is configured.
pub const DEFAULT_CELL_SIZE: f32 = 40.0;

/// Lifecycle state of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// No wave is active; players may build and start the next wave.
    #[default]
    Waiting,
    /// Enemies are alive or spawning.
    InProgress,
    /// Every configured wave was cleared.
    GameOverWin,
    /// The base ran out of health.
    GameOverLoss,
}

impl GameStatus {
    /// Reports whether the status is one of the terminal game-over states.
    #[must_use]
    pub const fn is_game_over(self) -> bool {
        matches!(self, Self::GameOverWin | Self::GameOverLoss)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the board and rules, then resets the match.
    ConfigureMatch {
        /// Cell layout of the board.
        grid: GridLayout,
        /// Precomputed lanes enemies walk along.
        lanes: Vec<Lane>,
        /// Starting ledger values and win condition.
        rules: MatchRules,
    },
    /// Advances the simulation clock by the provided wall-clock delta.
    Tick {
        /// Wall-clock time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests construction of a tower on a single cell.
    BuildTower {
        /// Participant paying for and owning the tower.
        participant: ParticipantId,
        /// Type of tower to construct.
        kind: TowerKind,
        /// Cell the tower should occupy.
        cell: CellCoord,
    },
    /// Requests a level upgrade for an existing tower.
    UpgradeTower {
        /// Identifier of the tower to upgrade.
        tower: TowerId,
    },
    /// Selects the tower occupying the provided cell, or clears the selection.
    SelectCell {
        /// Cell the player pointed at.
        cell: CellCoord,
    },
    /// Starts the next wave using a plan prepared by the wave director.
    StartWave {
        /// Enemies to spawn in bulk when the wave begins.
        plan: WavePlan,
    },
    /// Appends a single enemy to the live wave.
    SpawnEnemy {
        /// Description of the enemy to spawn.
        spawn: EnemySpawn,
    },
    /// Replaces shared sub-objects with values received from the external store.
    ApplyRemoteState {
        /// Sub-objects that should overwrite the local mirror.
        patch: SharedPatch,
    },
    /// Re-initialises every entity and the ledger from the configured rules.
    ResetGame,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Wall-clock time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a new board and rule set were installed.
    MatchConfigured,
    /// Confirms that a tower was constructed.
    TowerBuilt {
        /// Identifier assigned to the tower.
        tower: TowerId,
        /// Type of tower that was built.
        kind: TowerKind,
        /// Cell the tower occupies.
        cell: CellCoord,
        /// Participant that owns the tower.
        owner: ParticipantId,
        /// Resources debited for the construction.
        cost: u64,
    },
    /// Reports that a build request was rejected without mutating state.
    BuildRejected {
        /// Type of tower requested.
        kind: TowerKind,
        /// Cell provided in the request.
        cell: CellCoord,
        /// Specific reason the build failed.
        reason: BuildError,
    },
    /// Confirms that a tower gained a level.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached after the upgrade.
        level: u32,
        /// Resources debited for the upgrade.
        cost: u64,
    },
    /// Reports that an upgrade request was rejected without mutating state.
    UpgradeRejected {
        /// Identifier provided in the request.
        tower: TowerId,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Announces that the selected tower changed.
    SelectionChanged {
        /// Newly selected tower, if any.
        tower: Option<TowerId>,
    },
    /// Confirms that a wave started.
    WaveStarted {
        /// Number of the wave that started.
        wave: u32,
        /// Number of enemies spawned in bulk.
        enemies: u32,
    },
    /// Reports that a wave start was rejected.
    WaveStartRejected {
        /// Specific reason the wave could not start.
        reason: WaveStartError,
    },
    /// Confirms that an enemy entered a lane.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Type of enemy that spawned.
        kind: EnemyKind,
        /// Lane the enemy is bound to.
        lane: LaneId,
    },
    /// Reports that an enemy reached the end of its lane.
    EnemyArrived {
        /// Identifier of the enemy that arrived.
        enemy: EnemyId,
    },
    /// Reports the aggregated base-health penalty applied in a tick.
    BaseDamaged {
        /// Health removed from the base.
        amount: u32,
        /// Base health left after the penalty.
        remaining: u32,
    },
    /// Confirms that a tower fired a projectile.
    ProjectileFired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Tower that fired.
        tower: TowerId,
        /// Enemy the tower aimed at.
        target: EnemyId,
    },
    /// Reports that a projectile landed without any enemy inside the hit radius.
    ProjectileMissed {
        /// Identifier of the projectile.
        projectile: ProjectileId,
    },
    /// Reports that a projectile damaged an enemy.
    EnemyHit {
        /// Enemy that took damage.
        enemy: EnemyId,
        /// Projectile that resolved against the enemy.
        projectile: ProjectileId,
        /// Damage applied.
        damage: f32,
        /// Health left after the hit.
        remaining: f32,
    },
    /// Reports that an enemy was destroyed by tower fire.
    EnemyKilled {
        /// Identifier of the destroyed enemy.
        enemy: EnemyId,
        /// Participant credited with the kill.
        owner: ParticipantId,
        /// Reward granted for the kill.
        value: u32,
    },
    /// Reports the aggregated reward credited to the ledger in a tick.
    RewardsGranted {
        /// Resources credited in total.
        resources: u64,
    },
    /// Announces that every enemy of a wave was cleared.
    WaveCleared {
        /// Number of the cleared wave.
        wave: u32,
    },
    /// Announces a match status transition.
    StatusChanged {
        /// Status before the transition.
        from: GameStatus,
        /// Status after the transition.
        to: GameStatus,
    },
    /// Confirms that values from the external store were applied.
    RemoteStateApplied {
        /// Sub-objects that were replaced.
        replaced: SharedFields,
    },
    /// Confirms that the match was reset to its starting state.
    GameReset,
}

/// Flags naming the shared sub-objects touched by a remote update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SharedFields {
    /// Tower collection was replaced.
    pub towers: bool,
    /// Enemy collection was replaced.
    pub enemies: bool,
    /// Ledger was replaced.
    pub ledger: bool,
    /// Wave counter and status were replaced.
    pub progress: bool,
}

/// Reasons a build request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildError {
    /// The match is over, so construction is disabled.
    GameOver,
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The requested cell belongs to a lane.
    PathCell,
    /// Another tower already occupies the cell.
    Occupied,
    /// The ledger cannot cover the tower's cost.
    InsufficientFunds {
        /// Resources the tower costs.
        required: u64,
        /// Resources currently available.
        available: u64,
    },
}

/// Reasons an upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeError {
    /// The match is over, so upgrades are disabled.
    GameOver,
    /// No tower with the provided identifier exists.
    MissingTower,
    /// The ledger cannot cover the upgrade cost.
    InsufficientFunds {
        /// Resources the upgrade costs.
        required: u64,
        /// Resources currently available.
        available: u64,
    },
}

/// Reasons a wave start may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveStartError {
    /// A wave may only start while the match is waiting.
    NotWaiting {
        /// Status observed when the request arrived.
        status: GameStatus,
    },
    /// The plan was prepared for a different wave number.
    WaveMismatch {
        /// Wave number the world expected.
        expected: u32,
        /// Wave number carried by the plan.
        received: u32,
    },
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a precomputed lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneId(u32);

impl LaneId {
    /// Creates a new lane identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque identifier of a chat participant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a participant identifier from the provided value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of the chat room a match belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room identifier from the provided value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Centre of the cell expressed in world pixels.
    #[must_use]
    pub fn center(self, cell_size: f32) -> WorldPoint {
        WorldPoint::new(
            (self.column as f32 + 0.5) * cell_size,
            (self.row as f32 + 0.5) * cell_size,
        )
    }
}

/// Continuous position expressed in world pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl WorldPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other` by `t` in `0.0..=1.0`.
    #[must_use]
    pub fn lerp(self, other: WorldPoint, t: f32) -> WorldPoint {
        let t = t.clamp(0.0, 1.0);
        WorldPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Ordered sequence of waypoints an enemy walks from spawn to base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    id: LaneId,
    waypoints: Vec<WorldPoint>,
}

impl Lane {
    /// Creates a lane from its identifier and waypoints.
    #[must_use]
    pub fn new(id: LaneId, waypoints: Vec<WorldPoint>) -> Self {
        Self { id, waypoints }
    }

    /// Identifier of the lane.
    #[must_use]
    pub const fn id(&self) -> LaneId {
        self.id
    }

    /// Waypoints in walking order.
    #[must_use]
    pub fn waypoints(&self) -> &[WorldPoint] {
        &self.waypoints
    }

    /// Index of the final waypoint, or `None` for a lane without waypoints.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.waypoints.len().checked_sub(1)
    }
}

/// Static description of the board's cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Number of cell columns.
    pub columns: u32,
    /// Number of cell rows.
    pub rows: u32,
    /// Side length of a cell in world pixels.
    pub cell_size: f32,
    /// Cells blocked for construction because a lane crosses them.
    pub path_cells: Vec<CellCoord>,
}

impl GridLayout {
    /// Creates a grid whose path cells are traced from the provided lanes.
    #[must_use]
    pub fn traced(columns: u32, rows: u32, cell_size: f32, lanes: &[Lane]) -> Self {
        Self {
            columns,
            rows,
            cell_size,
            path_cells: trace_lane_cells(lanes, columns, rows, cell_size),
        }
    }
}

/// Enumerates every in-bounds cell crossed by a lane segment.
///
/// Segments are sampled at a quarter of the cell size, which is fine enough to
/// catch every cell an axis-aligned or diagonal segment passes through. The
/// result is sorted and free of duplicates.
#[must_use]
pub fn trace_lane_cells(lanes: &[Lane], columns: u32, rows: u32, cell_size: f32) -> Vec<CellCoord> {
    if cell_size <= 0.0 {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let step = cell_size / 4.0;
    let mut mark = |point: WorldPoint| {
        if point.x < 0.0 || point.y < 0.0 {
            return;
        }
        let column = (point.x / cell_size) as u32;
        let row = (point.y / cell_size) as u32;
        if column < columns && row < rows {
            cells.push(CellCoord::new(column, row));
        }
    };

    for lane in lanes {
        let waypoints = lane.waypoints();
        if let Some(first) = waypoints.first() {
            mark(*first);
        }
        for pair in waypoints.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let length = from.distance(to);
            let samples = (length / step).ceil() as u32;
            for sample in 1..=samples {
                mark(from.lerp(to, sample as f32 / samples as f32));
            }
        }
    }

    cells.sort();
    cells.dedup();
    cells
}

/// Starting ledger values and win condition of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Resources available when the match starts or resets.
    pub starting_resources: u64,
    /// Base health available when the match starts or resets.
    pub base_health: u32,
    /// Clearing this wave wins the match; `None` plays endlessly.
    pub max_waves: Option<u32>,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            starting_resources: 100,
            base_health: 20,
            max_waves: None,
        }
    }
}

/// Types of towers that can be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Balanced tower.
    Basic,
    /// Rapid-fire tower with short range and light damage.
    Fast,
    /// Slow tower with long range and heavy damage.
    Heavy,
}

impl TowerKind {
    /// Every constructible tower kind.
    pub const ALL: [TowerKind; 3] = [Self::Basic, Self::Fast, Self::Heavy];

    /// Resources debited when constructing the tower.
    #[must_use]
    pub const fn cost(self) -> u64 {
        match self {
            Self::Basic => 25,
            Self::Fast => 40,
            Self::Heavy => 75,
        }
    }

    /// Targeting radius measured in cells.
    #[must_use]
    pub const fn range_in_cells(self) -> f32 {
        match self {
            Self::Basic => 3.0,
            Self::Fast => 2.5,
            Self::Heavy => 3.5,
        }
    }

    /// Targeting radius converted into world pixels.
    #[must_use]
    pub fn range(self, cell_size: f32) -> f32 {
        self.range_in_cells() * cell_size
    }

    /// Damage dealt by a level-1 projectile.
    #[must_use]
    pub const fn damage(self) -> f32 {
        match self {
            Self::Basic => 10.0,
            Self::Fast => 5.0,
            Self::Heavy => 30.0,
        }
    }

    /// Shots per second at level 1.
    #[must_use]
    pub const fn fire_rate(self) -> f32 {
        match self {
            Self::Basic => 1.0,
            Self::Fast => 3.0,
            Self::Heavy => 0.5,
        }
    }

    /// Upgrade cost per current level.
    #[must_use]
    pub const fn upgrade_cost(self) -> u64 {
        match self {
            Self::Basic => 20,
            Self::Fast => 30,
            Self::Heavy => 50,
        }
    }
}

/// Types of enemies that walk the lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Standard enemy.
    Basic,
    /// Quick, fragile enemy.
    Fast,
    /// Slow enemy with a large health pool.
    Tank,
}

impl EnemyKind {
    /// Health before wave scaling.
    #[must_use]
    pub const fn base_health(self) -> u32 {
        match self {
            Self::Basic => 50,
            Self::Fast => 30,
            Self::Tank => 150,
        }
    }

    /// Pixels travelled per reference frame (1/60 s).
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Basic => 1.0,
            Self::Fast => 2.0,
            Self::Tank => 0.5,
        }
    }

    /// Reward credited when the enemy is killed.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Basic => 10,
            Self::Fast => 15,
            Self::Tank => 25,
        }
    }

    /// Maximum health of the enemy when spawned during `wave`.
    ///
    /// `floor(base_health * (1 + 0.2 * wave))`, computed in integer tenths so
    /// that results such as `50 * 1.2` land exactly on 60.
    #[must_use]
    pub fn scaled_health(self, wave: u32) -> u32 {
        let tenths = 10 + 2 * u64::from(wave);
        let scaled = u64::from(self.base_health()) * tenths / 10;
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }
}

/// Number of enemies bulk-spawned when `wave` starts.
#[must_use]
pub const fn wave_enemy_count(wave: u32) -> u32 {
    5 + wave * 2
}

/// Description of a single enemy to spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySpawn {
    /// Type of enemy.
    pub kind: EnemyKind,
    /// Lane the enemy walks.
    pub lane: LaneId,
    /// Maximum (and starting) health after wave scaling.
    pub health: u32,
    /// Number of half-cells the spawn point is pushed back along x.
    pub offset_slots: u32,
}

/// Bulk spawn prepared for the start of a wave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlan {
    /// Wave number the plan was prepared for.
    pub wave: u32,
    /// Enemies spawned when the wave starts.
    pub spawns: Vec<EnemySpawn>,
}

/// Record describing a placed tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower.
    pub id: TowerId,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// Type of tower.
    pub kind: TowerKind,
    /// Current level, starting at 1.
    pub level: u32,
    /// Targeting radius in world pixels.
    pub range: f32,
    /// Damage carried by each projectile.
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Simulation time of the last shot; `None` when the tower has not fired.
    pub last_fired_at: Option<Duration>,
    /// Participant that built the tower.
    pub owner: ParticipantId,
}

impl TowerSnapshot {
    /// Minimum time between two consecutive shots; `None` when the rate is
    /// not positive or the interval does not fit a [`Duration`].
    #[must_use]
    pub fn cooldown(&self) -> Option<Duration> {
        if self.fire_rate > 0.0 && self.fire_rate.is_finite() {
            Duration::try_from_secs_f64(1.0 / f64::from(self.fire_rate)).ok()
        } else {
            None
        }
    }

    /// Resources required to upgrade the tower from its current level.
    #[must_use]
    pub fn upgrade_cost(&self) -> u64 {
        self.kind.upgrade_cost() * u64::from(self.level)
    }
}

/// Record describing a live enemy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Identifier allocated to the enemy.
    pub id: EnemyId,
    /// Type of enemy.
    pub kind: EnemyKind,
    /// Remaining health.
    pub health: f32,
    /// Health at spawn time.
    pub max_health: f32,
    /// Pixels travelled per reference frame.
    pub speed: f32,
    /// Current position in world pixels.
    pub position: WorldPoint,
    /// Index of the waypoint most recently reached.
    pub path_index: usize,
    /// Reward granted when killed.
    pub value: u32,
    /// Lane the enemy is bound to.
    pub lane: LaneId,
}

/// Local-only record of a projectile in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier allocated to the projectile.
    pub id: ProjectileId,
    /// Tower that fired.
    pub tower: TowerId,
    /// Participant credited with kills.
    pub owner: ParticipantId,
    /// Tower centre at fire time.
    pub from: WorldPoint,
    /// Target position captured at fire time.
    pub to: WorldPoint,
    /// Simulation time the projectile was fired.
    pub spawned_at: Duration,
    /// Time in flight before the projectile resolves.
    pub flight: Duration,
    /// Damage applied on impact.
    pub damage: f32,
}

/// Economy counters shared by all participants.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Currency available for building and upgrading.
    pub resources: u64,
    /// Remaining base health.
    pub base_health: u32,
    /// Accumulated kill rewards per participant.
    pub scores: BTreeMap<ParticipantId, u64>,
}

/// Wave counter and match status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Number of the most recently started wave.
    pub wave: u32,
    /// Current match status.
    pub status: GameStatus,
}

/// Every field of the mirror that is shared with other participants.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    /// Placed towers ordered by identifier.
    pub towers: Vec<TowerSnapshot>,
    /// Live enemies in store order.
    pub enemies: Vec<EnemySnapshot>,
    /// Economy counters.
    pub ledger: LedgerSnapshot,
    /// Wave counter and status.
    pub progress: ProgressSnapshot,
}

/// Subset of shared sub-objects that overwrite the mirror wholesale.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedPatch {
    /// Replacement tower collection.
    pub towers: Option<Vec<TowerSnapshot>>,
    /// Replacement enemy collection.
    pub enemies: Option<Vec<EnemySnapshot>>,
    /// Replacement ledger.
    pub ledger: Option<LedgerSnapshot>,
    /// Replacement wave counter and status.
    pub progress: Option<ProgressSnapshot>,
}

impl SharedPatch {
    /// Reports whether the patch carries no sub-object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.towers.is_none()
            && self.enemies.is_none()
            && self.ledger.is_none()
            && self.progress.is_none()
    }
}

/// Logical clock stamped on each shared sub-object.
///
/// Versions order first by counter and then by writer, so two participants
/// that publish the same counter concurrently still resolve to a single
/// winner on every client.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Version {
    counter: u64,
    writer: ParticipantId,
}

impl Version {
    /// Creates a version from an explicit counter and writer.
    #[must_use]
    pub fn new(counter: u64, writer: ParticipantId) -> Self {
        Self { counter, writer }
    }

    /// Counter component of the version.
    #[must_use]
    pub const fn counter(&self) -> u64 {
        self.counter
    }

    /// Participant that produced the version.
    #[must_use]
    pub fn writer(&self) -> &ParticipantId {
        &self.writer
    }

    /// Version that follows `self` when published by `writer`.
    #[must_use]
    pub fn successor(&self, writer: &ParticipantId) -> Self {
        Self {
            counter: self.counter.saturating_add(1),
            writer: writer.clone(),
        }
    }
}

/// Value paired with the version it was published under.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Logical clock of the value.
    pub version: Version,
    /// Published value.
    pub value: T,
}

impl<T> Versioned<T> {
    /// Pairs a value with its version.
    #[must_use]
    pub fn new(version: Version, value: T) -> Self {
        Self { version, value }
    }
}

/// Whole-object record pushed by the external store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Versioned tower collection.
    pub towers: Versioned<Vec<TowerSnapshot>>,
    /// Versioned enemy collection.
    pub enemies: Versioned<Vec<EnemySnapshot>>,
    /// Versioned ledger.
    pub ledger: Versioned<LedgerSnapshot>,
    /// Versioned wave counter and status.
    pub progress: Versioned<ProgressSnapshot>,
}

/// Partial write published to the external store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    /// Changed tower collection.
    pub towers: Option<Versioned<Vec<TowerSnapshot>>>,
    /// Changed enemy collection.
    pub enemies: Option<Versioned<Vec<EnemySnapshot>>>,
    /// Changed ledger.
    pub ledger: Option<Versioned<LedgerSnapshot>>,
    /// Changed wave counter and status.
    pub progress: Option<Versioned<ProgressSnapshot>>,
}

impl StatePatch {
    /// Reports whether the patch carries no sub-object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.towers.is_none()
            && self.enemies.is_none()
            && self.ledger.is_none()
            && self.progress.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn scaled_health_matches_wave_formula() {
        assert_eq!(EnemyKind::Basic.scaled_health(1), 60);
        assert_eq!(EnemyKind::Fast.scaled_health(4), 54);
        assert_eq!(EnemyKind::Tank.scaled_health(6), 330);
        for kind in [EnemyKind::Basic, EnemyKind::Fast, EnemyKind::Tank] {
            for wave in 0..20 {
                let tenths = f64::from(kind.base_health() * (10 + 2 * wave));
                let expected = (tenths / 10.0).floor() as u32;
                assert_eq!(kind.scaled_health(wave), expected, "{kind:?} wave {wave}");
            }
        }
    }

    #[test]
    fn wave_enemy_count_grows_by_two() {
        assert_eq!(wave_enemy_count(1), 7);
        assert_eq!(wave_enemy_count(4), 13);
    }

    #[test]
    fn tower_range_scales_with_cell_size() {
        assert!((TowerKind::Basic.range(40.0) - 120.0).abs() < f32::EPSILON);
        assert!((TowerKind::Heavy.range(10.0) - 35.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cooldown_rejects_non_positive_fire_rate() {
        let mut tower = TowerSnapshot {
            id: TowerId::new(0),
            cell: CellCoord::new(0, 0),
            kind: TowerKind::Basic,
            level: 1,
            range: 120.0,
            damage: 10.0,
            fire_rate: 2.0,
            last_fired_at: None,
            owner: ParticipantId::new("ana"),
        };
        assert_eq!(tower.cooldown(), Some(Duration::from_millis(500)));
        tower.fire_rate = 0.0;
        assert_eq!(tower.cooldown(), None);
        tower.fire_rate = 1e-30;
        assert_eq!(tower.cooldown(), None, "interval overflows Duration");
    }

    #[test]
    fn traced_lane_marks_every_crossed_cell() {
        let lane = Lane::new(
            LaneId::new(0),
            vec![WorldPoint::new(0.0, 60.0), WorldPoint::new(200.0, 60.0)],
        );
        let cells = trace_lane_cells(&[lane], 5, 3, 40.0);
        let expected: Vec<_> = (0..5).map(|column| CellCoord::new(column, 1)).collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn versions_order_by_counter_then_writer() {
        let ana = ParticipantId::new("ana");
        let bo = ParticipantId::new("bo");
        let base = Version::default();
        let first = base.successor(&ana);
        let rival = base.successor(&bo);
        assert!(first > base);
        assert!(rival > first);
        assert!(first.successor(&ana) > rival);
    }

    #[test]
    fn game_snapshot_round_trips_through_bincode() {
        let writer = ParticipantId::new("ana");
        let mut ledger = LedgerSnapshot {
            resources: 75,
            base_health: 19,
            scores: BTreeMap::new(),
        };
        let _ = ledger.scores.insert(writer.clone(), 30);
        let snapshot = GameSnapshot {
            ledger: Versioned::new(Version::new(3, writer), ledger),
            ..GameSnapshot::default()
        };
        assert_round_trip(&snapshot);
    }

    #[test]
    fn build_error_round_trips_through_bincode() {
        assert_round_trip(&BuildError::InsufficientFunds {
            required: 25,
            available: 10,
        });
    }
}
