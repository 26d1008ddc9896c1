//! Match configuration loaded from TOML.

use std::{fs, path::Path, time::Duration};

use lane_defence_core::{
    CellCoord, GridLayout, Lane, LaneId, MatchRules, TowerKind, WorldPoint, DEFAULT_CELL_SIZE,
    DRIP_SPAWN_INTERVAL,
};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_COLUMNS: u32 = 12;
const DEFAULT_ROWS: u32 = 8;

/// Board, rules and opening layout of a headless match.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MatchConfig {
    /// Cell layout of the board.
    pub(crate) grid: GridConfig,
    /// Lanes enemies walk along, each a list of `[x, y]` waypoints.
    pub(crate) lanes: Vec<LaneConfig>,
    /// Starting ledger values and win condition.
    pub(crate) rules: RulesConfig,
    /// Spawn seed and drip cadence.
    pub(crate) director: DirectorConfig,
    /// Towers built before the first wave.
    pub(crate) towers: Vec<OpeningTower>,
}

/// Dimensions of the board.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GridConfig {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) cell_size: f32,
    /// Cells blocked for construction. Traced from the lanes when omitted.
    pub(crate) path_cells: Option<Vec<[u32; 2]>>,
}

/// Waypoints of one lane.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LaneConfig {
    pub(crate) waypoints: Vec<[f32; 2]>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RulesConfig {
    pub(crate) starting_resources: u64,
    pub(crate) base_health: u32,
    pub(crate) max_waves: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DirectorConfig {
    /// Fixed spawn seed; derived from the room when omitted.
    pub(crate) seed: Option<u64>,
    pub(crate) drip_interval_ms: u64,
}

/// Tower placed by the headless host before the first wave.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct OpeningTower {
    pub(crate) kind: TowerKind,
    pub(crate) cell: [u32; 2],
}

impl OpeningTower {
    pub(crate) fn cell(&self) -> CellCoord {
        CellCoord::new(self.cell[0], self.cell[1])
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            cell_size: DEFAULT_CELL_SIZE,
            path_cells: None,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        let rules = MatchRules::default();
        Self {
            starting_resources: rules.starting_resources,
            base_health: rules.base_health,
            max_waves: rules.max_waves,
        }
    }
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            drip_interval_ms: DRIP_SPAWN_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        let y = 3.5 * DEFAULT_CELL_SIZE;
        let far = DEFAULT_COLUMNS as f32 * DEFAULT_CELL_SIZE - 20.0;
        Self {
            grid: GridConfig::default(),
            lanes: vec![LaneConfig {
                waypoints: vec![[20.0, y], [far, y]],
            }],
            rules: RulesConfig::default(),
            director: DirectorConfig::default(),
            towers: Vec::new(),
        }
    }
}

impl MatchConfig {
    /// Reads and validates a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parses and validates a configuration document.
    pub(crate) fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.columns == 0 || grid.rows == 0 {
            return Err(ConfigError::EmptyGrid {
                columns: grid.columns,
                rows: grid.rows,
            });
        }
        if !grid.cell_size.is_finite() || grid.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize {
                cell_size: grid.cell_size,
            });
        }
        if self.lanes.is_empty() {
            return Err(ConfigError::NoLanes);
        }
        if let Some(index) = self.lanes.iter().position(|lane| lane.waypoints.is_empty()) {
            return Err(ConfigError::EmptyLane { index });
        }
        if self.director.drip_interval_ms == 0 {
            return Err(ConfigError::ZeroDripInterval);
        }
        if self.rules.max_waves == Some(0) {
            return Err(ConfigError::ZeroMaxWaves);
        }
        Ok(())
    }

    /// Lanes with identifiers assigned in declaration order.
    pub(crate) fn lanes(&self) -> Vec<Lane> {
        self.lanes
            .iter()
            .zip(0..)
            .map(|(lane, id)| {
                let waypoints = lane
                    .waypoints
                    .iter()
                    .map(|[x, y]| WorldPoint::new(*x, *y))
                    .collect();
                Lane::new(LaneId::new(id), waypoints)
            })
            .collect()
    }

    pub(crate) fn grid_layout(&self, lanes: &[Lane]) -> GridLayout {
        let grid = &self.grid;
        match &grid.path_cells {
            Some(cells) => GridLayout {
                columns: grid.columns,
                rows: grid.rows,
                cell_size: grid.cell_size,
                path_cells: cells
                    .iter()
                    .map(|[column, row]| CellCoord::new(*column, *row))
                    .collect(),
            },
            None => GridLayout::traced(grid.columns, grid.rows, grid.cell_size, lanes),
        }
    }

    pub(crate) fn rules(&self) -> MatchRules {
        MatchRules {
            starting_resources: self.rules.starting_resources,
            base_health: self.rules.base_health,
            max_waves: self.rules.max_waves,
        }
    }

    pub(crate) fn drip_interval(&self) -> Duration {
        Duration::from_millis(self.director.drip_interval_ms)
    }
}

/// Errors raised while loading a match configuration.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The file could not be read.
    #[error("could not read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid TOML or does not match the schema.
    #[error("could not parse config")]
    Parse(#[from] toml::de::Error),
    /// The grid has no cells.
    #[error("grid must contain at least one cell (got {columns}x{rows})")]
    EmptyGrid { columns: u32, rows: u32 },
    /// The cell size is zero, negative or not finite.
    #[error("cell size must be positive (got {cell_size})")]
    InvalidCellSize { cell_size: f32 },
    #[error("at least one lane is required")]
    NoLanes,
    /// A lane has no waypoints.
    #[error("lane {index} has no waypoints")]
    EmptyLane { index: usize },
    #[error("drip interval must be greater than zero")]
    ZeroDripInterval,
    #[error("max_waves must be at least 1 when set")]
    ZeroMaxWaves,
}
