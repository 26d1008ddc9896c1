#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Lane Defence adapters.
//!
//! The simulation describes each frame as a [`Scene`]; adapters implement
//! [`Surface`] and let [`draw_frame`] paint the scene with a handful of
//! primitives.

use anyhow::Result as AnyResult;
use glam::Vec2;
use lane_defence_core::{
    BuildError, CellCoord, EnemyId, EnemyKind, GameStatus, TowerId, TowerKind, WorldPoint,
};
use thiserror::Error;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Palette applied by [`draw_frame`].
pub mod palette {
    use super::Color;

    /// Frame background.
    pub const BACKGROUND: Color = Color::from_rgb_u8(0x1b, 0x1f, 0x24);
    /// Grid lines.
    pub const GRID_LINE: Color = Color::from_rgb_u8(0x33, 0x3a, 0x42);
    /// Cells a lane crosses.
    pub const PATH_CELL: Color = Color::from_rgb_u8(0x5a, 0x4a, 0x36);
    /// Lane center lines.
    pub const LANE: Color = Color::from_rgb_u8(0x8a, 0x73, 0x52);
    /// Range ring of the selected tower.
    pub const RANGE_RING: Color = Color::new(1.0, 1.0, 1.0, 0.35);
    /// Missing portion of an enemy health bar.
    pub const HEALTH_MISSING: Color = Color::from_rgb_u8(0xc8, 0x2a, 0x36);
    /// Remaining portion of an enemy health bar.
    pub const HEALTH_REMAINING: Color = Color::from_rgb_u8(0x2f, 0x95, 0x32);
    /// Projectiles in flight.
    pub const PROJECTILE: Color = Color::from_rgb_u8(0xff, 0xc1, 0x07);
    /// Placeable build preview.
    pub const PREVIEW_OK: Color = Color::new(0.2, 0.8, 0.3, 0.4);
    /// Refused build preview.
    pub const PREVIEW_REFUSED: Color = Color::new(0.9, 0.2, 0.2, 0.4);
    /// Labels and status text.
    pub const TEXT: Color = Color::from_rgb_u8(0xee, 0xee, 0xee);
}

/// Input snapshot gathered by adapters before a frame is simulated.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Cursor position expressed in world units.
    pub cursor_world_space: Option<Vec2>,
    /// Whether the adapter detected a click on this frame.
    pub confirm_action: bool,
    /// Whether the adapter detected an upgrade request on this frame.
    pub upgrade_action: bool,
    /// Whether the adapter detected a start-wave request on this frame.
    pub start_wave: bool,
    /// Tower kind the player armed on this frame, if any.
    pub arm: Option<TowerKind>,
}

/// Describes the square-celled board that can be rendered by adapters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPresentation {
    /// Number of columns contained in the grid.
    pub columns: u32,
    /// Number of rows contained in the grid.
    pub rows: u32,
    /// Side length of a single cell expressed in world units.
    pub cell_size: f32,
    /// Color used when drawing grid lines.
    pub line_color: Color,
}

impl GridPresentation {
    /// Creates a new grid descriptor.
    ///
    /// Returns an error when the grid has no cells or the cell size is not a
    /// positive finite number.
    pub fn new(
        columns: u32,
        rows: u32,
        cell_size: f32,
        line_color: Color,
    ) -> Result<Self, RenderingError> {
        if columns == 0 || rows == 0 {
            return Err(RenderingError::EmptyGrid { columns, rows });
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(RenderingError::InvalidCellSize { cell_size });
        }

        Ok(Self {
            columns,
            rows,
            cell_size,
            line_color,
        })
    }

    /// Calculates the total width of the grid.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_size
    }

    /// Calculates the total height of the grid.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_size
    }

    /// Cell containing a world-space position, or `None` outside the grid.
    #[must_use]
    pub fn cell_at(&self, position: Vec2) -> Option<CellCoord> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let column = (position.x / self.cell_size) as u32;
        let row = (position.y / self.cell_size) as u32;
        (column < self.columns && row < self.rows).then(|| CellCoord::new(column, row))
    }

    /// Top-left corner of `cell` in world units.
    #[must_use]
    pub fn cell_origin(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            cell.column() as f32 * self.cell_size,
            cell.row() as f32 * self.cell_size,
        )
    }
}

/// Converts a simulation point into rendering space.
#[must_use]
pub fn to_vec2(point: WorldPoint) -> Vec2 {
    Vec2::new(point.x, point.y)
}

/// Tower as drawn by adapters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTower {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of the tower.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// Upgrade level, starting at 1.
    pub level: u32,
    /// Targeting range in world units.
    pub range: f32,
    /// Whether the local player selected the tower.
    pub selected: bool,
}

/// Enemy as drawn by adapters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneEnemy {
    /// Identifier allocated to the enemy by the world.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Position in world units.
    pub position: Vec2,
    /// Remaining health as a fraction of maximum health.
    pub health_fraction: f32,
}

/// Projectile interpolated between its origin and its aim point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneProjectile {
    /// Muzzle position.
    pub from: Vec2,
    /// Aim point captured when the tower fired.
    pub to: Vec2,
    /// Elapsed share of the flight in `0.0..=1.0`.
    pub progress: f32,
}

impl SceneProjectile {
    /// Current position along the flight.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.from.lerp(self.to, self.progress.clamp(0.0, 1.0))
    }
}

/// Build preview for the hovered cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerPreview {
    /// Kind of tower proposed for construction.
    pub kind: TowerKind,
    /// Hovered cell.
    pub cell: CellCoord,
    /// Reason reported by the world for refusing the build, if any.
    pub rejection: Option<BuildError>,
}

impl TowerPreview {
    /// Indicates whether the preview location is valid for construction.
    #[must_use]
    pub const fn placeable(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Match counters shown above the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Hud {
    /// Shared resources.
    pub resources: u64,
    /// Remaining base health.
    pub base_health: u32,
    /// Current wave number.
    pub wave: u32,
    /// Match status.
    pub status: GameStatus,
}

/// Scene description combining the board and its inhabitants.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Board dimensions.
    pub grid: GridPresentation,
    /// Cells crossed by lanes.
    pub path_cells: Vec<CellCoord>,
    /// Lane polylines in world units.
    pub lanes: Vec<Vec<Vec2>>,
    /// Towers in identifier order.
    pub towers: Vec<SceneTower>,
    /// Live enemies.
    pub enemies: Vec<SceneEnemy>,
    /// Projectiles in flight.
    pub projectiles: Vec<SceneProjectile>,
    /// Build preview for the hovered cell.
    pub preview: Option<TowerPreview>,
    /// Match counters.
    pub hud: Hud,
}

impl Scene {
    /// Creates an empty scene for the provided grid.
    #[must_use]
    pub fn new(grid: GridPresentation) -> Self {
        Self {
            grid,
            path_cells: Vec::new(),
            lanes: Vec::new(),
            towers: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            preview: None,
            hud: Hud::default(),
        }
    }

    /// Tower currently selected by the local player.
    #[must_use]
    pub fn selected_tower(&self) -> Option<&SceneTower> {
        self.towers.iter().find(|tower| tower.selected)
    }
}

/// Drawing primitives an adapter must provide.
pub trait Surface {
    /// Clears the whole frame.
    fn clear(&mut self, color: Color) -> AnyResult<()>;

    /// Fills an axis-aligned rectangle.
    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) -> AnyResult<()>;

    /// Fills a circle.
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> AnyResult<()>;

    /// Outlines a circle.
    fn stroke_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        thickness: f32,
        color: Color,
    ) -> AnyResult<()>;

    /// Draws a straight segment.
    fn line(&mut self, from: Vec2, to: Vec2, thickness: f32, color: Color) -> AnyResult<()>;

    /// Draws a short label anchored at its top-left corner.
    fn text(&mut self, position: Vec2, text: &str, size: f32, color: Color) -> AnyResult<()>;
}

const HEALTH_BAR_HEIGHT: f32 = 4.0;
const ENEMY_RADIUS_SHARE: f32 = 0.3;
const TOWER_SIZE_SHARE: f32 = 0.7;
const PROJECTILE_RADIUS: f32 = 3.0;

/// Paints `scene` onto `surface`.
///
/// Layers are drawn back to front: grid, lanes, towers (range ring on the
/// selected one), build preview, enemies with health bars, projectiles and
/// finally the counters.
pub fn draw_frame<S>(surface: &mut S, scene: &Scene) -> AnyResult<()>
where
    S: Surface + ?Sized,
{
    surface.clear(palette::BACKGROUND)?;
    draw_grid(surface, scene)?;
    draw_lanes(surface, scene)?;
    draw_towers(surface, scene)?;
    draw_preview(surface, scene)?;
    draw_enemies(surface, scene)?;
    draw_projectiles(surface, scene)?;
    draw_hud(surface, scene)
}

fn draw_grid<S: Surface + ?Sized>(surface: &mut S, scene: &Scene) -> AnyResult<()> {
    let grid = &scene.grid;
    let cell = Vec2::splat(grid.cell_size);
    for path in &scene.path_cells {
        surface.fill_rect(grid.cell_origin(*path), cell, palette::PATH_CELL)?;
    }
    for column in 0..=grid.columns {
        let x = column as f32 * grid.cell_size;
        surface.line(
            Vec2::new(x, 0.0),
            Vec2::new(x, grid.height()),
            1.0,
            grid.line_color,
        )?;
    }
    for row in 0..=grid.rows {
        let y = row as f32 * grid.cell_size;
        surface.line(
            Vec2::new(0.0, y),
            Vec2::new(grid.width(), y),
            1.0,
            grid.line_color,
        )?;
    }
    Ok(())
}

fn draw_lanes<S: Surface + ?Sized>(surface: &mut S, scene: &Scene) -> AnyResult<()> {
    for lane in &scene.lanes {
        for pair in lane.windows(2) {
            surface.line(pair[0], pair[1], 2.0, palette::LANE)?;
        }
    }
    Ok(())
}

fn tower_color(kind: TowerKind) -> Color {
    match kind {
        TowerKind::Basic => Color::from_rgb_u8(0x58, 0x8b, 0xd6),
        TowerKind::Fast => Color::from_rgb_u8(0x4f, 0xc3, 0xa1),
        TowerKind::Heavy => Color::from_rgb_u8(0x9c, 0x5c, 0xd4),
    }
}

fn enemy_color(kind: EnemyKind) -> Color {
    match kind {
        EnemyKind::Basic => Color::from_rgb_u8(0xe0, 0x6c, 0x4c),
        EnemyKind::Fast => Color::from_rgb_u8(0xf2, 0xc9, 0x4c),
        EnemyKind::Tank => Color::from_rgb_u8(0x8c, 0x3b, 0x3b),
    }
}

fn draw_towers<S: Surface + ?Sized>(surface: &mut S, scene: &Scene) -> AnyResult<()> {
    let grid = &scene.grid;
    let inset = grid.cell_size * (1.0 - TOWER_SIZE_SHARE) * 0.5;
    let size = Vec2::splat(grid.cell_size * TOWER_SIZE_SHARE);
    for tower in &scene.towers {
        let origin = grid.cell_origin(tower.cell);
        let color = if tower.selected {
            tower_color(tower.kind).lighten(0.3)
        } else {
            tower_color(tower.kind)
        };
        surface.fill_rect(origin + Vec2::splat(inset), size, color)?;
        surface.text(
            origin + Vec2::splat(inset),
            &tower.level.to_string(),
            grid.cell_size * 0.35,
            palette::TEXT,
        )?;
        if tower.selected {
            let center = origin + Vec2::splat(grid.cell_size * 0.5);
            surface.stroke_circle(center, tower.range, 1.0, palette::RANGE_RING)?;
        }
    }
    Ok(())
}

fn draw_preview<S: Surface + ?Sized>(surface: &mut S, scene: &Scene) -> AnyResult<()> {
    let Some(preview) = scene.preview else {
        return Ok(());
    };
    let color = if preview.placeable() {
        palette::PREVIEW_OK
    } else {
        palette::PREVIEW_REFUSED
    };
    surface.fill_rect(
        scene.grid.cell_origin(preview.cell),
        Vec2::splat(scene.grid.cell_size),
        color,
    )
}

fn draw_enemies<S: Surface + ?Sized>(surface: &mut S, scene: &Scene) -> AnyResult<()> {
    let radius = scene.grid.cell_size * ENEMY_RADIUS_SHARE;
    for enemy in &scene.enemies {
        surface.fill_circle(enemy.position, radius, enemy_color(enemy.kind))?;

        let bar_origin = enemy.position - Vec2::new(radius, radius + HEALTH_BAR_HEIGHT * 2.0);
        let bar_width = radius * 2.0;
        surface.fill_rect(
            bar_origin,
            Vec2::new(bar_width, HEALTH_BAR_HEIGHT),
            palette::HEALTH_MISSING,
        )?;
        let remaining = bar_width * enemy.health_fraction.clamp(0.0, 1.0);
        if remaining > 0.0 {
            surface.fill_rect(
                bar_origin,
                Vec2::new(remaining, HEALTH_BAR_HEIGHT),
                palette::HEALTH_REMAINING,
            )?;
        }
    }
    Ok(())
}

fn draw_projectiles<S: Surface + ?Sized>(surface: &mut S, scene: &Scene) -> AnyResult<()> {
    for projectile in &scene.projectiles {
        surface.fill_circle(projectile.position(), PROJECTILE_RADIUS, palette::PROJECTILE)?;
    }
    Ok(())
}

fn draw_hud<S: Surface + ?Sized>(surface: &mut S, scene: &Scene) -> AnyResult<()> {
    let hud = scene.hud;
    let status = match hud.status {
        GameStatus::Waiting => "waiting",
        GameStatus::InProgress => "in progress",
        GameStatus::GameOverWin => "victory",
        GameStatus::GameOverLoss => "defeat",
    };
    let label = format!(
        "wave {} | {} | resources {} | base {}",
        hud.wave, status, hud.resources, hud.base_health
    );
    surface.text(Vec2::new(4.0, 4.0), &label, 14.0, palette::TEXT)
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, Error, PartialEq)]
pub enum RenderingError {
    /// The grid must contain at least one cell.
    #[error("grid must have at least one cell (received {columns}x{rows})")]
    EmptyGrid {
        /// Provided column count.
        columns: u32,
        /// Provided row count.
        rows: u32,
    },
    /// Cell size must be positive to avoid a zero-sized board.
    #[error("cell size must be a positive number (received {cell_size})")]
    InvalidCellSize {
        /// Provided cell size that failed validation.
        cell_size: f32,
    },
}
