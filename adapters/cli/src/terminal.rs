//! Character-cell [`Surface`] used to print frames of a headless match.

use std::fmt::Write as _;

use anyhow::Result as AnyResult;
use glam::Vec2;
use lane_defence_rendering::{palette, Color, Surface};

const EMPTY: char = '.';
const PATH: char = '#';
const TOWER: char = 'T';
const ENEMY: char = 'e';
const PROJECTILE: char = '*';

/// Rasterises drawing calls into one character per board cell.
#[derive(Clone, Debug)]
pub(crate) struct AsciiSurface {
    columns: u32,
    rows: u32,
    cell_size: f32,
    cells: Vec<char>,
    status: String,
}

impl AsciiSurface {
    pub(crate) fn new(columns: u32, rows: u32, cell_size: f32) -> Self {
        Self {
            columns,
            rows,
            cell_size,
            cells: vec![EMPTY; columns as usize * rows as usize],
            status: String::new(),
        }
    }

    /// Board rows followed by the status line.
    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for row in self.cells.chunks(self.columns.max(1) as usize) {
            out.extend(row);
            out.push('\n');
        }
        let _ = write!(out, "{}", self.status);
        out
    }

    fn plot(&mut self, position: Vec2, glyph: char) {
        if position.x < 0.0 || position.y < 0.0 {
            return;
        }
        let column = (position.x / self.cell_size) as u32;
        let row = (position.y / self.cell_size) as u32;
        if column < self.columns && row < self.rows {
            self.cells[(row * self.columns + column) as usize] = glyph;
        }
    }
}

impl Surface for AsciiSurface {
    fn clear(&mut self, _color: Color) -> AnyResult<()> {
        self.cells.fill(EMPTY);
        self.status.clear();
        Ok(())
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) -> AnyResult<()> {
        let glyph = if color == palette::PATH_CELL {
            PATH
        } else if color == palette::HEALTH_MISSING
            || color == palette::HEALTH_REMAINING
            || color == palette::PREVIEW_OK
            || color == palette::PREVIEW_REFUSED
        {
            return Ok(());
        } else {
            TOWER
        };
        self.plot(origin + size * 0.5, glyph);
        Ok(())
    }

    fn fill_circle(&mut self, center: Vec2, _radius: f32, color: Color) -> AnyResult<()> {
        let glyph = if color == palette::PROJECTILE {
            PROJECTILE
        } else {
            ENEMY
        };
        self.plot(center, glyph);
        Ok(())
    }

    fn stroke_circle(
        &mut self,
        _center: Vec2,
        _radius: f32,
        _thickness: f32,
        _color: Color,
    ) -> AnyResult<()> {
        Ok(())
    }

    fn line(&mut self, _from: Vec2, _to: Vec2, _thickness: f32, _color: Color) -> AnyResult<()> {
        Ok(())
    }

    fn text(&mut self, position: Vec2, text: &str, _size: f32, _color: Color) -> AnyResult<()> {
        let mut glyphs = text.chars();
        match (glyphs.next(), glyphs.next()) {
            // Tower level labels are a single digit drawn inside the tower.
            (Some(level), None) => self.plot(position, level),
            _ => self.status = text.to_owned(),
        }
        Ok(())
    }
}
