//! Static board description: buildable cells and lane-blocked cells.

use lane_defence_core::{CellCoord, GridLayout};

/// Dense cell mask describing which cells belong to a lane.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cell_size: f32,
    path: Vec<bool>,
}

impl Grid {
    pub(crate) fn from_layout(layout: &GridLayout) -> Self {
        let capacity_u64 = u64::from(layout.columns) * u64::from(layout.rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        let mut grid = Self {
            columns: layout.columns,
            rows: layout.rows,
            cell_size: layout.cell_size,
            path: vec![false; capacity],
        };
        for cell in &layout.path_cells {
            if let Some(index) = grid.index(*cell) {
                grid.path[index] = true;
            }
        }
        grid
    }

    /// Number of cell columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cell rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a cell in world pixels.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Reports whether a lane crosses the cell. Out-of-bounds cells are not path cells.
    #[must_use]
    pub fn is_path(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.path.get(index).copied())
            .unwrap_or(false)
    }

    /// Every path cell in row-major order.
    #[must_use]
    pub fn path_cells(&self) -> Vec<CellCoord> {
        let mut cells = Vec::new();
        for row in 0..self.rows {
            for column in 0..self.columns {
                let cell = CellCoord::new(column, row);
                if self.is_path(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Converts the mask back into its layout description.
    #[must_use]
    pub fn layout(&self) -> GridLayout {
        GridLayout {
            columns: self.columns,
            rows: self.rows,
            cell_size: self.cell_size,
            path_cells: self.path_cells(),
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
