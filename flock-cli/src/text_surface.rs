use anyhow::{bail, Result};
use flock_core::{Surface, Vector2D};

/// Largest grid a terminal frame may use.
pub const MAX_CELLS: usize = 1 << 20;

/// Number of cells in a `columns x rows` grid, or `None` when it overflows
/// or exceeds [`MAX_CELLS`].
pub fn grid_cells(columns: usize, rows: usize) -> Option<usize> {
    columns
        .checked_mul(rows)
        .filter(|&cells| cells <= MAX_CELLS)
}

/// Character grid that stands in for a canvas in the terminal.
///
/// The world rectangle handed to `clear` is scaled onto `columns x rows`
/// cells. A cell holding one boid shows `o`, a crowded cell shows `O`.
pub struct TextSurface {
    columns: usize,
    rows: usize,
    width: f32,
    height: f32,
    cells: Vec<u8>,
}

impl TextSurface {
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        let Some(cells) = grid_cells(columns, rows) else {
            bail!(
                "terminal grid {}x{} exceeds {} cells",
                columns,
                rows,
                MAX_CELLS
            );
        };

        Ok(Self {
            columns,
            rows,
            width: 1.0,
            height: 1.0,
            cells: vec![0; cells],
        })
    }

    fn cell(&self, position: Vector2D) -> Option<usize> {
        if self.columns == 0 || self.rows == 0 || !position.is_finite() {
            return None;
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }

        let column = (position.x / self.width * self.columns as f32).floor();
        let row = (position.y / self.height * self.rows as f32).floor();

        // Boids that just stepped past a bound are wrapped on the next frame;
        // until then they stay in the nearest edge cell. Negative values
        // saturate to 0 in the cast.
        let column = (column as usize).min(self.columns - 1);
        let row = (row as usize).min(self.rows - 1);
        Some(row * self.columns + column)
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|&&count| count > 0).count()
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.rows);
        for row in self.cells.chunks(self.columns.max(1)) {
            for &count in row {
                out.push(match count {
                    0 => ' ',
                    1 => 'o',
                    _ => 'O',
                });
            }
            out.push('\n');
        }
        out
    }
}

impl Surface for TextSurface {
    fn clear(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.cells.iter_mut().for_each(|count| *count = 0);
    }

    fn draw(&mut self, position: Vector2D) {
        if let Some(index) = self.cell(position) {
            self.cells[index] = self.cells[index].saturating_add(1);
        }
    }
}
