use crate::error::{CodecError, Result};
use crate::tile::{Tile, TILE_SIZE};

/// A rectangular on/off pixel grid made of whole 8x8 tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    /// Cell states in row-major order (top-to-bottom, left-to-right).
    cells: Vec<bool>,
}

impl PixelGrid {
    /// Create an all-off grid.
    ///
    /// Both dimensions must be non-zero multiples of 8.
    pub fn new(width: usize, height: usize) -> Result<PixelGrid> {
        check_dimensions(width, height)?;
        Ok(PixelGrid {
            width,
            height,
            cells: vec![false; width * height],
        })
    }

    /// Create an all-off grid of `tile_cols` by `tile_rows` tiles.
    pub fn with_tiles(tile_cols: usize, tile_rows: usize) -> Result<PixelGrid> {
        match (tile_cols.checked_mul(TILE_SIZE), tile_rows.checked_mul(TILE_SIZE)) {
            (Some(width), Some(height)) => PixelGrid::new(width, height),
            _ => Err(CodecError::dimensions(
                tile_cols.saturating_mul(TILE_SIZE),
                tile_rows.saturating_mul(TILE_SIZE),
                "tile count is too large",
            )),
        }
    }

    /// Create a grid from row-major cells.
    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Result<PixelGrid> {
        check_dimensions(width, height)?;
        if cells.len() != width * height {
            return Err(CodecError::BufferLength {
                expected: width * height,
                actual: cells.len(),
            });
        }
        Ok(PixelGrid {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_cols(&self) -> usize {
        self.width / TILE_SIZE
    }

    pub fn tile_rows(&self) -> usize {
        self.height / TILE_SIZE
    }

    pub fn tile_count(&self) -> usize {
        self.tile_cols() * self.tile_rows()
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Number of cells that are on.
    pub fn lit_count(&self) -> usize {
        self.cells.iter().filter(|&&on| on).count()
    }

    /// Get the cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Result<bool> {
        self.check_cell(row, col)?;
        Ok(self.cells[row * self.width + col])
    }

    /// Set the cell at `(row, col)`.
    pub fn set_cell(&mut self, row: usize, col: usize, on: bool) -> Result<()> {
        self.check_cell(row, col)?;
        self.cells[row * self.width + col] = on;
        Ok(())
    }

    /// Flip the cell at `(row, col)` and return its new state.
    pub fn toggle_cell(&mut self, row: usize, col: usize) -> Result<bool> {
        self.check_cell(row, col)?;
        let cell = &mut self.cells[row * self.width + col];
        *cell = !*cell;
        Ok(*cell)
    }

    /// Turn every cell off.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Copy out the tile at `(tile_row, tile_col)`.
    pub fn tile(&self, tile_row: usize, tile_col: usize) -> Result<Tile> {
        self.check_tile(tile_row, tile_col)?;
        Ok(self.tile_unchecked(tile_row, tile_col))
    }

    /// Overwrite the tile at `(tile_row, tile_col)`.
    pub fn set_tile(&mut self, tile_row: usize, tile_col: usize, tile: &Tile) -> Result<()> {
        self.check_tile(tile_row, tile_col)?;
        for r in 0..TILE_SIZE {
            let start = (tile_row * TILE_SIZE + r) * self.width + tile_col * TILE_SIZE;
            self.cells[start..start + TILE_SIZE].copy_from_slice(&tile.0[r]);
        }
        Ok(())
    }

    /// Iterate over all tiles in scan order (row-major over tiles).
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        crate::layout::scan_order(self.tile_cols(), self.tile_rows())
            .map(move |(tr, tc)| self.tile_unchecked(tr, tc))
    }

    fn tile_unchecked(&self, tile_row: usize, tile_col: usize) -> Tile {
        let mut tile = Tile::BLANK;
        for r in 0..TILE_SIZE {
            let start = (tile_row * TILE_SIZE + r) * self.width + tile_col * TILE_SIZE;
            tile.0[r].copy_from_slice(&self.cells[start..start + TILE_SIZE]);
        }
        tile
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.height || col >= self.width {
            return Err(CodecError::OutOfBounds {
                row,
                col,
                rows: self.height,
                cols: self.width,
            });
        }
        Ok(())
    }

    fn check_tile(&self, tile_row: usize, tile_col: usize) -> Result<()> {
        if tile_row >= self.tile_rows() || tile_col >= self.tile_cols() {
            return Err(CodecError::OutOfBounds {
                row: tile_row,
                col: tile_col,
                rows: self.tile_rows(),
                cols: self.tile_cols(),
            });
        }
        Ok(())
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(CodecError::dimensions(width, height, "grid must not be empty"));
    }
    if width % TILE_SIZE != 0 || height % TILE_SIZE != 0 {
        return Err(CodecError::dimensions(
            width,
            height,
            "width and height must be multiples of 8",
        ));
    }
    if width.checked_mul(height).is_none() {
        return Err(CodecError::dimensions(width, height, "grid is too large"));
    }
    Ok(())
}
