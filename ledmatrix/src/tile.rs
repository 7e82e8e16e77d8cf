//! Packing of a single 8x8 tile into the 8 bytes an LED matrix consumes.
//!
//! Two bit orders are supported, selected by [`Orientation`]:
//!
//! ```text
//! Normal                    Rotated90Ccw
//!   byte r = row r            byte b = column 7-b, read bottom-to-top
//!   MSB    = column 0         LSB    = row 7 (bottom of the column)
//! ```
//!
//! Decoding a `Rotated90Ccw` buffer with `Normal` shows the source pattern
//! turned a quarter turn counter-clockwise, which is what a panel mounted
//! at -90 degrees needs to display the image upright.

use crate::error::{CodecError, Result};

/// Side length of a tile in pixels.
pub const TILE_SIZE: usize = 8;

/// Bytes produced by encoding one tile.
pub const TILE_BYTES: usize = 8;

/// Bit order used when packing a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    /// Row-major, most-significant bit = leftmost column.
    #[default]
    Normal,
    /// Pattern rotated 90 degrees counter-clockwise before packing.
    #[cfg_attr(feature = "serde", serde(alias = "rotated", alias = "rotated90"))]
    Rotated90Ccw,
}

/// An 8x8 block of on/off pixels, indexed `[row][col]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tile(pub [[bool; TILE_SIZE]; TILE_SIZE]);

impl Tile {
    /// A tile with every pixel off.
    pub const BLANK: Tile = Tile([[false; TILE_SIZE]; TILE_SIZE]);

    /// Build a tile from 64 row-major cells.
    pub fn from_cells(cells: &[bool]) -> Result<Tile> {
        if cells.len() != TILE_SIZE * TILE_SIZE {
            return Err(CodecError::InvalidTileSize(cells.len()));
        }
        let mut tile = Tile::BLANK;
        for (i, &on) in cells.iter().enumerate() {
            tile.0[i / TILE_SIZE][i % TILE_SIZE] = on;
        }
        Ok(tile)
    }

    /// Build a tile from a list of rows; every row must hold 8 cells.
    pub fn from_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<Tile> {
        if rows.len() != TILE_SIZE {
            return Err(CodecError::InvalidTileSize(
                rows.iter().map(|r| r.as_ref().len()).sum(),
            ));
        }
        let mut tile = Tile::BLANK;
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != TILE_SIZE {
                return Err(CodecError::InvalidTileSize(
                    rows.iter().map(|r| r.as_ref().len()).sum(),
                ));
            }
            tile.0[r].copy_from_slice(row);
        }
        Ok(tile)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.0[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, on: bool) {
        self.0[row][col] = on;
    }

    /// True when no pixel is on.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|row| row.iter().all(|&on| !on))
    }

    /// Rotate the visual pattern 90 degrees counter-clockwise.
    ///
    /// Pixel `(r, c)` moves to `(7 - c, r)`.
    pub fn rotate_ccw(&self) -> Tile {
        let mut out = Tile::BLANK;
        for r in 0..TILE_SIZE {
            for c in 0..TILE_SIZE {
                out.0[TILE_SIZE - 1 - c][r] = self.0[r][c];
            }
        }
        out
    }

    /// Render each row as a string, `#` for on and `.` for off.
    pub fn rows_as_strings(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|row| row.iter().map(|&on| if on { '#' } else { '.' }).collect())
            .collect()
    }
}

/// Pack one tile into 8 bytes.
pub fn encode(tile: &Tile, mode: Orientation) -> [u8; TILE_BYTES] {
    let mut out = [0u8; TILE_BYTES];
    match mode {
        Orientation::Normal => {
            for (r, byte) in out.iter_mut().enumerate() {
                for c in 0..TILE_SIZE {
                    if tile.0[r][c] {
                        *byte |= 1 << (7 - c);
                    }
                }
            }
        }
        Orientation::Rotated90Ccw => {
            for (b, byte) in out.iter_mut().enumerate() {
                let col = TILE_SIZE - 1 - b;
                for p in 0..TILE_SIZE {
                    if tile.0[TILE_SIZE - 1 - p][col] {
                        *byte |= 1 << p;
                    }
                }
            }
        }
    }
    out
}

/// Unpack 8 bytes into a tile; the exact inverse of [`encode`].
pub fn decode(bytes: &[u8; TILE_BYTES], mode: Orientation) -> Tile {
    let mut tile = Tile::BLANK;
    match mode {
        Orientation::Normal => {
            for (r, &byte) in bytes.iter().enumerate() {
                for c in 0..TILE_SIZE {
                    tile.0[r][c] = (byte >> (7 - c)) & 1 != 0;
                }
            }
        }
        Orientation::Rotated90Ccw => {
            for (b, &byte) in bytes.iter().enumerate() {
                let col = TILE_SIZE - 1 - b;
                for p in 0..TILE_SIZE {
                    tile.0[TILE_SIZE - 1 - p][col] = (byte >> p) & 1 != 0;
                }
            }
        }
    }
    tile
}

/// Encode 64 row-major cells, rejecting any other length.
pub fn encode_cells(cells: &[bool], mode: Orientation) -> Result<[u8; TILE_BYTES]> {
    Tile::from_cells(cells).map(|tile| encode(&tile, mode))
}

/// Decode a byte slice that must be exactly 8 bytes long.
pub fn decode_bytes(bytes: &[u8], mode: Orientation) -> Result<Tile> {
    let bytes: &[u8; TILE_BYTES] = bytes
        .try_into()
        .map_err(|_| CodecError::InvalidTileSize(bytes.len()))?;
    Ok(decode(bytes, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An asymmetric "F" glyph, so every rotation and flip is distinguishable.
    fn glyph_f() -> Tile {
        Tile::from_rows(&[
            [false, true, true, true, true, true, false, false],
            [false, true, false, false, false, false, false, false],
            [false, true, false, false, false, false, false, false],
            [false, true, true, true, true, false, false, false],
            [false, true, false, false, false, false, false, false],
            [false, true, false, false, false, false, false, false],
            [false, true, false, false, false, false, false, false],
            [false, false, false, false, false, false, false, true],
        ])
        .unwrap()
    }

    #[test]
    fn normal_leftmost_column_is_msb() {
        let mut tile = Tile::BLANK;
        tile.set(0, 0, true);
        tile.set(0, 1, true);
        let bytes = encode(&tile, Orientation::Normal);
        assert_eq!(bytes[0], 0b1100_0000);
        assert!(bytes[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn normal_glyph_bytes() {
        let bytes = encode(&glyph_f(), Orientation::Normal);
        assert_eq!(
            bytes,
            [
                0b0111_1100,
                0b0100_0000,
                0b0100_0000,
                0b0111_1000,
                0b0100_0000,
                0b0100_0000,
                0b0100_0000,
                0b0000_0001,
            ]
        );
    }

    #[test]
    fn rotated_bottom_right_pixel_lands_in_first_byte_lsb() {
        // Column 7 is read first, bottom row is bit 0.
        let mut tile = Tile::BLANK;
        tile.set(7, 7, true);
        let bytes = encode(&tile, Orientation::Rotated90Ccw);
        assert_eq!(bytes, [0b0000_0001, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn rotated_top_left_pixel_lands_in_last_byte_msb() {
        let mut tile = Tile::BLANK;
        tile.set(0, 0, true);
        let bytes = encode(&tile, Orientation::Rotated90Ccw);
        assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 0b1000_0000]);
    }

    #[test]
    fn rotated_encoding_shows_ccw_rotation_when_read_normally() {
        let tile = glyph_f();
        let packed = encode(&tile, Orientation::Rotated90Ccw);
        let seen = decode(&packed, Orientation::Normal);

        let mut expected = Tile::BLANK;
        for r in 0..TILE_SIZE {
            for c in 0..TILE_SIZE {
                expected.set(7 - c, r, tile.get(r, c));
            }
        }
        assert_eq!(seen, expected);
        assert_eq!(seen, tile.rotate_ccw());
    }

    #[test]
    fn decode_inverts_encode_in_both_modes() {
        let mut checker = Tile::BLANK;
        for r in 0..TILE_SIZE {
            for c in 0..TILE_SIZE {
                checker.set(r, c, (r + c) % 2 == 0);
            }
        }
        let mut full = Tile::BLANK;
        full.0 = [[true; TILE_SIZE]; TILE_SIZE];

        for tile in [Tile::BLANK, full, checker, glyph_f()] {
            for mode in [Orientation::Normal, Orientation::Rotated90Ccw] {
                assert_eq!(decode(&encode(&tile, mode), mode), tile, "{mode:?}");
            }
        }
    }

    #[test]
    fn decode_inverts_encode_for_every_single_pixel() {
        for i in 0..TILE_SIZE * TILE_SIZE {
            let mut tile = Tile::BLANK;
            tile.set(i / TILE_SIZE, i % TILE_SIZE, true);
            for mode in [Orientation::Normal, Orientation::Rotated90Ccw] {
                let bytes = encode(&tile, mode);
                assert_eq!(bytes.iter().map(|b| b.count_ones()).sum::<u32>(), 1);
                assert_eq!(decode(&bytes, mode), tile);
            }
        }
    }

    #[test]
    fn rotate_ccw_four_times_returns_original() {
        let tile = glyph_f();
        let mut v = tile;
        for _ in 0..4 {
            v = v.rotate_ccw();
        }
        assert_eq!(v, tile);
        assert_ne!(tile.rotate_ccw(), tile);
    }

    #[test]
    fn from_cells_rejects_wrong_length() {
        assert_eq!(
            Tile::from_cells(&[false; 63]),
            Err(CodecError::InvalidTileSize(63))
        );
        assert!(encode_cells(&[true; 64], Orientation::Normal).is_ok());
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let mut rows = vec![vec![false; 8]; 8];
        rows[3].push(true);
        assert_eq!(Tile::from_rows(&rows), Err(CodecError::InvalidTileSize(65)));
        assert!(Tile::from_rows(&vec![vec![false; 8]; 7]).is_err());
    }

    #[test]
    fn decode_bytes_rejects_wrong_length() {
        assert_eq!(
            decode_bytes(&[0u8; 9], Orientation::Normal),
            Err(CodecError::InvalidTileSize(9))
        );
        let tile = decode_bytes(&[0x80, 0, 0, 0, 0, 0, 0, 0], Orientation::Normal).unwrap();
        assert!(tile.get(0, 0));
    }

    #[test]
    fn rows_as_strings_preview() {
        let mut tile = Tile::BLANK;
        assert!(tile.is_blank());
        tile.set(0, 7, true);
        assert!(!tile.is_blank());
        assert_eq!(tile.rows_as_strings()[0], ".......#");
        assert_eq!(tile.rows_as_strings()[1], "........");
    }
}
