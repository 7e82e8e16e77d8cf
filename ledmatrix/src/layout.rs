//! Ordering of tiles into packed buffers and onto physical matrices.
//!
//! Tiles are always visited in *scan order*: tile rows top-to-bottom, and
//! within a row tiles left-to-right. A flat [`PackedBuffer`] holds one
//! 8-byte group per tile in that order.
//!
//! When each tile drives its own matrix, an [`AddressMap`] assigns every
//! scan-order index a [`PhysicalAddress`]. The wiring convention differs
//! between deployments (some boards give the rightmost matrix the lowest
//! address), so it is always supplied by the caller:
//!
//! ```text
//! visual:            [ A ][ B ][ C ]
//! LeftToRight, 0x70:  0x70 0x71 0x72
//! RightToLeft, 0x70:  0x72 0x71 0x70
//! ```

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::{CodecError, Result};
use crate::grid::PixelGrid;
use crate::tile::{self, Orientation, Tile, TILE_BYTES};

/// Iterate `(tile_row, tile_col)` pairs in scan order.
pub fn scan_order(tile_cols: usize, tile_rows: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..tile_rows).flat_map(move |tr| (0..tile_cols).map(move |tc| (tr, tc)))
}

/// Address of one matrix: a unit address on one transport bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalAddress {
    pub bus: u8,
    pub unit: u16,
}

impl PhysicalAddress {
    pub const fn new(bus: u8, unit: u16) -> Self {
        Self { bus, unit }
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus {} unit {:#04x}", self.bus, self.unit)
    }
}

/// Direction in which unit addresses increase across a row of matrices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AddressOrder {
    /// Leftmost tile gets the lowest address.
    #[default]
    LeftToRight,
    /// Rightmost tile gets the lowest address.
    RightToLeft,
}

/// One bus worth of matrices: which scan-order tiles it carries and the
/// unit address of each, in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusGroup {
    pub bus: u8,
    pub tiles: Vec<usize>,
    pub units: Vec<u16>,
}

/// Mapping from scan-order tile index to physical address.
///
/// Entries may be missing; [`pack`] reports the first gap. Two tiles never
/// share an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMap {
    slots: Vec<Option<PhysicalAddress>>,
}

impl AddressMap {
    /// Tile `i` on bus 0, unit `i`.
    pub fn identity(tile_count: usize) -> Result<AddressMap> {
        AddressMap::contiguous(tile_count, 0, AddressOrder::LeftToRight)
    }

    /// Tile `i` on bus 0, unit `tile_count - 1 - i`.
    pub fn reversed(tile_count: usize) -> Result<AddressMap> {
        AddressMap::contiguous(tile_count, 0, AddressOrder::RightToLeft)
    }

    /// Consecutive unit addresses starting at `base` on bus 0.
    ///
    /// Fails if any address would pass `u16::MAX`.
    pub fn contiguous(tile_count: usize, base: u16, order: AddressOrder) -> Result<AddressMap> {
        AddressMap::from_units(0, &contiguous_units(tile_count, base, order)?)
    }

    /// Explicit unit address per tile, all on one bus.
    pub fn from_units(bus: u8, units: &[u16]) -> Result<AddressMap> {
        AddressMap::from_entries(
            units.len(),
            units
                .iter()
                .enumerate()
                .map(|(i, &unit)| (i, PhysicalAddress::new(bus, unit))),
        )
    }

    /// Build a map over `tile_count` tiles from explicit `(tile, address)` pairs.
    pub fn from_entries<I>(tile_count: usize, entries: I) -> Result<AddressMap>
    where
        I: IntoIterator<Item = (usize, PhysicalAddress)>,
    {
        let mut map = AddressMap {
            slots: vec![None; tile_count],
        };
        for (tile, address) in entries {
            if tile >= tile_count {
                return Err(CodecError::InvalidPartition(format!(
                    "tile {tile} is outside a {tile_count}-tile layout"
                )));
            }
            if map.slots[tile].is_some() {
                return Err(CodecError::InvalidPartition(format!(
                    "tile {tile} is assigned more than once"
                )));
            }
            map.slots[tile] = Some(address);
        }
        map.check_unique()?;
        Ok(map)
    }

    /// Combine independent per-bus mappings.
    pub fn partitioned(tile_count: usize, groups: &[BusGroup]) -> Result<AddressMap> {
        for group in groups {
            if group.tiles.len() != group.units.len() {
                return Err(CodecError::InvalidPartition(format!(
                    "bus {} lists {} tiles but {} addresses",
                    group.bus,
                    group.tiles.len(),
                    group.units.len()
                )));
            }
        }
        AddressMap::from_entries(
            tile_count,
            groups.iter().flat_map(|g| {
                g.tiles
                    .iter()
                    .zip(&g.units)
                    .map(|(&tile, &unit)| (tile, PhysicalAddress::new(g.bus, unit)))
            }),
        )
    }

    /// Split the scan order into `groups` equal contiguous runs, one per bus
    /// (`0..groups`), each addressed from `base` in `order`.
    pub fn split_even(
        tile_count: usize,
        groups: usize,
        base: u16,
        order: AddressOrder,
    ) -> Result<AddressMap> {
        let runs = even_runs(tile_count, groups)?;
        let groups = runs
            .into_iter()
            .enumerate()
            .map(|(bus, tiles)| {
                let bus = u8::try_from(bus).map_err(|_| {
                    CodecError::InvalidPartition(format!("bus {bus} is above the last bus 255"))
                })?;
                Ok(BusGroup {
                    bus,
                    units: contiguous_units(tiles.len(), base, order)?,
                    tiles,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AddressMap::partitioned(tile_count, &groups)
    }

    /// Number of scan-order slots (mapped or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Address of scan-order tile `tile`, if mapped.
    pub fn get(&self, tile: usize) -> Option<PhysicalAddress> {
        self.slots.get(tile).copied().flatten()
    }

    /// Mapped `(tile, address)` pairs in scan order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, PhysicalAddress)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.map(|a| (i, a)))
    }

    fn check_unique(&self) -> Result<()> {
        let mut seen: BTreeMap<PhysicalAddress, usize> = BTreeMap::new();
        for (tile, address) in self.entries() {
            if let Some(&first) = seen.get(&address) {
                return Err(CodecError::DuplicateAddress {
                    address,
                    first,
                    second: tile,
                });
            }
            seen.insert(address, tile);
        }
        Ok(())
    }
}

/// `count` consecutive units from `base`, listed in scan order.
pub(crate) fn contiguous_units(count: usize, base: u16, order: AddressOrder) -> Result<Vec<u16>> {
    (0..count)
        .map(|i| {
            let offset = match order {
                AddressOrder::LeftToRight => i,
                AddressOrder::RightToLeft => count - 1 - i,
            };
            u16::try_from(offset)
                .ok()
                .and_then(|offset| base.checked_add(offset))
                .ok_or_else(|| {
                    CodecError::InvalidPartition(format!(
                        "{count} units from {base:#04x} run past address {:#06x}",
                        u16::MAX
                    ))
                })
        })
        .collect()
}

/// Split `0..tile_count` into `groups` equal contiguous runs.
pub fn even_runs(tile_count: usize, groups: usize) -> Result<Vec<Vec<usize>>> {
    if groups == 0 || tile_count % groups != 0 {
        return Err(CodecError::InvalidPartition(format!(
            "{tile_count} tiles cannot be split into {groups} equal groups"
        )));
    }
    let per = tile_count / groups;
    Ok((0..groups)
        .map(|g| (g * per..(g + 1) * per).collect())
        .collect())
}

/// Flat scan-order byte buffer, 8 bytes per tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedBuffer {
    bytes: Vec<u8>,
}

impl PackedBuffer {
    pub fn tile_count(&self) -> usize {
        self.bytes.len() / TILE_BYTES
    }

    /// The 8-byte group of scan-order tile `index`.
    pub fn tile(&self, index: usize) -> Option<&[u8; TILE_BYTES]> {
        self.bytes
            .chunks_exact(TILE_BYTES)
            .nth(index)
            .map(|chunk| chunk.try_into().expect("chunks_exact yields 8-byte chunks"))
    }

    pub fn chunks(&self) -> impl Iterator<Item = &[u8; TILE_BYTES]> {
        self.bytes
            .chunks_exact(TILE_BYTES)
            .map(|chunk| chunk.try_into().expect("chunks_exact yields 8-byte chunks"))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl TryFrom<Vec<u8>> for PackedBuffer {
    type Error = CodecError;

    fn try_from(bytes: Vec<u8>) -> Result<PackedBuffer> {
        if bytes.len() % TILE_BYTES != 0 {
            return Err(CodecError::InvalidTileSize(bytes.len()));
        }
        Ok(PackedBuffer { bytes })
    }
}

impl AsRef<[u8]> for PackedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encode every tile of `grid` in scan order.
fn encode_tiles(grid: &PixelGrid, mode: Orientation) -> Vec<[u8; TILE_BYTES]> {
    let tiles: Vec<Tile> = grid.tiles().collect();

    #[cfg(feature = "parallel")]
    {
        tiles.par_iter().map(|t| tile::encode(t, mode)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        tiles.iter().map(|t| tile::encode(t, mode)).collect()
    }
}

/// Encode `grid` into a flat scan-order buffer.
pub fn to_buffer(grid: &PixelGrid, mode: Orientation) -> PackedBuffer {
    PackedBuffer {
        bytes: encode_tiles(grid, mode).concat(),
    }
}

/// Encode every tile and place it at its mapped physical address.
///
/// Fails before producing any output if a scan-order tile has no address.
pub fn pack(
    grid: &PixelGrid,
    mode: Orientation,
    map: &AddressMap,
) -> Result<BTreeMap<PhysicalAddress, [u8; TILE_BYTES]>> {
    let addresses = (0..grid.tile_count())
        .map(|tile| map.get(tile).ok_or(CodecError::AddressMapIncomplete { tile }))
        .collect::<Result<Vec<_>>>()?;

    Ok(addresses
        .into_iter()
        .zip(encode_tiles(grid, mode))
        .collect())
}

/// Rebuild a grid from a scan-order buffer of `tile_cols * tile_rows` tiles.
pub fn unpack(
    buffer: &[u8],
    tile_cols: usize,
    tile_rows: usize,
    mode: Orientation,
) -> Result<PixelGrid> {
    let mut grid = PixelGrid::with_tiles(tile_cols, tile_rows)?;
    let expected = grid.tile_count() * TILE_BYTES;
    if buffer.len() != expected {
        return Err(CodecError::BufferLength {
            expected,
            actual: buffer.len(),
        });
    }

    let chunks = buffer.chunks_exact(TILE_BYTES);
    for ((tr, tc), chunk) in scan_order(tile_cols, tile_rows).zip(chunks) {
        let tile = tile::decode_bytes(chunk, mode)?;
        grid.set_tile(tr, tc, &tile)?;
    }
    Ok(grid)
}

/// Regroup packed output per bus, units ascending, for flushing one bus at a time.
pub fn group_by_bus(
    packed: &BTreeMap<PhysicalAddress, [u8; TILE_BYTES]>,
) -> BTreeMap<u8, Vec<(u16, [u8; TILE_BYTES])>> {
    let mut buses: BTreeMap<u8, Vec<(u16, [u8; TILE_BYTES])>> = BTreeMap::new();
    for (address, bytes) in packed {
        buses
            .entry(address.bus)
            .or_default()
            .push((address.unit, *bytes));
    }
    buses
}
