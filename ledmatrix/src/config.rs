use serde::Deserialize;

use crate::error::CodecError;
use crate::layout::{contiguous_units, even_runs, AddressMap, AddressOrder, BusGroup};
use crate::tile::Orientation;

/// Serde-driven description of one physical display deployment.
///
/// ```toml
/// name = "2x3 dual bus"
/// tile_cols = 3
/// tile_rows = 2
/// orientation = "normal"
///
/// [[buses]]
/// bus = 0
/// addresses = [0x72, 0x71, 0x70]
///
/// [[buses]]
/// bus = 1
/// addresses = [0x72, 0x71, 0x70]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub tile_cols: usize,
    pub tile_rows: usize,
    #[serde(default)]
    pub orientation: Orientation,
    /// Per-bus address lists. Empty means tile `i` is unit `i` on bus 0.
    #[serde(default)]
    pub buses: Vec<BusConfig>,
}

/// Matrices attached to one bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    pub bus: u8,
    /// Scan-order tiles on this bus. When omitted for every bus, the scan
    /// order is split into equal contiguous runs in declaration order.
    #[serde(default)]
    pub tiles: Option<Vec<usize>>,
    /// Explicit unit address per tile, in the same order as `tiles`.
    #[serde(default)]
    pub addresses: Option<Vec<u16>>,
    /// Used with `order` when `addresses` is omitted.
    #[serde(default)]
    pub base: u16,
    #[serde(default)]
    pub order: AddressOrder,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("layout error: {0}")]
    Layout(#[from] CodecError),
}

impl DisplayConfig {
    /// Parse a TOML config string.
    pub fn from_toml(toml_str: &str) -> Result<DisplayConfig, ConfigError> {
        let config: DisplayConfig = toml::from_str(toml_str)?;
        // Reject bad address mappings at load time.
        config.address_map()?;
        Ok(config)
    }

    pub fn tile_count(&self) -> Result<usize, CodecError> {
        self.tile_cols
            .checked_mul(self.tile_rows)
            .ok_or_else(|| {
                CodecError::dimensions(self.tile_cols, self.tile_rows, "too many tiles")
            })
    }

    /// Build the scan-order address map described by this config.
    pub fn address_map(&self) -> Result<AddressMap, CodecError> {
        let tile_count = self.tile_count()?;
        if self.buses.is_empty() {
            return AddressMap::identity(tile_count);
        }

        let explicit = self.buses.iter().filter(|b| b.tiles.is_some()).count();
        let runs = match explicit {
            0 => even_runs(tile_count, self.buses.len())?,
            n if n == self.buses.len() => self
                .buses
                .iter()
                .map(|b| b.tiles.clone().unwrap_or_default())
                .collect(),
            _ => {
                return Err(CodecError::InvalidPartition(
                    "either every bus lists its tiles or none does".to_string(),
                ))
            }
        };

        let groups = self
            .buses
            .iter()
            .zip(runs)
            .map(|(bus, tiles)| {
                Ok(BusGroup {
                    bus: bus.bus,
                    units: match &bus.addresses {
                        Some(units) => units.clone(),
                        None => contiguous_units(tiles.len(), bus.base, bus.order)?,
                    },
                    tiles,
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        AddressMap::partitioned(tile_count, &groups)
    }
}
