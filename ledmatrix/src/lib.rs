pub mod error;
pub mod tile;
pub mod grid;
pub mod layout;
pub mod raster;
pub mod pattern;
#[cfg(feature = "serde")]
pub mod config;
