//! File reading and writing with path context on every error.

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use std::path::Path;

pub fn read_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("failed to open image: {}", path.display()))
}

pub fn write_png(path: &Path, img: &RgbImage) -> Result<()> {
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing PNG {}", path.display()))
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

pub fn write_bytes(path: &Path, data: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    write_bytes(path, text.as_bytes())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory '{}'", dir.display())),
        _ => Ok(()),
    }
}
