//! Conversion between pixel grids and raster images.
//!
//! One image pixel is one grid cell. Export writes pure white for on and
//! pure black for off; import converts to 8-bit luminance and treats a
//! pixel as on when its luminance is strictly greater than [`THRESHOLD`].

use image::{imageops, DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::error::{CodecError, Result};
use crate::grid::PixelGrid;
use crate::tile::TILE_SIZE;

/// Luminance above which a pixel counts as on.
pub const THRESHOLD: u8 = 127;

/// Side length of drawings saved by the web editor (36 px per cell).
pub const WEB_DRAWING_SIZE: u32 = 288;

/// Cell size in pixels used by the desktop editor's hi-res export.
pub const EDITOR_CELL_SIZE: u32 = 36;

const ON: Rgb<u8> = Rgb([255, 255, 255]);
const OFF: Rgb<u8> = Rgb([0, 0, 0]);

/// LED colors offered by the editor for previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Red,
    YellowGreen,
    Blue,
    White,
    Yellow,
    Green,
    Amber,
}

impl LedColor {
    pub const ALL: [LedColor; 7] = [
        LedColor::Red,
        LedColor::YellowGreen,
        LedColor::Blue,
        LedColor::White,
        LedColor::Yellow,
        LedColor::Green,
        LedColor::Amber,
    ];

    pub fn rgb(self) -> Rgb<u8> {
        match self {
            LedColor::Red => Rgb([0xFF, 0x00, 0x00]),
            LedColor::YellowGreen => Rgb([0x9A, 0xCD, 0x32]),
            LedColor::Blue => Rgb([0x00, 0x00, 0xFF]),
            LedColor::White => Rgb([0xFF, 0xFF, 0xFF]),
            LedColor::Yellow => Rgb([0xFF, 0xFF, 0x00]),
            LedColor::Green => Rgb([0x00, 0xFF, 0x00]),
            LedColor::Amber => Rgb([0xFF, 0xBF, 0x00]),
        }
    }

    /// Parse a color name, ignoring case and `-`/`_` separators.
    pub fn from_name(name: &str) -> Option<LedColor> {
        let key: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "red" => Some(LedColor::Red),
            "yellowgreen" => Some(LedColor::YellowGreen),
            "blue" => Some(LedColor::Blue),
            "white" => Some(LedColor::White),
            "yellow" => Some(LedColor::Yellow),
            "green" => Some(LedColor::Green),
            "amber" => Some(LedColor::Amber),
            _ => None,
        }
    }
}

/// 8-bit ITU-R 601-2 luma, rounded the same way as common imaging libraries'
/// `L` conversion.
#[inline]
pub fn luminance(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

#[inline]
fn is_on(rgb: [u8; 3]) -> bool {
    luminance(rgb) > THRESHOLD
}

/// Render `grid` as a same-size black/white image.
pub fn to_raster_image(grid: &PixelGrid) -> RgbImage {
    to_preview_image(grid, 1, ON)
}

/// Render `grid` with each cell as a `cell_size` square block in `on_color`.
pub fn to_preview_image(grid: &PixelGrid, cell_size: u32, on_color: Rgb<u8>) -> RgbImage {
    let cell_size = cell_size.max(1);
    let width = grid.width() as u32 * cell_size;
    let height = grid.height() as u32 * cell_size;
    let cells = grid.cells();
    let grid_width = grid.width();
    RgbImage::from_fn(width, height, |x, y| {
        let col = (x / cell_size) as usize;
        let row = (y / cell_size) as usize;
        if cells[row * grid_width + col] {
            on_color
        } else {
            OFF
        }
    })
}

/// Threshold an image into a grid.
///
/// Both dimensions must be non-zero multiples of 8.
pub fn from_raster_image(img: &DynamicImage) -> Result<PixelGrid> {
    threshold_into_grid(&img.to_rgb8(), |_| false)
}

/// Like [`from_raster_image`], but pixels exactly equal to `accent` (the
/// editor's LED color) also count as on.
pub fn from_raster_image_with_accent(img: &DynamicImage, accent: Rgb<u8>) -> Result<PixelGrid> {
    threshold_into_grid(&img.to_rgb8(), |px| *px == accent)
}

fn threshold_into_grid(rgb: &RgbImage, also_on: impl Fn(&Rgb<u8>) -> bool) -> Result<PixelGrid> {
    let (width, height) = rgb.dimensions();
    check_tiled(width, height)?;
    let cells = rgb
        .pixels()
        .map(|px| is_on(px.0) || also_on(px))
        .collect();
    PixelGrid::from_cells(width as usize, height as usize, cells)
}

fn check_tiled(width: u32, height: u32) -> Result<()> {
    let tile = TILE_SIZE as u32;
    if width == 0 || height == 0 || width % tile != 0 || height % tile != 0 {
        return Err(CodecError::UnsupportedDimensions {
            width,
            height,
            reason: "image dimensions must be non-zero multiples of 8",
        });
    }
    Ok(())
}

/// Grayscale, threshold to pure black/white, then nearest-neighbour
/// down-sample a square image to 8x8.
///
/// The threshold runs before the resize so that hard edges survive.
pub fn resize_to_8x8(img: &DynamicImage) -> Result<GrayImage> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || width != height {
        return Err(CodecError::UnsupportedDimensions {
            width,
            height,
            reason: "down-sampling needs a non-empty square image",
        });
    }

    let rgb = img.to_rgb8();
    let binary = GrayImage::from_fn(width, height, |x, y| {
        Luma([if is_on(rgb.get_pixel(x, y).0) { 255 } else { 0 }])
    });

    let out = TILE_SIZE as u32;
    Ok(GrayImage::from_fn(out, out, |x, y| {
        *binary.get_pixel(nearest(x, width, out), nearest(y, height, out))
    }))
}

/// Source index sampled for destination `dst` when scaling `src_len` to
/// `dst_len`: the source pixel under the destination pixel's centre.
#[inline]
fn nearest(dst: u32, src_len: u32, dst_len: u32) -> u32 {
    let idx = ((2 * dst as u64 + 1) * src_len as u64) / (2 * dst_len as u64);
    (idx as u32).min(src_len - 1)
}

/// Import a 288x288 web-editor drawing as a single 8x8 tile grid.
pub fn import_web_drawing(img: &DynamicImage) -> Result<PixelGrid> {
    if img.width() != WEB_DRAWING_SIZE || img.height() != WEB_DRAWING_SIZE {
        return Err(CodecError::UnsupportedDimensions {
            width: img.width(),
            height: img.height(),
            reason: "web drawings must be 288x288",
        });
    }
    let small = resize_to_8x8(img)?;
    from_raster_image(&DynamicImage::ImageLuma8(small))
}

/// Turn an 8-pixel-wide portrait strip into a landscape strip.
///
/// Strips drawn as a column of matrices (e.g. 8x24) are rotated 90 degrees
/// counter-clockwise; any other image is returned unchanged.
pub fn landscape(img: DynamicImage) -> DynamicImage {
    let tile = TILE_SIZE as u32;
    if img.width() == tile && img.height() > tile {
        DynamicImage::ImageRgba8(imageops::rotate270(&img))
    } else {
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, gray: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([gray, gray, gray])))
    }

    #[test]
    fn luminance_of_pure_colors() {
        assert_eq!(luminance([0, 0, 0]), 0);
        assert_eq!(luminance([255, 255, 255]), 255);
        assert_eq!(luminance([255, 0, 0]), 76);
        assert_eq!(luminance([0, 255, 0]), 150);
        assert_eq!(luminance([0, 0, 255]), 29);
    }

    #[test]
    fn luminance_of_gray_is_identity() {
        for v in 0..=255u8 {
            assert_eq!(luminance([v, v, v]), v);
        }
    }

    #[test]
    fn threshold_is_strict() {
        let grid = from_raster_image(&solid(8, 8, 127)).unwrap();
        assert_eq!(grid.lit_count(), 0);
        let grid = from_raster_image(&solid(8, 8, 128)).unwrap();
        assert_eq!(grid.lit_count(), 64);
    }

    #[test]
    fn rejects_non_tiled_dimensions() {
        assert!(matches!(
            from_raster_image(&solid(10, 8, 0)),
            Err(CodecError::UnsupportedDimensions { width: 10, height: 8, .. })
        ));
        let grid = from_raster_image(&solid(16, 8, 0)).unwrap();
        assert_eq!(grid.tile_cols(), 2);
        assert_eq!(grid.tile_rows(), 1);
    }

    #[test]
    fn export_then_import_is_identity() {
        let mut grid = PixelGrid::with_tiles(2, 1).unwrap();
        grid.set_cell(0, 0, true).unwrap();
        grid.set_cell(7, 12, true).unwrap();

        let img = to_raster_image(&grid);
        assert_eq!(img.dimensions(), (16, 8));
        assert_eq!(*img.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*img.get_pixel(1, 0), Rgb([0, 0, 0]));

        let back = from_raster_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn accent_color_counts_as_on() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        img.put_pixel(3, 2, LedColor::Red.rgb());
        let img = DynamicImage::ImageRgb8(img);

        // Red alone is too dark to pass the threshold.
        assert_eq!(from_raster_image(&img).unwrap().lit_count(), 0);

        let grid = from_raster_image_with_accent(&img, LedColor::Red.rgb()).unwrap();
        assert_eq!(grid.lit_count(), 1);
        assert!(grid.cell(2, 3).unwrap());
    }

    #[test]
    fn preview_scales_cells() {
        let mut grid = PixelGrid::new(8, 8).unwrap();
        grid.set_cell(1, 2, true).unwrap();
        let img = to_preview_image(&grid, EDITOR_CELL_SIZE, LedColor::Amber.rgb());
        assert_eq!(img.dimensions(), (288, 288));
        assert_eq!(*img.get_pixel(2 * 36, 36), LedColor::Amber.rgb());
        assert_eq!(*img.get_pixel(2 * 36 + 35, 36 + 35), LedColor::Amber.rgb());
        assert_eq!(*img.get_pixel(3 * 36, 36), Rgb([0, 0, 0]));
    }

    #[test]
    fn nearest_samples_pixel_centres() {
        assert_eq!(nearest(0, 288, 8), 18);
        assert_eq!(nearest(7, 288, 8), 270);
        assert_eq!(nearest(0, 8, 8), 0);
        assert_eq!(nearest(7, 8, 8), 7);
    }

    #[test]
    fn resize_keeps_hard_edges() {
        // Left half white, right half black: no gray may appear.
        let img = RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 { Rgb([200, 200, 200]) } else { Rgb([20, 20, 20]) }
        });
        let small = resize_to_8x8(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(small.dimensions(), (8, 8));
        for (x, _, px) in small.enumerate_pixels() {
            assert_eq!(px.0[0], if x < 4 { 255 } else { 0 });
        }
    }

    #[test]
    fn resize_rejects_non_square() {
        assert!(matches!(
            resize_to_8x8(&solid(16, 8, 0)),
            Err(CodecError::UnsupportedDimensions { .. })
        ));
    }

    #[test]
    fn web_drawing_cell_maps_to_one_pixel() {
        let img = RgbImage::from_fn(288, 288, |x, y| {
            if x < 36 && y < 36 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        });
        let grid = import_web_drawing(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(grid.width(), 8);
        assert_eq!(grid.lit_count(), 1);
        assert!(grid.cell(0, 0).unwrap());
    }

    #[test]
    fn web_drawing_must_be_288() {
        assert!(matches!(
            import_web_drawing(&solid(287, 288, 0)),
            Err(CodecError::UnsupportedDimensions { width: 287, .. })
        ));
        assert!(import_web_drawing(&solid(8, 8, 0)).is_err());
    }

    #[test]
    fn landscape_rotates_portrait_strip_ccw() {
        // Mark the top-left pixel of an 8x24 strip.
        let mut img = RgbImage::from_pixel(8, 24, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        let rotated = landscape(DynamicImage::ImageRgb8(img));
        assert_eq!((rotated.width(), rotated.height()), (24, 8));

        // Counter-clockwise: the top-left corner ends up bottom-left.
        let grid = from_raster_image(&rotated).unwrap();
        assert_eq!(grid.lit_count(), 1);
        assert!(grid.cell(7, 0).unwrap());
    }

    #[test]
    fn landscape_leaves_other_shapes_alone() {
        let img = landscape(solid(24, 8, 0));
        assert_eq!((img.width(), img.height()), (24, 8));
        let img = landscape(solid(8, 8, 0));
        assert_eq!((img.width(), img.height()), (8, 8));
    }

    #[test]
    fn led_color_names() {
        assert_eq!(LedColor::from_name("Yellow-Green"), Some(LedColor::YellowGreen));
        assert_eq!(LedColor::from_name("amber"), Some(LedColor::Amber));
        assert_eq!(LedColor::from_name("purple"), None);
        assert_eq!(LedColor::ALL.len(), 7);
    }
}
