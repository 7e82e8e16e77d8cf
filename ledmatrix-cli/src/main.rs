use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, info, warn};

use ledmatrix::config::DisplayConfig;
use ledmatrix::grid::PixelGrid;
use ledmatrix::layout::{self, PackedBuffer};
use ledmatrix::pattern::{self, Pattern, PatternTable};
use ledmatrix::raster::{self, LedColor};
use ledmatrix::tile::Orientation;

mod files;

/// Convert pixel art to and from 8x8 LED matrix byte buffers
#[derive(Parser)]
#[command(name = "ledmatrix", version)]
struct Cli {
    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a PNG drawing into a flat .bytes buffer
    Encode {
        /// Input image (width and height multiples of 8)
        image: PathBuf,
        /// Output file (defaults to the input path with a .bytes extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Bit order: "normal" or "rotated" (90 degrees counter-clockwise)
        #[arg(long, default_value = "normal")]
        orientation: String,
        /// Rotate 8-pixel-wide portrait strips into landscape first
        #[arg(long)]
        auto_rotate: bool,
    },
    /// Decode a .bytes buffer into a PNG
    Decode {
        /// Input .bytes file
        bytes: PathBuf,
        /// Tiles across
        #[arg(long, default_value = "1")]
        cols: usize,
        /// Tiles down
        #[arg(long, default_value = "1")]
        rows: usize,
        /// Bit order the buffer was written with
        #[arg(long, default_value = "normal")]
        orientation: String,
        /// Pixels per cell (36 matches the editor's hi-res export)
        #[arg(long, default_value = "1")]
        scale: u32,
        /// Color of lit cells (red, yellow-green, blue, white, yellow, green, amber)
        #[arg(long, default_value = "white")]
        led_color: String,
        /// Output PNG (defaults to the input path with a .png extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a .bytes buffer as text
    Show {
        /// Input .bytes file
        bytes: PathBuf,
        #[arg(long, default_value = "1")]
        cols: usize,
        #[arg(long, default_value = "1")]
        rows: usize,
        #[arg(long, default_value = "normal")]
        orientation: String,
    },
    /// Pack a drawing onto the matrices described by a display config
    Pack {
        /// Input image
        image: PathBuf,
        /// Display config (.toml)
        #[arg(long)]
        config: PathBuf,
        /// Write one .bytes file per matrix into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build a pattern table from 8x8 drawings
    Patterns {
        /// Input images; unreadable or malformed files are skipped
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Inputs are 288x288 web-editor drawings to down-sample
        #[arg(long)]
        web: bool,
        /// Output format: "python" or "rust"
        #[arg(long, default_value = "python")]
        format: String,
        #[arg(long, default_value = "normal")]
        orientation: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a drawing as an Arduino PROGMEM header
    Arduino {
        /// Input image
        image: PathBuf,
        #[arg(long, default_value = "normal")]
        orientation: String,
        /// Output .h file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .init();

    match cli.command {
        Command::Encode {
            image,
            output,
            orientation,
            auto_rotate,
        } => cmd_encode(&image, output.as_deref(), &orientation, auto_rotate),
        Command::Decode {
            bytes,
            cols,
            rows,
            orientation,
            scale,
            led_color,
            output,
        } => cmd_decode(&bytes, cols, rows, &orientation, scale, &led_color, output.as_deref()),
        Command::Show {
            bytes,
            cols,
            rows,
            orientation,
        } => cmd_show(&bytes, cols, rows, &orientation),
        Command::Pack {
            image,
            config,
            output,
        } => cmd_pack(&image, &config, output.as_deref()),
        Command::Patterns {
            images,
            web,
            format,
            orientation,
            output,
        } => cmd_patterns(&images, web, &format, &orientation, output.as_deref()),
        Command::Arduino {
            image,
            orientation,
            output,
        } => cmd_arduino(&image, &orientation, output.as_deref()),
    }
}

fn parse_orientation(name: &str) -> Result<Orientation> {
    match name.to_ascii_lowercase().as_str() {
        "normal" => Ok(Orientation::Normal),
        "rotated" | "rotated90ccw" | "ccw" => Ok(Orientation::Rotated90Ccw),
        _ => anyhow::bail!("unknown orientation '{}', use 'normal' or 'rotated'", name),
    }
}

fn load_grid(path: &Path, auto_rotate: bool) -> Result<PixelGrid> {
    let mut img = files::read_image(path)?;
    if auto_rotate {
        let (w, h) = (img.width(), img.height());
        img = raster::landscape(img);
        if (img.width(), img.height()) != (w, h) {
            info!("rotated {}x{} portrait strip to landscape", w, h);
        }
    }
    let grid = raster::from_raster_image(&img)
        .with_context(|| format!("converting {}", path.display()))?;
    debug!(
        "{}: {}x{} tiles, {} lit cells",
        path.display(),
        grid.tile_cols(),
        grid.tile_rows(),
        grid.lit_count()
    );
    Ok(grid)
}

fn load_buffer(path: &Path, cols: usize, rows: usize, orientation: Orientation) -> Result<PixelGrid> {
    let data = files::read_bytes(path)?;
    let buffer = PackedBuffer::try_from(data)
        .with_context(|| format!("{} is not a packed tile buffer", path.display()))?;
    layout::unpack(buffer.as_bytes(), cols, rows, orientation)
        .with_context(|| format!("unpacking {} as {}x{} tiles", path.display(), cols, rows))
}

fn cmd_encode(
    image: &Path,
    output: Option<&Path>,
    orientation: &str,
    auto_rotate: bool,
) -> Result<()> {
    let orientation = parse_orientation(orientation)?;
    let grid = load_grid(image, auto_rotate)?;
    let buffer = layout::to_buffer(&grid, orientation);

    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| image.with_extension("bytes"));
    files::write_bytes(&out_path, buffer.as_bytes())?;
    println!(
        "wrote {} ({} tiles, {} bytes)",
        out_path.display(),
        buffer.tile_count(),
        buffer.as_bytes().len()
    );
    Ok(())
}

fn cmd_decode(
    bytes: &Path,
    cols: usize,
    rows: usize,
    orientation: &str,
    scale: u32,
    led_color: &str,
    output: Option<&Path>,
) -> Result<()> {
    let orientation = parse_orientation(orientation)?;
    let color = LedColor::from_name(led_color)
        .with_context(|| format!("unknown LED color '{}'", led_color))?;
    anyhow::ensure!(scale > 0, "scale must be at least 1");

    let grid = load_buffer(bytes, cols, rows, orientation)?;
    let img = raster::to_preview_image(&grid, scale, color.rgb());

    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| bytes.with_extension("png"));
    files::write_png(&out_path, &img)?;
    println!("wrote {}", out_path.display());
    Ok(())
}

fn cmd_show(bytes: &Path, cols: usize, rows: usize, orientation: &str) -> Result<()> {
    let orientation = parse_orientation(orientation)?;
    let grid = load_buffer(bytes, cols, rows, orientation)?;
    for row in 0..grid.height() {
        let line: String = grid.cells()[row * grid.width()..(row + 1) * grid.width()]
            .iter()
            .map(|&on| if on { '#' } else { '.' })
            .collect();
        println!("{}", line);
    }
    Ok(())
}

fn cmd_pack(image: &Path, config_path: &Path, output: Option<&Path>) -> Result<()> {
    let toml_str = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config = DisplayConfig::from_toml(&toml_str)
        .with_context(|| format!("parsing display config {}", config_path.display()))?;
    if let Some(name) = &config.name {
        info!("display '{}'", name);
    }

    let grid = load_grid(image, false)?;
    anyhow::ensure!(
        (grid.tile_cols(), grid.tile_rows()) == (config.tile_cols, config.tile_rows),
        "{} is {}x{} tiles but the display is {}x{}",
        image.display(),
        grid.tile_cols(),
        grid.tile_rows(),
        config.tile_cols,
        config.tile_rows
    );

    let map = config.address_map()?;
    let packed = layout::pack(&grid, config.orientation, &map)?;

    if let Some(dir) = output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory '{}'", dir.display()))?;
    }

    for (bus, units) in layout::group_by_bus(&packed) {
        println!("bus {}", bus);
        for (unit, bytes) in units {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            println!("  {:#04x}: {}", unit, hex.join(" "));
            if let Some(dir) = output {
                let path = dir.join(format!("bus{}_{:02x}.bytes", bus, unit));
                files::write_bytes(&path, &bytes)?;
                debug!("wrote {}", path.display());
            }
        }
    }
    Ok(())
}

fn cmd_patterns(
    images: &[PathBuf],
    web: bool,
    format: &str,
    orientation: &str,
    output: Option<&Path>,
) -> Result<()> {
    let orientation = parse_orientation(orientation)?;
    anyhow::ensure!(
        matches!(format, "python" | "rust"),
        "unknown format '{}', use 'python' or 'rust'",
        format
    );

    let mut table = PatternTable::new();
    for path in images {
        match pattern_from_image(path, web, orientation) {
            Ok(p) => {
                info!("converted {} to pattern '{}'", path.display(), p.name);
                table.push(p);
            }
            Err(e) => warn!("skipping {}: {:#}", path.display(), e),
        }
    }
    anyhow::ensure!(!table.is_empty(), "no images were converted");

    let src = match format {
        "rust" => table.to_rust(),
        _ => table.to_python(),
    };
    match output {
        Some(path) => {
            files::write_text(path, &src)?;
            println!("wrote {} patterns to {}", table.len(), path.display());
        }
        None => print!("{}", src),
    }
    Ok(())
}

fn pattern_from_image(path: &Path, web: bool, orientation: Orientation) -> Result<Pattern> {
    let img = files::read_image(path)?;
    let grid = if web {
        raster::import_web_drawing(&img)?
    } else {
        raster::from_raster_image(&img)?
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Pattern::from_grid(pattern::pattern_name(&file_name), &grid, orientation)?)
}

fn cmd_arduino(image: &Path, orientation: &str, output: Option<&Path>) -> Result<()> {
    let orientation = parse_orientation(orientation)?;
    let grid = load_grid(image, false)?;
    let header = pattern::arduino_header(&grid, orientation);
    match output {
        Some(path) => {
            files::write_text(path, &header)?;
            println!("wrote {}", path.display());
        }
        None => print!("{}", header),
    }
    Ok(())
}
