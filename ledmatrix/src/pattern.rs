//! Generated source tables of 8x8 patterns.
//!
//! Display scripts can compile patterns in instead of reading `.bytes`
//! files at runtime. Every entry holds exactly the 8 bytes that packing the
//! tile on its own would produce.

use crate::error::{CodecError, Result};
use crate::grid::PixelGrid;
use crate::layout;
use crate::tile::{self, Orientation, Tile, TILE_BYTES};

/// A named 8-byte pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub bytes: [u8; TILE_BYTES],
}

impl Pattern {
    pub fn from_tile(name: impl Into<String>, tile: &Tile, mode: Orientation) -> Pattern {
        Pattern {
            name: name.into(),
            bytes: tile::encode(tile, mode),
        }
    }

    /// Pattern for a single-tile grid.
    pub fn from_grid(
        name: impl Into<String>,
        grid: &PixelGrid,
        mode: Orientation,
    ) -> Result<Pattern> {
        if grid.tile_count() != 1 {
            return Err(CodecError::dimensions(
                grid.width(),
                grid.height(),
                "a pattern holds exactly one 8x8 tile",
            ));
        }
        Ok(Pattern::from_tile(name, &grid.tile(0, 0)?, mode))
    }

    pub fn to_tile(&self, mode: Orientation) -> Tile {
        tile::decode(&self.bytes, mode)
    }
}

/// Pattern name for a drawing saved at `timestamp` (e.g. `20250319_122528`).
pub fn timestamp_pattern_name(timestamp: &str) -> String {
    pattern_name(&format!("pixel_art_{timestamp}"))
}

/// Pattern name for an image file name such as `pixel_art_20250319_122528_8x8.png`.
///
/// The extension is dropped, characters that cannot appear in an identifier
/// become `_`, and `_8x8` is appended when missing.
pub fn pattern_name(file_name: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if !name.ends_with("_8x8") {
        name.push_str("_8x8");
    }
    name
}

/// An ordered collection of patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternTable {
    pub entries: Vec<Pattern>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pattern: Pattern) {
        self.entries.push(pattern);
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a Python module defining a `PATTERNS` dict of `bytes`.
    pub fn to_python(&self) -> String {
        let mut out = String::new();
        out.push_str("# LED Matrix Patterns\n");
        out.push_str("# Auto-generated from web drawings\n\n");
        out.push_str("PATTERNS = {\n");
        for p in &self.entries {
            out.push_str(&format!("    {}: bytes([\n", python_str(&p.name)));
            out.push_str("        # 8x8 matrix pattern\n");
            for b in p.bytes {
                out.push_str(&format!("        0b{b:08b},\n"));
            }
            out.push_str("    ]),\n\n");
        }
        out.push_str("}\n");
        out
    }

    /// Render as a Rust source file defining `PATTERNS`.
    pub fn to_rust(&self) -> String {
        let mut out = String::new();
        out.push_str("// LED matrix patterns, auto-generated.\n\n");
        out.push_str("pub const PATTERNS: &[(&str, [u8; 8])] = &[\n");
        for p in &self.entries {
            let bytes: Vec<String> = p.bytes.iter().map(|b| format!("0b{b:08b}")).collect();
            out.push_str(&format!("    ({:?}, [{}]),\n", p.name, bytes.join(", ")));
        }
        out.push_str("];\n");
        out
    }

    /// Parse a table in the format written by [`PatternTable::to_python`].
    ///
    /// Comments and blank lines are ignored; byte literals may be binary,
    /// hex or decimal, and an entry may sit on one line or span several.
    pub fn parse_python(src: &str) -> Result<PatternTable> {
        let mut table = PatternTable::new();
        // Entry being read: name, bytes so far, line of its header.
        let mut open: Option<(String, Vec<u8>, usize)> = None;

        for (idx, raw) in src.lines().enumerate() {
            let line_no = idx + 1;
            let mut line = strip_comment(raw).trim();
            if let Some(rest) = line.strip_prefix("PATTERNS") {
                line = rest.split_once('{').map_or("", |(_, r)| r).trim();
            }

            while !line.is_empty() {
                match open.take() {
                    None => {
                        if line.starts_with('}') {
                            break;
                        }
                        let (name, rest) = parse_entry_header(line)
                            .ok_or_else(|| syntax(line_no, "expected `'name': bytes([`"))?;
                        open = Some((name, Vec::with_capacity(TILE_BYTES), line_no));
                        line = rest;
                    }
                    Some((name, mut bytes, start)) => {
                        let (body, rest) = match line.find("])") {
                            Some(end) => (&line[..end], Some(&line[end + 2..])),
                            None => (line, None),
                        };
                        for literal in body.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                            let byte = parse_byte(literal).ok_or_else(|| {
                                syntax(line_no, &format!("invalid byte literal `{literal}`"))
                            })?;
                            bytes.push(byte);
                        }
                        match rest {
                            Some(rest) => {
                                let count = bytes.len();
                                let bytes: [u8; TILE_BYTES] = bytes.try_into().map_err(|_| {
                                    syntax(
                                        start,
                                        &format!("pattern '{name}' has {count} bytes, expected 8"),
                                    )
                                })?;
                                table.push(Pattern { name, bytes });
                                let rest = rest.trim_start();
                                line = rest.strip_prefix(',').unwrap_or(rest).trim();
                            }
                            None => {
                                open = Some((name, bytes, start));
                                line = "";
                            }
                        }
                    }
                }
            }
        }

        if let Some((name, _, start)) = open {
            return Err(syntax(start, &format!("pattern '{name}' is never closed")));
        }
        Ok(table)
    }
}

fn syntax(line: usize, message: &str) -> CodecError {
    CodecError::PatternSyntax {
        line,
        message: message.to_string(),
    }
}

/// Quote `name` as a single-quoted Python string literal.
fn python_str(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('\'');
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Cut a trailing `#` comment. A `#` inside a quoted name is kept.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '#' => return &line[..i],
            None => {}
        }
    }
    line
}

/// Parse `'name': bytes([` and return the unescaped name and whatever
/// follows the opening bracket.
fn parse_entry_header(line: &str) -> Option<(String, &str)> {
    let quote = line.chars().next().filter(|&c| c == '\'' || c == '"')?;
    let mut name = String::new();
    let mut chars = line.char_indices().skip(1);
    let end = loop {
        let (i, c) = chars.next()?;
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                name.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            c if c == quote => break i,
            c => name.push(c),
        }
    };
    let rest = line[end + 1..].trim_start().strip_prefix(':')?.trim_start();
    let rest = rest.strip_prefix("bytes")?.trim_start().strip_prefix('(')?;
    let rest = rest.trim_start().strip_prefix('[')?;
    Some((name, rest.trim()))
}

fn parse_byte(literal: &str) -> Option<u8> {
    if let Some(bin) = literal.strip_prefix("0b").or_else(|| literal.strip_prefix("0B")) {
        u8::from_str_radix(bin, 2).ok()
    } else if let Some(hex) = literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        literal.parse().ok()
    }
}

/// Render `grid` as an Arduino `PROGMEM` table.
///
/// Line `k` holds byte `k` of every tile, tiles in scan order, written as
/// `Bxxxxxxxx` literals.
pub fn arduino_header(grid: &PixelGrid, mode: Orientation) -> String {
    let packed = layout::to_buffer(grid, mode);
    let total = packed.as_bytes().len();

    let mut out = String::new();
    out.push_str("static uint8_t PROGMEM\n");
    out.push_str(&format!("  pixelImg[][{total}] = {{\n  {{ "));
    for k in 0..TILE_BYTES {
        if k > 0 {
            out.push_str("\n    ");
        }
        let line: Vec<String> = packed.chunks().map(|t| format!("B{:08b}", t[k])).collect();
        out.push_str(&line.join(", "));
        if k + 1 < TILE_BYTES {
            out.push_str(", ");
        }
    }
    out.push_str(" },\n    };\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_outline() -> Pattern {
        Pattern {
            name: "pixel_art_20250319_122528_8x8".into(),
            bytes: [0xFF, 0x81, 0x81, 0x81, 0x81, 0x81, 0x81, 0xFF],
        }
    }

    #[test]
    fn names_from_files_and_timestamps() {
        assert_eq!(
            pattern_name("pixel_art_20250319_122528_8x8.png"),
            "pixel_art_20250319_122528_8x8"
        );
        assert_eq!(pattern_name("my heart.png"), "my_heart_8x8");
        assert_eq!(
            timestamp_pattern_name("20250319_115451"),
            "pixel_art_20250319_115451_8x8"
        );
    }

    #[test]
    fn python_output_matches_generated_module() {
        let mut table = PatternTable::new();
        table.push(square_outline());
        let expected = "\
# LED Matrix Patterns
# Auto-generated from web drawings

PATTERNS = {
    'pixel_art_20250319_122528_8x8': bytes([
        # 8x8 matrix pattern
        0b11111111,
        0b10000001,
        0b10000001,
        0b10000001,
        0b10000001,
        0b10000001,
        0b10000001,
        0b11111111,
    ]),

}
";
        assert_eq!(table.to_python(), expected);
    }

    #[test]
    fn python_table_parses_back() {
        let mut table = PatternTable::new();
        table.push(square_outline());
        table.push(Pattern {
            name: "dot_8x8".into(),
            bytes: [0, 0, 0, 0x10, 0, 0, 0, 0],
        });
        let parsed = PatternTable::parse_python(&table.to_python()).unwrap();
        assert_eq!(parsed, table);
        assert_eq!(parsed.get("dot_8x8").unwrap().bytes[3], 0x10);
    }

    #[test]
    fn parse_accepts_hex_and_decimal() {
        let src = "PATTERNS = {\n    \"x\": bytes([\n 0xff, 1, 2, 3,\n 4, 5, 6, 0b111,\n ]),\n}\n";
        let table = PatternTable::parse_python(src).unwrap();
        assert_eq!(table.entries[0].bytes, [0xFF, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn parse_accepts_entries_on_one_line() {
        let src = "PATTERNS = {\n    'x': bytes([0xff, 1, 2, 3,\n 4, 5, 6, 0b111]),\n    \
                   'y': bytes([0, 0, 0, 0, 0, 0, 0, 9]), 'z': bytes([8, 7, 6, 5, 4, 3, 2, 1])\n}\n";
        let table = PatternTable::parse_python(src).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("x").unwrap().bytes, [0xFF, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(table.get("y").unwrap().bytes[7], 9);
        assert_eq!(table.get("z").unwrap().bytes[0], 8);

        let src = "PATTERNS = {'solo': bytes([1, 2, 3, 4, 5, 6, 7, 8])}\n";
        assert_eq!(PatternTable::parse_python(src).unwrap().get("solo").unwrap().bytes[7], 8);
    }

    #[test]
    fn names_with_quotes_are_escaped() {
        let mut table = PatternTable::new();
        table.push(Pattern {
            name: "it's #1 \\ best".into(),
            bytes: [1, 0, 0, 0, 0, 0, 0, 0x80],
        });
        let src = table.to_python();
        assert!(src.contains("    'it\\'s #1 \\\\ best': bytes([\n"), "{src}");
        assert_eq!(PatternTable::parse_python(&src).unwrap(), table);
    }

    #[test]
    fn parse_rejects_short_pattern() {
        let src = "PATTERNS = {\n    'a': bytes([\n        0b1,\n    ]),\n}\n";
        let err = PatternTable::parse_python(src).unwrap_err();
        assert!(matches!(err, CodecError::PatternSyntax { line: 2, .. }), "{err}");
    }

    #[test]
    fn parse_rejects_unclosed_pattern() {
        let src = "PATTERNS = {\n    'a': bytes([\n        0b1,\n";
        assert!(matches!(
            PatternTable::parse_python(src),
            Err(CodecError::PatternSyntax { line: 2, .. })
        ));
    }

    #[test]
    fn rust_output_lists_entries() {
        let mut table = PatternTable::new();
        table.push(square_outline());
        let src = table.to_rust();
        assert!(src.contains("pub const PATTERNS: &[(&str, [u8; 8])] = &["));
        assert!(src.contains(
            "(\"pixel_art_20250319_122528_8x8\", [0b11111111, 0b10000001, 0b10000001, \
             0b10000001, 0b10000001, 0b10000001, 0b10000001, 0b11111111]),"
        ));
    }

    #[test]
    fn pattern_matches_single_tile_pack() {
        let mut grid = PixelGrid::new(8, 8).unwrap();
        grid.set_cell(2, 5, true).unwrap();
        for mode in [Orientation::Normal, Orientation::Rotated90Ccw] {
            let p = Pattern::from_grid("p", &grid, mode).unwrap();
            let buffer = layout::to_buffer(&grid, mode);
            assert_eq!(&p.bytes[..], buffer.as_bytes());
            assert_eq!(p.to_tile(mode), grid.tile(0, 0).unwrap());
        }
        let wide = PixelGrid::with_tiles(2, 1).unwrap();
        assert!(Pattern::from_grid("w", &wide, Orientation::Normal).is_err());
    }

    #[test]
    fn arduino_header_interleaves_tiles_by_byte() {
        let mut grid = PixelGrid::with_tiles(2, 1).unwrap();
        grid.set_cell(0, 0, true).unwrap();
        grid.set_cell(7, 15, true).unwrap();
        let header = arduino_header(&grid, Orientation::Normal);
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines[0], "static uint8_t PROGMEM");
        assert_eq!(lines[1], "  pixelImg[][16] = {");
        assert_eq!(lines[2], "  { B10000000, B00000000, ");
        assert_eq!(lines[9], "    B00000000, B00000001 },");
        assert_eq!(lines[10], "    };");
    }
}
