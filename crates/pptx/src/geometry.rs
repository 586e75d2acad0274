//! Slide geometry in English Metric Units.

/// EMU per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per typographic point.
pub const EMU_PER_POINT: i64 = 12_700;

/// 16:9 slide, 13.333in x 7.5in.
pub const SLIDE_WIDTH: i64 = 12_192_000;
pub const SLIDE_HEIGHT: i64 = 6_858_000;

/// Outer margin around slide content.
pub const MARGIN: i64 = EMU_PER_INCH / 2;

/// Vertical gap between consecutive blocks.
pub const BLOCK_GAP: i64 = EMU_PER_INCH / 8;

/// Horizontal gap between columns and grid cells.
pub const COLUMN_GAP: i64 = EMU_PER_INCH / 3;

pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

pub fn points(value: f64) -> i64 {
    (value * EMU_PER_POINT as f64).round() as i64
}

/// An axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            x,
            y,
            w: w.max(0),
            h: h.max(0),
        }
    }

    /// The whole slide.
    pub fn slide() -> Self {
        Self::new(0, 0, SLIDE_WIDTH, SLIDE_HEIGHT)
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }

    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    /// Split horizontally into `count` equal cells separated by `gap`.
    pub fn columns(&self, count: usize, gap: i64) -> Vec<Rect> {
        let count = count.max(1) as i64;
        let cell = (self.w - gap * (count - 1)) / count;
        (0..count)
            .map(|i| Rect::new(self.x + i * (cell + gap), self.y, cell, self.h))
            .collect()
    }
}

/// Rough rendered height of `text` at `size_pt` in a box `width` EMU wide.
///
/// Assumes an average glyph is half an em wide and a line is 1.2 em tall.
pub fn text_height(text: &str, size_pt: f64, width: i64) -> i64 {
    let glyph = (size_pt * 0.5 * EMU_PER_POINT as f64).max(1.0);
    let per_line = ((width as f64 / glyph).floor() as usize).max(1);
    let lines: usize = text
        .split('\n')
        .map(|line| line.chars().count().div_ceil(per_line).max(1))
        .sum();
    points(lines.max(1) as f64 * size_pt * 1.2)
}
