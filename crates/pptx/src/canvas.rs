//! Draw calls recorded per slide.
//!
//! Renderers never touch OOXML directly. They push [`DrawCall`]s onto a
//! [`SlideCanvas`], and the package writer serialises the canvas later.

use crate::geometry::Rect;
use slidemark_core::{ChartData, ChartType};

/// Character formatting for one run of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// `RRGGBB`; inherits the paragraph colour when absent.
    pub color: Option<String>,
    /// Background highlight, `RRGGBB`.
    pub highlight: Option<String>,
    pub font: Option<String>,
    /// External hyperlink target.
    pub link: Option<String>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn colored(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Parse an `align` attribute value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Align::Left),
            "center" | "centre" | "middle" => Some(Align::Center),
            "right" | "end" => Some(Align::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bullet {
    Char,
    Number { start: u64 },
}

/// A paragraph inside a text box.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
    pub size_pt: f64,
    /// Default colour for runs without their own, `RRGGBB`.
    pub color: String,
    pub align: Align,
    pub bullet: Option<Bullet>,
    /// Nesting level for list paragraphs.
    pub level: usize,
    pub font: Option<String>,
}

impl Paragraph {
    pub fn new(runs: Vec<TextRun>, size_pt: f64, color: impl Into<String>) -> Self {
        Self {
            runs,
            size_pt,
            color: color.into(),
            align: Align::Left,
            bullet: None,
            level: 0,
            font: None,
        }
    }

    pub fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Anchor {
    #[default]
    Top,
    Middle,
}

/// A text box with optional fill and outline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub rect: Rect,
    pub paragraphs: Vec<Paragraph>,
    pub fill: Option<String>,
    pub outline: Option<String>,
    pub anchor: Anchor,
    /// Rounded corners.
    pub rounded: bool,
}

impl TextBox {
    pub fn new(rect: Rect, paragraphs: Vec<Paragraph>) -> Self {
        Self {
            rect,
            paragraphs,
            fill: None,
            outline: None,
            anchor: Anchor::Top,
            rounded: false,
        }
    }

    pub fn filled(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn outlined(mut self, outline: impl Into<String>) -> Self {
        self.outline = Some(outline.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    Ellipse,
}

/// One table row; each cell is a list of runs.
pub type TableRow = Vec<Vec<TextRun>>;

/// A single drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Text(TextBox),
    Table {
        rect: Rect,
        rows: Vec<TableRow>,
        size_pt: f64,
        text_color: String,
        header_fill: String,
        border: String,
    },
    Image {
        rect: Rect,
        data: Vec<u8>,
        /// File extension used for the media part (`png`, `jpeg`, ...).
        extension: String,
        description: String,
    },
    Chart {
        rect: Rect,
        chart_type: ChartType,
        data: ChartData,
        /// Series (or pie slice) colours, `RRGGBB`.
        colors: Vec<String>,
        text_color: String,
    },
    Shape {
        rect: Rect,
        kind: ShapeKind,
        fill: String,
        /// 0.0 (transparent) to 1.0 (opaque).
        opacity: f64,
        /// Soft edge radius in EMU.
        soft_edge: i64,
    },
}

impl DrawCall {
    pub fn rect(&self) -> Rect {
        match self {
            DrawCall::Text(text) => text.rect,
            DrawCall::Table { rect, .. }
            | DrawCall::Image { rect, .. }
            | DrawCall::Chart { rect, .. }
            | DrawCall::Shape { rect, .. } => *rect,
        }
    }
}

/// Everything drawn on one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideCanvas {
    /// Solid background colour, `RRGGBB`.
    pub background: String,
    pub calls: Vec<DrawCall>,
    pub notes: Option<String>,
}

impl SlideCanvas {
    pub fn new(background: impl Into<String>) -> Self {
        Self {
            background: background.into(),
            calls: Vec::new(),
            notes: None,
        }
    }

    pub fn push(&mut self, call: DrawCall) {
        self.calls.push(call);
    }

    /// Text of every text box, one string per paragraph.
    pub fn texts(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text(text) => Some(text),
                _ => None,
            })
            .flat_map(|text| text.paragraphs.iter().map(Paragraph::text))
            .collect()
    }
}
