//! Per-block renderers.
//!
//! A renderer draws one block at the context's cursor and returns the
//! vertical position where the next block may start. Lists are rendered a
//! whole group at a time, using the same grouping pass as the HTML preview.

use crate::assets::AssetLoader;
use crate::canvas::{
    Align, Anchor, Bullet, DrawCall, Paragraph, ShapeKind, SlideCanvas, TextBox, TextRun,
};
use crate::geometry::{inches, points, text_height, Rect, BLOCK_GAP};
use crate::highlight::Highlighter;
use serde_json::Value;
use slidemark_core::chart::{self, ChartType};
use slidemark_core::grouping::{group_blocks, RenderUnit};
use slidemark_core::inline::{parse_inline, plain_text, InlineStyle};
use slidemark_core::theme::{is_dark_color, normalize_hex};
use slidemark_core::{Block, BlockKind, ChatAlignment, Theme};
use std::collections::HashMap;

/// Default text inset of a PPTX text box.
const INSET_X: i64 = 91_440;
const INSET_Y: i64 = 45_720;

const BODY_PT: f64 = 18.0;
const LIST_PT: f64 = 20.0;
const CODE_PT: f64 = 14.0;
const TABLE_PT: f64 = 14.0;
const CHAT_PT: f64 = 16.0;

/// Layout-level text treatment applied on top of each block's own styling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emphasis {
    pub scale: f64,
    pub align: Align,
    pub italic: bool,
    pub bold: bool,
}

impl Default for Emphasis {
    fn default() -> Self {
        Self {
            scale: 1.0,
            align: Align::Left,
            italic: false,
            bold: false,
        }
    }
}

/// Where and how a block is drawn.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    /// Lowest y content should reach.
    pub max_y: i64,
    pub theme: &'a Theme,
    /// Whether the slide background is dark.
    pub is_dark: bool,
    pub emphasis: Emphasis,
    pub highlighter: &'a Highlighter,
    pub assets: &'a AssetLoader,
    /// Slide titles for table-of-contents blocks.
    pub titles: &'a [String],
}

impl<'a> RenderContext<'a> {
    pub fn at(&self, y: i64) -> Self {
        Self { y, ..*self }
    }

    pub fn within(&self, rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            max_y: rect.bottom(),
            ..*self
        }
    }

    fn readable(&self, color: &str, light: &str, dark: &str) -> String {
        match normalize_hex(color) {
            Some(hex) if is_dark_color(&hex) != self.is_dark => hex,
            _ if self.is_dark => light.to_string(),
            _ => dark.to_string(),
        }
    }

    pub fn text_color(&self) -> String {
        self.readable(&self.theme.text_color, "F8FAFC", "1F2937")
    }

    pub fn heading_color(&self) -> String {
        self.readable(&self.theme.heading_color, "FFFFFF", "111827")
    }

    pub fn muted_color(&self) -> String {
        self.readable(&self.theme.muted_color, "94A3B8", "6B7280")
    }

    pub fn accent_color(&self) -> String {
        normalize_hex(&self.theme.accent_color).unwrap_or_else(|| "6366F1".to_string())
    }

    /// Series colours for charts.
    pub fn palette(&self) -> Vec<String> {
        let mut colors: Vec<String> = [&self.theme.accent_color, &self.theme.secondary_color]
            .into_iter()
            .chain(self.theme.mesh_colors.iter().skip(1))
            .filter_map(|c| normalize_hex(c))
            .collect();
        for fallback in ["6366F1", "EC4899", "06B6D4", "F59E0B", "10B981", "8B5CF6"] {
            if !colors.iter().any(|c| c == fallback) {
                colors.push(fallback.to_string());
            }
        }
        colors.dedup();
        colors
    }

    fn scaled(&self, size_pt: f64) -> f64 {
        size_pt * self.emphasis.scale
    }

    fn remaining(&self) -> i64 {
        (self.max_y - self.y).max(0)
    }
}

/// Draws one block, returning the next cursor position.
pub type Renderer = fn(&Block, &RenderContext<'_>, &mut SlideCanvas) -> i64;

/// Block kind to renderer table.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<BlockKind, Renderer>,
}

impl RendererRegistry {
    /// An empty registry; every block is skipped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a renderer for every drawable block kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in [BlockKind::Heading1, BlockKind::Heading2, BlockKind::Heading3] {
            registry.register(kind, render_heading);
        }
        registry.register(BlockKind::Paragraph, render_paragraph);
        registry.register(BlockKind::Code, render_code);
        registry.register(BlockKind::Mermaid, render_code);
        registry.register(BlockKind::Quote, render_quote);
        for kind in [BlockKind::CalloutTip, BlockKind::CalloutNote, BlockKind::CalloutWarning] {
            registry.register(kind, render_callout);
        }
        registry.register(BlockKind::Chat, render_chat);
        registry.register(BlockKind::Table, render_table);
        registry.register(BlockKind::Image, render_image);
        registry.register(BlockKind::Chart, render_chart);
        registry.register(BlockKind::HorizontalRule, render_rule);
        registry.register(BlockKind::Toc, render_toc);
        registry.register(BlockKind::BulletItem, render_single_item);
        registry.register(BlockKind::NumberedItem, render_single_item);
        registry
    }

    pub fn register(&mut self, kind: BlockKind, renderer: Renderer) {
        self.renderers.insert(kind, renderer);
    }

    pub fn get(&self, kind: BlockKind) -> Option<Renderer> {
        self.renderers.get(&kind).copied()
    }

    pub fn render_block(
        &self,
        block: &Block,
        ctx: &RenderContext<'_>,
        canvas: &mut SlideCanvas,
    ) -> i64 {
        match self.get(block.kind) {
            Some(renderer) => renderer(block, ctx, canvas),
            None => {
                log::debug!("No renderer for {} blocks", block.kind.as_str());
                ctx.y
            }
        }
    }

    /// Render a grouped unit: one block, or a whole list.
    pub fn render_unit(
        &self,
        unit: &RenderUnit<'_>,
        ctx: &RenderContext<'_>,
        canvas: &mut SlideCanvas,
    ) -> i64 {
        match unit {
            RenderUnit::Single(block) => self.render_block(block, ctx, canvas),
            RenderUnit::List { ordered, items } => {
                render_list(*ordered, unit.list_start(), items, ctx, canvas)
            }
        }
    }

    /// Flow `blocks` downwards from the context's cursor.
    pub fn render_blocks(
        &self,
        blocks: &[Block],
        ctx: &RenderContext<'_>,
        canvas: &mut SlideCanvas,
    ) -> i64 {
        let mut y = ctx.y;
        for unit in group_blocks(blocks) {
            let bottom = self.render_unit(&unit, &ctx.at(y), canvas);
            if bottom > y {
                y = bottom + BLOCK_GAP;
            }
        }
        y
    }
}

/// Height of a text box holding `text` at `size_pt`.
fn box_height(text: &str, size_pt: f64, width: i64) -> i64 {
    text_height(text, size_pt, width - 2 * INSET_X) + 2 * INSET_Y
}

/// Convert inline markup into runs.
pub fn inline_runs(content: &str, ctx: &RenderContext<'_>) -> Vec<TextRun> {
    parse_inline(content)
        .into_iter()
        .map(|segment| {
            let mut run = TextRun::plain(segment.content);
            run.bold = ctx.emphasis.bold;
            run.italic = ctx.emphasis.italic;
            match segment.style {
                InlineStyle::Text => {}
                InlineStyle::Bold => run.bold = true,
                InlineStyle::Italic => run.italic = true,
                InlineStyle::Underline => run.underline = true,
                InlineStyle::Code => {
                    run.font = Some(ctx.theme.code_font.clone());
                    run.color = Some(ctx.accent_color());
                }
                InlineStyle::Link => {
                    run.underline = true;
                    run.color = Some(ctx.accent_color());
                    run.link = segment.url;
                }
                InlineStyle::Highlight => {
                    run.highlight = Some(if ctx.is_dark { "854D0E" } else { "FEF08A" }.to_string());
                }
                InlineStyle::Badge => {
                    run.bold = true;
                    run.color = Some(ctx.accent_color());
                }
                InlineStyle::Muted => run.color = Some(ctx.muted_color()),
            }
            run
        })
        .collect()
}

/// Size multiplier from a `size` attribute (`1.5`, `1.5em`, `150%`).
fn size_factor(block: &Block) -> f64 {
    let Some(raw) = block.attributes.get("size") else {
        return 1.0;
    };
    let raw = raw.trim();
    let factor = if let Some(pct) = raw.strip_suffix('%') {
        pct.trim().parse::<f64>().map(|v| v / 100.0)
    } else {
        raw.trim_end_matches("em").trim().parse::<f64>()
    };
    match factor {
        Ok(f) if f > 0.0 && f.is_finite() => f,
        _ => {
            log::warn!("Ignoring size attribute '{}'", raw);
            1.0
        }
    }
}

fn block_align(block: &Block, ctx: &RenderContext<'_>) -> Align {
    block
        .attributes
        .get("align")
        .and_then(|a| Align::parse(a))
        .unwrap_or(ctx.emphasis.align)
}

fn block_color(block: &Block, default: String) -> String {
    block
        .attributes
        .get("color")
        .and_then(|c| normalize_hex(c))
        .unwrap_or(default)
}

/// Push a plain text box sized to its content.
fn push_text(
    canvas: &mut SlideCanvas,
    ctx: &RenderContext<'_>,
    paragraphs: Vec<Paragraph>,
    size_pt: f64,
) -> i64 {
    let text: Vec<String> = paragraphs.iter().map(Paragraph::text).collect();
    let h = box_height(&text.join("\n"), size_pt, ctx.w);
    canvas.push(DrawCall::Text(TextBox::new(Rect::new(ctx.x, ctx.y, ctx.w, h), paragraphs)));
    ctx.y + h
}

fn render_heading(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let base = match block.kind.heading_level() {
        Some(1) => 40.0,
        Some(2) => 32.0,
        _ => 24.0,
    };
    let size = ctx.scaled(base) * size_factor(block);
    let mut runs = inline_runs(&block.content, ctx);
    for run in &mut runs {
        run.bold = true;
    }
    let mut paragraph = Paragraph::new(runs, size, block_color(block, ctx.heading_color()))
        .aligned(block_align(block, ctx));
    paragraph.font = Some(ctx.theme.heading_font.clone());
    push_text(canvas, ctx, vec![paragraph], size)
}

fn render_paragraph(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let size = ctx.scaled(BODY_PT) * size_factor(block);
    let color = block_color(block, ctx.text_color());
    let align = block_align(block, ctx);
    let paragraphs = block
        .content
        .split('\n')
        .map(|line| Paragraph::new(inline_runs(line, ctx), size, color.clone()).aligned(align))
        .collect();
    push_text(canvas, ctx, paragraphs, size)
}

fn render_code(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let code_theme = &ctx.theme.code_theme;
    let language = if block.kind == BlockKind::Mermaid {
        log::debug!("Mermaid diagrams are exported as source");
        String::new()
    } else {
        block.meta_str("language").unwrap_or_default()
    };
    let numbered = block
        .metadata
        .get("lineNumbers")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let fill = ctx
        .highlighter
        .background(code_theme)
        .unwrap_or_else(|| if ctx.is_dark { "1E293B" } else { "F6F8FA" }.to_string());
    let text_color = if is_dark_color(&fill) { "E5E7EB" } else { "1F2937" };
    let code = block.content.trim_end_matches('\n');

    let lines = ctx.highlighter.highlight(code, &language, code_theme);
    let width = lines.len().to_string().len();
    let paragraphs: Vec<Paragraph> = lines
        .into_iter()
        .enumerate()
        .map(|(i, mut runs)| {
            if numbered {
                let gutter = TextRun::plain(format!("{:>width$}  ", i + 1)).colored("8B949E");
                runs.insert(0, gutter);
            }
            let mut paragraph = Paragraph::new(runs, CODE_PT, text_color);
            paragraph.font = Some(ctx.theme.code_font.clone());
            paragraph
        })
        .collect();

    let line_count = paragraphs.len().max(1) as f64;
    let h = (points(line_count * CODE_PT * 1.2) + 4 * INSET_Y)
        .min(ctx.remaining().max(inches(1.0)));
    let mut text = TextBox::new(Rect::new(ctx.x, ctx.y, ctx.w, h), paragraphs).filled(fill);
    text.rounded = true;
    canvas.push(DrawCall::Text(text));
    ctx.y + h
}

fn render_quote(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let size = ctx.scaled(BODY_PT * 1.1);
    let bar = points(4.0);
    let indent = bar + inches(0.2);
    let paragraphs: Vec<Paragraph> = block
        .content
        .split('\n')
        .map(|line| {
            let mut runs = inline_runs(line, ctx);
            for run in &mut runs {
                run.italic = true;
            }
            Paragraph::new(runs, size, ctx.text_color()).aligned(ctx.emphasis.align)
        })
        .collect();
    let inner = RenderContext {
        x: ctx.x + indent,
        w: ctx.w - indent,
        ..*ctx
    };
    let bottom = push_text(canvas, &inner, paragraphs, size);
    canvas.push(DrawCall::Shape {
        rect: Rect::new(ctx.x, ctx.y, bar, bottom - ctx.y),
        kind: ShapeKind::Rect,
        fill: ctx.accent_color(),
        opacity: 1.0,
        soft_edge: 0,
    });
    bottom
}

fn render_callout(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let (label, color, light_fill) = match block.kind {
        BlockKind::CalloutTip => ("Tip", "10B981", "ECFDF5"),
        BlockKind::CalloutWarning => ("Warning", "F59E0B", "FFFBEB"),
        _ => ("Note", "3B82F6", "EFF6FF"),
    };
    let fill = if ctx.is_dark { "1F2937" } else { light_fill };
    let size = ctx.scaled(CHAT_PT);
    let mut paragraphs = vec![Paragraph::new(
        vec![TextRun::plain(label).bold().colored(color)],
        size,
        color,
    )];
    paragraphs.extend(
        block
            .content
            .split('\n')
            .map(|line| Paragraph::new(inline_runs(line, ctx), size, ctx.text_color())),
    );
    let text: Vec<String> = paragraphs.iter().map(Paragraph::text).collect();
    let h = box_height(&text.join("\n"), size, ctx.w) + 2 * INSET_Y;
    let mut text = TextBox::new(Rect::new(ctx.x, ctx.y, ctx.w, h), paragraphs)
        .filled(fill)
        .outlined(color);
    text.rounded = true;
    canvas.push(DrawCall::Text(text));
    ctx.y + h
}

fn render_chat(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let alignment = block.alignment.unwrap_or(ChatAlignment::Left);
    let bubble_w = ctx.w * 7 / 10;
    let (x, fill, color, align) = match alignment {
        ChatAlignment::Left => (
            ctx.x,
            if ctx.is_dark { "334155" } else { "E5E7EB" }.to_string(),
            ctx.text_color(),
            Align::Left,
        ),
        ChatAlignment::Center => (
            ctx.x + (ctx.w - bubble_w) / 2,
            if ctx.is_dark { "1E293B" } else { "F3F4F6" }.to_string(),
            ctx.text_color(),
            Align::Center,
        ),
        ChatAlignment::Right => (
            ctx.x + ctx.w - bubble_w,
            ctx.accent_color(),
            "FFFFFF".to_string(),
            Align::Right,
        ),
    };
    let size = ctx.scaled(CHAT_PT);
    let mut paragraphs = Vec::new();
    if let Some(role) = block.role.as_deref().filter(|r| !r.is_empty()) {
        paragraphs.push(
            Paragraph::new(vec![TextRun::plain(role).bold()], size * 0.75, color.clone())
                .aligned(align),
        );
    }
    paragraphs.push(Paragraph::new(inline_runs(&block.content, ctx), size, color).aligned(align));
    let text: Vec<String> = paragraphs.iter().map(Paragraph::text).collect();
    let h = box_height(&text.join("\n"), size, bubble_w);
    let mut text = TextBox::new(Rect::new(x, ctx.y, bubble_w, h), paragraphs).filled(fill);
    text.rounded = true;
    canvas.push(DrawCall::Text(text));
    ctx.y + h
}

fn render_table(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let rows = block.table_rows.as_deref().unwrap_or(&[]);
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return ctx.y;
    }
    let size = ctx.scaled(TABLE_PT);
    let cell_w = ctx.w / columns as i64;
    let h: i64 = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| box_height(&plain_text(cell), size, cell_w))
                .max()
                .unwrap_or_else(|| box_height("", size, cell_w))
        })
        .sum();
    let table_rows = rows
        .iter()
        .map(|row| {
            (0..columns)
                .map(|i| row.get(i).map(|cell| inline_runs(cell, ctx)).unwrap_or_default())
                .collect()
        })
        .collect();
    canvas.push(DrawCall::Table {
        rect: Rect::new(ctx.x, ctx.y, ctx.w, h),
        rows: table_rows,
        size_pt: size,
        text_color: ctx.text_color(),
        header_fill: ctx.accent_color(),
        border: ctx.muted_color(),
    });
    ctx.y + h
}

/// Width from a `width` attribute: a percentage of the region or inches.
fn image_width(block: &Block, region_w: i64) -> i64 {
    let Some(raw) = block.attributes.get("width") else {
        return region_w;
    };
    let raw = raw.trim();
    let width = if let Some(pct) = raw.strip_suffix('%') {
        pct.trim().parse::<f64>().ok().map(|p| (region_w as f64 * p / 100.0) as i64)
    } else if let Some(value) = raw.strip_suffix("in") {
        value.trim().parse::<f64>().ok().map(inches)
    } else {
        raw.trim_end_matches("px").parse::<f64>().ok().map(|px| inches(px / 96.0))
    };
    width.filter(|w| *w > 0).map_or(region_w, |w| w.min(region_w))
}

fn render_image(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let src = block.meta_str("src").unwrap_or_default();
    let mut w = image_width(block, ctx.w);
    let room = ctx.remaining().max(inches(1.0));

    let Some(asset) = ctx.assets.load(&src) else {
        let h = (w * 9 / 16).min(room).min(inches(2.5));
        let label = if block.content.trim().is_empty() { &src } else { &block.content };
        let paragraph = Paragraph::new(
            vec![TextRun::plain(format!("Image: {}", label))],
            ctx.scaled(CHAT_PT),
            ctx.muted_color(),
        )
        .aligned(Align::Center);
        let mut placeholder = TextBox::new(Rect::new(ctx.x, ctx.y, w, h), vec![paragraph])
            .outlined(ctx.muted_color());
        placeholder.anchor = Anchor::Middle;
        canvas.push(DrawCall::Text(placeholder));
        return ctx.y + h;
    };

    let aspect = asset.aspect().unwrap_or(16.0 / 9.0);
    let mut h = (w as f64 / aspect) as i64;
    if h > room {
        h = room;
        w = (h as f64 * aspect) as i64;
    }
    let x = match block_align(block, ctx) {
        Align::Left => ctx.x,
        Align::Center => ctx.x + (ctx.w - w) / 2,
        Align::Right => ctx.x + ctx.w - w,
    };
    canvas.push(DrawCall::Image {
        rect: Rect::new(x, ctx.y, w, h),
        data: asset.data,
        extension: asset.extension,
        description: block.content.clone(),
    });
    ctx.y + h
}

fn render_chart(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let rows = block.table_rows.as_deref().unwrap_or(&[]);
    let chart_type = ChartType::from_subtype(
        &block
            .meta_str("chartType")
            .unwrap_or_else(|| "bar".to_string()),
    );
    let mut data = chart::transform(rows);
    if data.is_empty() {
        log::warn!("Chart at line {} has no data rows", block.source_line + 1);
        let paragraph = Paragraph::new(
            vec![TextRun::plain("Chart has no data")],
            ctx.scaled(BODY_PT),
            ctx.muted_color(),
        );
        return push_text(canvas, ctx, vec![paragraph], ctx.scaled(BODY_PT));
    }
    if chart_type == ChartType::Pie {
        data = data.first_dataset_only();
    }
    let h = ctx.remaining().clamp(inches(2.0), inches(4.5));
    canvas.push(DrawCall::Chart {
        rect: Rect::new(ctx.x, ctx.y, ctx.w, h),
        chart_type,
        data,
        colors: ctx.palette(),
        text_color: ctx.text_color(),
    });
    ctx.y + h
}

fn render_rule(_block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let h = points(1.5);
    canvas.push(DrawCall::Shape {
        rect: Rect::new(ctx.x, ctx.y, ctx.w, h),
        kind: ShapeKind::Rect,
        fill: ctx.muted_color(),
        opacity: 1.0,
        soft_edge: 0,
    });
    ctx.y + h
}

fn render_toc(_block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    if ctx.titles.is_empty() {
        return ctx.y;
    }
    let size = ctx.scaled(LIST_PT);
    let paragraphs = ctx
        .titles
        .iter()
        .map(|title| {
            let mut paragraph = Paragraph::new(inline_runs(title, ctx), size, ctx.text_color());
            paragraph.bullet = Some(Bullet::Number { start: 1 });
            paragraph
        })
        .collect();
    push_text(canvas, ctx, paragraphs, size)
}

fn render_single_item(block: &Block, ctx: &RenderContext<'_>, canvas: &mut SlideCanvas) -> i64 {
    let ordered = block.kind == BlockKind::NumberedItem;
    let start = block.metadata.get("start").and_then(Value::as_u64).unwrap_or(1);
    render_list(ordered, start, &[block], ctx, canvas)
}

/// One text box for a whole list; nesting follows each item's level.
fn render_list(
    ordered: bool,
    start: u64,
    items: &[&Block],
    ctx: &RenderContext<'_>,
    canvas: &mut SlideCanvas,
) -> i64 {
    let size = ctx.scaled(LIST_PT);
    let color = ctx.text_color();
    let mut text = String::new();
    let paragraphs: Vec<Paragraph> = items
        .iter()
        .map(|item| {
            let level = item.list_level();
            let bullet = match (item.kind, level) {
                (BlockKind::NumberedItem, 0) if ordered => Bullet::Number { start },
                (BlockKind::NumberedItem, _) => Bullet::Number { start: 1 },
                _ => Bullet::Char,
            };
            let indent = "    ".repeat(level + 1);
            text.push_str(&indent);
            text.push_str(&plain_text(&item.content));
            text.push('\n');
            let mut paragraph =
                Paragraph::new(inline_runs(&item.content, ctx), size, color.clone());
            paragraph.bullet = Some(bullet);
            paragraph.level = level;
            paragraph
        })
        .collect();
    let h = box_height(text.trim_end(), size, ctx.w);
    canvas.push(DrawCall::Text(TextBox::new(Rect::new(ctx.x, ctx.y, ctx.w, h), paragraphs)));
    ctx.y + h
}
