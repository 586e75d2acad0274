//! Slide layouts.
//!
//! Every layout shares the same renderer registry; layouts only choose the
//! region geometry and the emphasis applied to text.

use crate::assets::AssetLoader;
use crate::canvas::{Align, DrawCall, ShapeKind, SlideCanvas};
use crate::geometry::{
    inches, points, Rect, BLOCK_GAP, COLUMN_GAP, MARGIN, SLIDE_HEIGHT, SLIDE_WIDTH,
};
use crate::highlight::Highlighter;
use crate::renderers::{Emphasis, RenderContext, RendererRegistry};
use slidemark_core::grouping::group_blocks;
use slidemark_core::mesh::MeshGenerator;
use slidemark_core::som::{Background, BackgroundKind, RegionKind, SlideObject};
use slidemark_core::theme::{is_dark_color, normalize_hex};
use slidemark_core::Theme;

/// Slide layouts the exporter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Default,
    Impact,
    Grid,
    Quote,
    Alert,
    TwoColumn,
}

impl Layout {
    /// Column regions always win; otherwise the configured name, with
    /// unknown names drawn as `Default`.
    pub fn of(slide: &SlideObject) -> Self {
        if !slide.columns().is_empty() {
            return Layout::TwoColumn;
        }
        match slide.layout.trim().to_ascii_lowercase().as_str() {
            "impact" => Layout::Impact,
            "grid" => Layout::Grid,
            "quote" => Layout::Quote,
            "alert" => Layout::Alert,
            _ => Layout::Default,
        }
    }

    fn emphasis(self) -> Emphasis {
        match self {
            Layout::Impact => Emphasis {
                scale: 1.5,
                align: Align::Center,
                ..Emphasis::default()
            },
            Layout::Quote => Emphasis {
                scale: 1.25,
                align: Align::Center,
                italic: true,
                ..Emphasis::default()
            },
            Layout::Alert => Emphasis {
                scale: 1.1,
                bold: true,
                ..Emphasis::default()
            },
            _ => Emphasis::default(),
        }
    }
}

/// Shared services for composing slides.
pub struct LayoutEnv<'a> {
    pub registry: &'a RendererRegistry,
    pub highlighter: &'a Highlighter,
    pub assets: &'a AssetLoader,
    pub theme: &'a Theme,
    pub titles: &'a [String],
}

/// Draw one slide onto a fresh canvas.
pub fn compose(slide: &SlideObject, background: &Background, env: &LayoutEnv<'_>) -> SlideCanvas {
    let (mut canvas, is_dark) = paint_background(background, env);
    canvas.notes = slide.notes.clone();

    let layout = Layout::of(slide);
    let content = Rect::new(MARGIN, MARGIN, SLIDE_WIDTH - 2 * MARGIN, SLIDE_HEIGHT - 2 * MARGIN);
    let ctx = RenderContext {
        x: content.x,
        y: content.y,
        w: content.w,
        max_y: content.bottom(),
        theme: env.theme,
        is_dark,
        emphasis: layout.emphasis(),
        highlighter: env.highlighter,
        assets: env.assets,
        titles: env.titles,
    };
    log::debug!("Composing {} as {:?}", slide.id, layout);

    match layout {
        Layout::Default => {
            let y = render_header(slide, &ctx, env, &mut canvas);
            render_body(slide, &ctx.at(y), env, &mut canvas);
        }
        Layout::Impact => {
            let y = render_header(slide, &ctx.at(SLIDE_HEIGHT / 4), env, &mut canvas);
            render_body(slide, &ctx.at(y), env, &mut canvas);
        }
        Layout::Quote => {
            let inset = inches(1.0);
            let inner = ctx.within(Rect::new(
                content.x + inset,
                SLIDE_HEIGHT / 5,
                content.w - 2 * inset,
                content.bottom() - SLIDE_HEIGHT / 5,
            ));
            let y = render_header(slide, &inner, env, &mut canvas);
            render_body(slide, &inner.at(y), env, &mut canvas);
        }
        Layout::Alert => {
            let bar = points(8.0);
            canvas.push(DrawCall::Shape {
                rect: Rect::new(content.x, content.y, bar, content.h),
                kind: ShapeKind::Rect,
                fill: ctx.accent_color(),
                opacity: 1.0,
                soft_edge: 0,
            });
            let offset = bar + inches(0.3);
            let inner = ctx.within(Rect::new(
                content.x + offset,
                content.y,
                content.w - offset,
                content.h,
            ));
            let y = render_header(slide, &inner, env, &mut canvas);
            render_body(slide, &inner.at(y), env, &mut canvas);
        }
        Layout::Grid => {
            let y = render_header(slide, &ctx, env, &mut canvas);
            render_grid(slide, &ctx.at(y), env, &mut canvas);
        }
        Layout::TwoColumn => {
            let y = render_header(slide, &ctx, env, &mut canvas);
            let y = render_body(slide, &ctx.at(y), env, &mut canvas);
            let columns = slide.columns();
            let area = Rect::new(content.x, y, content.w, content.bottom() - y);
            for (region, cell) in columns.iter().zip(area.columns(columns.len(), COLUMN_GAP)) {
                env.registry.render_blocks(&region.blocks, &ctx.within(cell), &mut canvas);
            }
        }
    }
    canvas
}

/// Fill the background; returns the canvas and whether it is dark.
fn paint_background(background: &Background, env: &LayoutEnv<'_>) -> (SlideCanvas, bool) {
    let theme_fill = normalize_hex(&env.theme.background)
        .or_else(|| env.theme.mesh_colors.first().and_then(|c| normalize_hex(c)))
        .unwrap_or_else(|| "FFFFFF".to_string());

    match background.kind {
        BackgroundKind::Color => {
            let fill = background
                .color
                .as_deref()
                .and_then(normalize_hex)
                .unwrap_or_else(|| {
                    log::warn!("Unrecognised background colour {:?}", background.color);
                    theme_fill
                });
            let dark = is_dark_color(&fill);
            (SlideCanvas::new(fill), dark)
        }
        BackgroundKind::Image => {
            let mut canvas = SlideCanvas::new(theme_fill);
            let src = background.image.as_deref().unwrap_or_default();
            if let Some(asset) = env.assets.load(src) {
                canvas.push(DrawCall::Image {
                    rect: Rect::slide(),
                    data: asset.data,
                    extension: asset.extension,
                    description: "Background".to_string(),
                });
            }
            (canvas, env.theme.is_dark())
        }
        BackgroundKind::Mesh => {
            let config = background.mesh_config.clone().unwrap_or_default();
            let mesh = MeshGenerator::new(config).generate(SLIDE_WIDTH as f64, SLIDE_HEIGHT as f64);
            let base = normalize_hex(&mesh.base).unwrap_or(theme_fill);
            let dark = is_dark_color(&base);
            let mut canvas = SlideCanvas::new(base);
            for blob in &mesh.blobs {
                let Some(fill) = normalize_hex(&blob.color) else {
                    continue;
                };
                canvas.push(DrawCall::Shape {
                    rect: Rect::new(
                        (blob.cx - blob.rx) as i64,
                        (blob.cy - blob.ry) as i64,
                        (blob.rx * 2.0) as i64,
                        (blob.ry * 2.0) as i64,
                    ),
                    kind: ShapeKind::Ellipse,
                    fill,
                    opacity: blob.opacity,
                    soft_edge: mesh.blur as i64,
                });
            }
            (canvas, dark)
        }
    }
}

fn render_header(
    slide: &SlideObject,
    ctx: &RenderContext<'_>,
    env: &LayoutEnv<'_>,
    canvas: &mut SlideCanvas,
) -> i64 {
    match slide.region(RegionKind::Header) {
        Some(header) if !header.blocks.is_empty() => {
            env.registry.render_blocks(&header.blocks, ctx, canvas) + BLOCK_GAP
        }
        _ => ctx.y,
    }
}

/// Main and footer regions, flowed in order.
fn render_body(
    slide: &SlideObject,
    ctx: &RenderContext<'_>,
    env: &LayoutEnv<'_>,
    canvas: &mut SlideCanvas,
) -> i64 {
    let mut y = ctx.y;
    for region in &slide.regions {
        if matches!(region.kind, RegionKind::Main | RegionKind::Footer) {
            y = env.registry.render_blocks(&region.blocks, &ctx.at(y), canvas);
        }
    }
    y
}

/// Main-region units placed row by row into `columns` cells.
fn render_grid(
    slide: &SlideObject,
    ctx: &RenderContext<'_>,
    env: &LayoutEnv<'_>,
    canvas: &mut SlideCanvas,
) -> i64 {
    let Some(main) = slide.region(RegionKind::Main) else {
        return ctx.y;
    };
    let count = slide.grid_columns();
    let units = group_blocks(&main.blocks);
    let mut y = ctx.y;
    for row in units.chunks(count) {
        let cells = Rect::new(ctx.x, y, ctx.w, ctx.max_y - y).columns(count, COLUMN_GAP);
        let mut bottom = y;
        for (unit, cell) in row.iter().zip(cells) {
            bottom = bottom.max(env.registry.render_unit(unit, &ctx.within(cell), canvas));
        }
        y = bottom + COLUMN_GAP;
    }
    y
}
