//! Core pipeline for slidemark: the markdown slide dialect, the slide
//! object model, source-preserving text edits, and the HTML preview.

pub mod attributes;
pub mod blocks;
pub mod brand;
pub mod chart;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod grouping;
pub mod html;
pub mod inline;
pub mod lines;
pub mod mesh;
pub mod serialize;
pub mod session;
pub mod som;
pub mod splitter;
pub mod store;
pub mod surgery;
pub mod theme;
pub mod types;

pub use blocks::parse_blocks;
pub use brand::{BrandConfig, LogoPosition};
pub use chart::{transform as transform_chart, ChartData, ChartType, Dataset};
pub use document::{parse, split_sections, ParsedDocument, SlideSection};
pub use error::{Error, Result};
pub use grouping::{group_blocks, RenderUnit};
pub use html::{render_html, HtmlOptions};
pub use inline::{parse_inline, InlineSegment, InlineStyle};
pub use mesh::{MeshConfig, MeshGenerator, MeshLayout};
pub use serialize::serialize_blocks;
pub use session::PreviewSession;
pub use som::{build_som, Background, BackgroundKind, Presentation, Region, RegionKind, SlideObject};
pub use splitter::{split_slides, SimpleSlide};
pub use store::{StateKey, StateStore};
pub use surgery::{
    reorder_slides, replace_line_or_block, replace_range, update_element_attribute,
    update_global_theme, update_line_attribute, update_slide_yaml,
};
pub use theme::Theme;
pub use types::{Block, BlockKind, ChatAlignment, Metadata};
