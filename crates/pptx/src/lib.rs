//! PPTX export for slidemark presentations.
//!
//! Slides from the core SOM are laid out by a [`RendererRegistry`] onto
//! [`SlideCanvas`]es, which [`PptxWriter`] serialises into an Office Open XML
//! package (a ZIP archive of XML parts).

pub mod assets;
pub mod canvas;
pub mod export;
pub mod geometry;
pub mod highlight;
pub mod layout;
pub mod renderers;
pub mod writer;

pub use assets::{AssetLoader, ImageAsset};
pub use canvas::{DrawCall, SlideCanvas};
pub use export::{bundle_name, export_markdown, Exporter};
pub use highlight::Highlighter;
pub use layout::Layout;
pub use renderers::{RenderContext, Renderer, RendererRegistry};
pub use writer::PptxWriter;
