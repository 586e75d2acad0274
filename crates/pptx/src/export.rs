//! Export entry points: PPTX files, the source Markdown and the download bundle.

use crate::assets::AssetLoader;
use crate::canvas::SlideCanvas;
use crate::highlight::Highlighter;
use crate::layout::{compose, LayoutEnv};
use crate::renderers::RendererRegistry;
use crate::writer::PptxWriter;
use slidemark_core::{render_html, Error, HtmlOptions, Presentation, Result, Theme};
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Owns the services a PPTX export needs.
///
/// The registry is injected by the caller and the highlighter loads its
/// syntax sets on first use, so one exporter can serve many exports.
pub struct Exporter {
    registry: RendererRegistry,
    highlighter: Highlighter,
    assets: AssetLoader,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(RendererRegistry::with_defaults())
    }
}

impl Exporter {
    pub fn new(registry: RendererRegistry) -> Self {
        Self {
            registry,
            highlighter: Highlighter::new(),
            assets: AssetLoader::default(),
        }
    }

    /// Resolve relative image paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets = AssetLoader::new(Some(dir.into()));
        self
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    /// Lay out every slide of `deck`.
    pub fn render_canvases(&self, deck: &Presentation, theme: &Theme) -> Vec<SlideCanvas> {
        let titles: Vec<String> = deck
            .slides
            .iter()
            .filter_map(|s| s.title().map(str::to_string))
            .collect();
        let env = LayoutEnv {
            registry: &self.registry,
            highlighter: &self.highlighter,
            assets: &self.assets,
            theme,
            titles: &titles,
        };
        deck.slides
            .iter()
            .map(|slide| compose(slide, &deck.background_for(slide, theme), &env))
            .collect()
    }

    /// Generate the `.pptx` package in memory.
    pub fn to_bytes(&self, deck: &Presentation, theme: &Theme) -> Result<Vec<u8>> {
        let title = deck.title().unwrap_or_else(|| "Presentation".to_string());
        let mut writer = PptxWriter::new(theme).with_title(title);
        if let Some(author) = deck.author() {
            writer = writer.with_author(author);
        }
        writer.add_slides(self.render_canvases(deck, theme));
        log::debug!("Writing {} slides", writer.slide_count());
        writer.generate()
    }

    /// Write the deck as a `.pptx` file.
    pub fn export_pptx(
        &self,
        deck: &Presentation,
        theme: &Theme,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes(deck, theme)?;
        fs::write(path, bytes)
            .map_err(|e| Error::ExportError(format!("Failed to write {}: {}", path.display(), e)))?;
        log::info!("Exported {} slides to {}", deck.slides.len(), path.display());
        Ok(())
    }

    /// Write a zip holding the Markdown source, the HTML preview and the PPTX.
    pub fn export_bundle(
        &self,
        markdown: &str,
        deck: &Presentation,
        theme: &Theme,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.bundle_bytes(markdown, deck, theme)?;
        let mut file = File::create(path)
            .map_err(|e| {
                Error::ExportError(format!("Failed to create {}: {}", path.display(), e))
            })?;
        file.write_all(&bytes)?;
        log::info!("Exported bundle to {}", path.display());
        Ok(())
    }

    pub fn bundle_bytes(
        &self,
        markdown: &str,
        deck: &Presentation,
        theme: &Theme,
    ) -> Result<Vec<u8>> {
        let name = bundle_name(deck);
        let html = render_html(deck, theme, &HtmlOptions::default());
        let pptx = self.to_bytes(deck, theme)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let entries: [(String, &[u8]); 3] = [
            (format!("{}.md", name), markdown.as_bytes()),
            (format!("{}.html", name), html.as_bytes()),
            (format!("{}.pptx", name), &pptx),
        ];
        for (entry, data) in entries {
            zip.start_file(entry, options)
                .map_err(|e| Error::ZipError(e.to_string()))?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish().map_err(|e| Error::ZipError(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// Save the raw Markdown source.
pub fn export_markdown(markdown: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, markdown)
        .map_err(|e| Error::ExportError(format!("Failed to write {}: {}", path.display(), e)))
}

/// File stem for exports: the slugged deck title, or `presentation`.
pub fn bundle_name(deck: &Presentation) -> String {
    let title = deck.title().unwrap_or_default();
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "presentation".to_string()
    } else {
        slug.to_string()
    }
}
