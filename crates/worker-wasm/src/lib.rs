//! WASM-compatible wrapper for the slidemark document pipeline.
//!
//! This crate exposes parsing, text surgery and preview rendering to
//! JavaScript for use in a browser editor.

use serde::{Deserialize, Serialize};
use slidemark_core::{Block, HtmlOptions, Presentation, Theme};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Options accepted by [`render_preview_html`].
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewOptions {
    /// Theme id; the document's own theme is used when absent.
    pub theme: Option<String>,
    pub show_notes: bool,
    pub custom_css: Option<String>,
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Parse a document into global metadata and source-mapped blocks.
#[wasm_bindgen]
pub fn parse_document(content: &str) -> Result<JsValue, JsValue> {
    to_js(&slidemark_core::parse(content))
}

/// Build the slide object model for a document.
#[wasm_bindgen]
pub fn build_slides(content: &str) -> Result<JsValue, JsValue> {
    to_js(&Presentation::from_markdown(content))
}

/// Write blocks (as returned by `parse_document`) back to Markdown.
#[wasm_bindgen]
pub fn serialize_blocks(blocks: JsValue) -> Result<String, JsValue> {
    let blocks: Vec<Block> = serde_wasm_bindgen::from_value(blocks)
        .map_err(|e| JsValue::from_str(&format!("Invalid blocks array: {}", e)))?;
    Ok(slidemark_core::serialize_blocks(&blocks))
}

#[wasm_bindgen]
pub fn replace_line_or_block(content: &str, line_index: usize, new_text: &str) -> String {
    slidemark_core::replace_line_or_block(content, line_index, new_text)
}

#[wasm_bindgen]
pub fn replace_range(content: &str, start: usize, end: usize, new_text: &str) -> String {
    slidemark_core::replace_range(content, start, end, new_text)
}

#[wasm_bindgen]
pub fn update_slide_yaml(content: &str, slide_index: usize, key: &str, value: &str) -> String {
    slidemark_core::update_slide_yaml(content, slide_index, key, value)
}

#[wasm_bindgen]
pub fn reorder_slides(content: &str, from: usize, to: usize) -> String {
    slidemark_core::reorder_slides(content, from, to)
}

/// Set `key=value` in a single line's attribute tag.
#[wasm_bindgen]
pub fn update_element_attribute(text: &str, key: &str, value: &str) -> String {
    slidemark_core::update_element_attribute(text, key, value)
}

/// Set `key=value` on line `line_index` of a document.
#[wasm_bindgen]
pub fn update_line_attribute(content: &str, line_index: usize, key: &str, value: &str) -> String {
    slidemark_core::update_line_attribute(content, line_index, key, value)
}

/// Set the document theme.
///
/// # Arguments
/// * `mesh_colors` - Optional array of CSS colours for mesh backgrounds
#[wasm_bindgen]
pub fn update_global_theme(
    content: &str,
    theme_id: &str,
    mesh_colors: JsValue,
) -> Result<String, JsValue> {
    let colors: Option<Vec<String>> = serde_wasm_bindgen::from_value(mesh_colors)
        .map_err(|e| JsValue::from_str(&format!("Invalid colour array: {}", e)))?;
    Ok(slidemark_core::update_global_theme(content, theme_id, colors.as_deref()))
}

/// Convert table rows (header row first) into chart labels and datasets.
#[wasm_bindgen]
pub fn transform_chart(rows: JsValue) -> Result<JsValue, JsValue> {
    let rows: Vec<Vec<String>> = serde_wasm_bindgen::from_value(rows)
        .map_err(|e| JsValue::from_str(&format!("Invalid table rows: {}", e)))?;
    to_js(&slidemark_core::transform_chart(&rows))
}

#[wasm_bindgen]
pub fn parse_inline(text: &str) -> Result<JsValue, JsValue> {
    to_js(&slidemark_core::parse_inline(text))
}

/// Render the full HTML preview for a document.
#[wasm_bindgen]
pub fn render_preview_html(content: &str, options: JsValue) -> Result<String, JsValue> {
    let options: PreviewOptions = if options.is_undefined() || options.is_null() {
        PreviewOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsValue::from_str(&format!("Invalid preview options: {}", e)))?
    };
    Ok(render_preview_html_impl(content, &options))
}

fn render_preview_html_impl(content: &str, options: &PreviewOptions) -> String {
    let deck = Presentation::from_markdown(content);
    let theme_id = options.theme.clone().or_else(|| deck.theme_id());
    let theme = theme_id.as_deref().map(Theme::resolve).unwrap_or_default();
    let mut html_options = HtmlOptions::default().with_notes(options.show_notes);
    if let Some(css) = &options.custom_css {
        html_options = html_options.with_custom_css(css.clone());
    }
    slidemark_core::render_html(&deck, &theme, &html_options)
}

/// Ids of the built-in themes.
#[wasm_bindgen]
pub fn theme_ids() -> Result<JsValue, JsValue> {
    to_js(&Theme::builtin_ids())
}
