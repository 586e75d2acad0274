//! Generative mesh backgrounds.
//!
//! A mesh is a base colour overlaid with soft blurred blobs whose placement
//! comes from a seeded mulberry32 generator. The same `(seed, colors, width,
//! height)` always yields the same [`MeshLayout`], so the HTML preview (SVG)
//! and the PPTX export (ellipse shapes) draw identical backgrounds.

use crate::types::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;

/// Palette used when neither the slide nor the theme names mesh colours.
pub const DEFAULT_MESH_COLORS: [&str; 4] = ["#0f172a", "#6366f1", "#ec4899", "#06b6d4"];

/// Mesh parameters from a slide's `mesh` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConfig {
    /// First colour is the base fill, the rest tint the blobs.
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub seed: u32,
}

impl MeshConfig {
    pub fn new(colors: Vec<String>, seed: u32) -> Self {
        Self { colors, seed }
    }

    /// Read `mesh: { colors: [...], seed: n }` from slide metadata.
    ///
    /// A missing or malformed key gives an empty palette and `default_seed`.
    pub fn from_meta(meta: &Metadata, default_seed: u32) -> Self {
        let Some(Value::Object(mesh)) = meta.get("mesh") else {
            return Self::new(Vec::new(), default_seed);
        };
        let colors = match mesh.get("colors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(list)) => list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        let seed = match mesh.get("seed") {
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|n| n as u32)
                .or_else(|| n.as_f64().map(|f| f as u32))
                .unwrap_or(default_seed),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default_seed),
            _ => default_seed,
        };
        Self { colors, seed }
    }

    /// This config with `fallback` colours filled in when none are set.
    pub fn with_fallback_colors(&self, fallback: &[String]) -> Self {
        let mut config = self.clone();
        if config.colors.is_empty() {
            config.colors = fallback.to_vec();
        }
        config
    }
}

/// 32-bit mulberry32 generator.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / 4_294_967_296.0
    }

    /// Next value in `[low, high)`.
    pub fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

/// One blurred ellipse of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshBlob {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
    pub color: String,
    pub opacity: f64,
}

/// Resolved mesh geometry in the target's coordinate units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshLayout {
    pub width: f64,
    pub height: f64,
    pub base: String,
    pub blobs: Vec<MeshBlob>,
    /// Blur radius in the same units as `width`.
    pub blur: f64,
}

/// Deterministic mesh generator.
#[derive(Debug, Clone)]
pub struct MeshGenerator {
    config: MeshConfig,
}

impl MeshGenerator {
    pub fn new(config: MeshConfig) -> Self {
        Self { config }
    }

    fn palette(&self) -> Vec<String> {
        if self.config.colors.is_empty() {
            DEFAULT_MESH_COLORS.iter().map(|c| c.to_string()).collect()
        } else {
            self.config.colors.clone()
        }
    }

    /// Lay out the mesh for a `width` x `height` canvas.
    pub fn generate(&self, width: f64, height: f64) -> MeshLayout {
        let palette = self.palette();
        let mut rng = Mulberry32::new(self.config.seed);
        let base = palette[0].clone();
        let tints: &[String] = if palette.len() > 1 {
            &palette[1..]
        } else {
            &palette
        };

        let span = width.max(height);
        let count = (tints.len() * 2).clamp(4, 8);
        let blobs = (0..count)
            .map(|i| {
                let cx = rng.range(-0.1, 1.1) * width;
                let cy = rng.range(-0.1, 1.1) * height;
                let rx = rng.range(0.25, 0.55) * span;
                let ry = rx * rng.range(0.6, 1.0);
                let opacity = rng.range(0.45, 0.85);
                MeshBlob {
                    cx,
                    cy,
                    rx,
                    ry,
                    color: tints[i % tints.len()].clone(),
                    opacity,
                }
            })
            .collect();

        MeshLayout {
            width,
            height,
            base,
            blobs,
            blur: span * 0.08,
        }
    }
}

impl MeshLayout {
    /// Render as a standalone SVG element.
    pub fn to_svg(&self, id: &str) -> String {
        let filter = format!("mesh-blur-{}", id);
        let mut svg = String::new();
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {:.0} {:.0}\" preserveAspectRatio=\"none\">",
            self.width, self.height
        );
        let _ = write!(
            svg,
            "<defs><filter id=\"{}\" x=\"-50%\" y=\"-50%\" width=\"200%\" height=\"200%\"><feGaussianBlur stdDeviation=\"{:.1}\"/></filter></defs>",
            html_escape::encode_double_quoted_attribute(&filter),
            self.blur
        );
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            html_escape::encode_double_quoted_attribute(&self.base)
        );
        let _ = write!(
            svg,
            "<g filter=\"url(#{})\">",
            html_escape::encode_double_quoted_attribute(&filter)
        );
        for blob in &self.blobs {
            let _ = write!(
                svg,
                "<ellipse cx=\"{:.1}\" cy=\"{:.1}\" rx=\"{:.1}\" ry=\"{:.1}\" fill=\"{}\" fill-opacity=\"{:.2}\"/>",
                blob.cx,
                blob.cy,
                blob.rx,
                blob.ry,
                html_escape::encode_double_quoted_attribute(&blob.color),
                blob.opacity
            );
        }
        svg.push_str("</g></svg>");
        svg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mulberry32_matches_reference_sequence() {
        // First outputs of mulberry32(1), as produced by the reference JS.
        let mut rng = Mulberry32::new(1);
        let first = rng.next_f64();
        assert!((first - 0.6270739405881613).abs() < 1e-12);
        let second = rng.next_f64();
        assert!((0.0..1.0).contains(&second));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = MeshConfig::new(vec!["#000".into(), "#f00".into(), "#0f0".into()], 42);
        let a = MeshGenerator::new(config.clone()).generate(1280.0, 720.0);
        let b = MeshGenerator::new(config).generate(1280.0, 720.0);
        assert_eq!(a, b);
        assert_eq!(a.base, "#000");
        assert!(a.blobs.iter().all(|blob| blob.color != "#000"));
    }

    #[test]
    fn test_seed_changes_layout() {
        let a = MeshGenerator::new(MeshConfig::new(Vec::new(), 1)).generate(100.0, 100.0);
        let b = MeshGenerator::new(MeshConfig::new(Vec::new(), 2)).generate(100.0, 100.0);
        assert_ne!(a.blobs, b.blobs);
        assert_eq!(a.base, DEFAULT_MESH_COLORS[0]);
    }

    #[test]
    fn test_config_from_meta() {
        let meta = json!({"mesh": {"colors": ["#111", "#222"], "seed": 7}});
        let config = MeshConfig::from_meta(meta.as_object().unwrap(), 0);
        assert_eq!(config.colors, vec!["#111", "#222"]);
        assert_eq!(config.seed, 7);

        let meta = json!({"mesh": {"colors": "#aaa, #bbb", "seed": "9"}});
        let config = MeshConfig::from_meta(meta.as_object().unwrap(), 0);
        assert_eq!(config.colors, vec!["#aaa", "#bbb"]);
        assert_eq!(config.seed, 9);

        let config = MeshConfig::from_meta(&Metadata::new(), 3);
        assert!(config.colors.is_empty());
        assert_eq!(config.seed, 3);
    }

    #[test]
    fn test_svg_output() {
        let layout =
            MeshGenerator::new(MeshConfig::new(vec!["#123456".into()], 5)).generate(160.0, 90.0);
        let svg = layout.to_svg("s0");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("fill=\"#123456\""));
        assert!(svg.contains("url(#mesh-blur-s0)"));
        assert_eq!(svg.matches("<ellipse").count(), layout.blobs.len());
    }
}
