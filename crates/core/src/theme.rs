//! Presentation themes and colour helpers.

use crate::brand::BrandConfig;
use serde::{Deserialize, Serialize};

/// Colours and fonts shared by the HTML preview and the PPTX export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub name: String,
    /// Default slide background: a colour, an image URL or `mesh`.
    pub background: String,
    pub text_color: String,
    pub heading_color: String,
    pub accent_color: String,
    pub secondary_color: String,
    pub muted_color: String,
    pub font: String,
    pub heading_font: String,
    pub code_font: String,
    /// syntect theme used for code blocks.
    pub code_theme: String,
    /// Palette for mesh backgrounds that name no colours.
    #[serde(default)]
    pub mesh_colors: Vec<String>,
}

struct Palette {
    id: &'static str,
    name: &'static str,
    background: &'static str,
    text: &'static str,
    heading: &'static str,
    accent: &'static str,
    secondary: &'static str,
    muted: &'static str,
    font: &'static str,
    code_theme: &'static str,
    mesh: [&'static str; 4],
}

const PALETTES: [Palette; 4] = [
    Palette {
        id: "default",
        name: "Default",
        background: "#ffffff",
        text: "#1f2937",
        heading: "#111827",
        accent: "#2563eb",
        secondary: "#7c3aed",
        muted: "#6b7280",
        font: "Inter",
        code_theme: "InspiredGitHub",
        mesh: ["#eef2ff", "#a5b4fc", "#f9a8d4", "#67e8f9"],
    },
    Palette {
        id: "dark",
        name: "Dark",
        background: "#0f172a",
        text: "#e2e8f0",
        heading: "#f8fafc",
        accent: "#38bdf8",
        secondary: "#a78bfa",
        muted: "#94a3b8",
        font: "Inter",
        code_theme: "base16-ocean.dark",
        mesh: ["#0f172a", "#6366f1", "#ec4899", "#06b6d4"],
    },
    Palette {
        id: "paper",
        name: "Paper",
        background: "#fdf6e3",
        text: "#3c3836",
        heading: "#282828",
        accent: "#d65d0e",
        secondary: "#458588",
        muted: "#7c6f64",
        font: "Georgia",
        code_theme: "Solarized (light)",
        mesh: ["#fdf6e3", "#fabd2f", "#fe8019", "#83a598"],
    },
    Palette {
        id: "aurora",
        name: "Aurora",
        background: "mesh",
        text: "#f8fafc",
        heading: "#ffffff",
        accent: "#f472b6",
        secondary: "#22d3ee",
        muted: "#cbd5e1",
        font: "Inter",
        code_theme: "base16-eighties.dark",
        mesh: ["#1e1b4b", "#7c3aed", "#db2777", "#0891b2"],
    },
];

impl Theme {
    fn from_palette(p: &Palette) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.to_string(),
            background: p.background.to_string(),
            text_color: p.text.to_string(),
            heading_color: p.heading.to_string(),
            accent_color: p.accent.to_string(),
            secondary_color: p.secondary.to_string(),
            muted_color: p.muted.to_string(),
            font: p.font.to_string(),
            heading_font: p.font.to_string(),
            code_font: "JetBrains Mono".to_string(),
            code_theme: p.code_theme.to_string(),
            mesh_colors: p.mesh.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// A built-in theme by id.
    pub fn builtin(id: &str) -> Option<Self> {
        PALETTES
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id.trim()))
            .map(Self::from_palette)
    }

    /// A built-in theme by id, falling back to `default` for unknown ids.
    pub fn resolve(id: &str) -> Self {
        Self::builtin(id).unwrap_or_else(|| {
            log::warn!("Unknown theme '{}', using default", id);
            Self::default()
        })
    }

    /// Ids of the built-in themes.
    pub fn builtin_ids() -> Vec<&'static str> {
        PALETTES.iter().map(|p| p.id).collect()
    }

    /// Whether text should be drawn light-on-dark.
    pub fn is_dark(&self) -> bool {
        if self.background.starts_with("mesh") {
            return self.mesh_colors.first().map_or(true, |c| is_dark_color(c));
        }
        is_dark_color(&self.background)
    }

    /// Overlay brand colours and font.
    pub fn with_brand(&self, brand: &BrandConfig) -> Self {
        let mut theme = self.clone();
        if let Some(primary) = &brand.primary_color {
            theme.heading_color = primary.clone();
        }
        if let Some(secondary) = &brand.secondary_color {
            theme.secondary_color = secondary.clone();
        }
        if let Some(accent) = &brand.accent_color {
            theme.accent_color = accent.clone();
        }
        if let Some(font) = &brand.font {
            theme.font = font.clone();
            theme.heading_font = font.clone();
        }
        theme
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_palette(&PALETTES[0])
    }
}

const NAMED_COLORS: [(&str, &str); 12] = [
    ("black", "000000"),
    ("white", "FFFFFF"),
    ("red", "FF0000"),
    ("green", "008000"),
    ("blue", "0000FF"),
    ("yellow", "FFFF00"),
    ("orange", "FFA500"),
    ("purple", "800080"),
    ("gray", "808080"),
    ("grey", "808080"),
    ("navy", "000080"),
    ("teal", "008080"),
];

/// Normalise a CSS-style colour to upper-case `RRGGBB`.
///
/// Accepts `#rgb`, `#rrggbb`, bare hex and a handful of colour names.
pub fn normalize_hex(color: &str) -> Option<String> {
    let color = color.trim();
    if let Some((_, hex)) = NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(color))
    {
        return Some(hex.to_string());
    }
    let hex = color.strip_prefix('#').unwrap_or(color);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some(hex.chars().flat_map(|c| [c, c]).collect::<String>().to_uppercase()),
        6 => Some(hex.to_uppercase()),
        8 => Some(hex[..6].to_uppercase()),
        _ => None,
    }
}

/// Parse a colour into RGB components.
pub fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = normalize_hex(color)?;
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Whether a colour is dark enough to need light text. Unknown colours are light.
pub fn is_dark_color(color: &str) -> bool {
    match hex_rgb(color) {
        Some((r, g, b)) => {
            let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
            luma < 140.0
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(Theme::builtin("dark").unwrap().id, "dark");
        assert_eq!(Theme::builtin("DARK").unwrap().id, "dark");
        assert!(Theme::builtin("nope").is_none());
        assert_eq!(Theme::resolve("nope").id, "default");
        assert_eq!(Theme::builtin_ids().len(), 4);
    }

    #[test]
    fn test_is_dark() {
        assert!(!Theme::default().is_dark());
        assert!(Theme::resolve("dark").is_dark());
        assert!(Theme::resolve("aurora").is_dark());
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("#abc").as_deref(), Some("AABBCC"));
        assert_eq!(normalize_hex("ff0000").as_deref(), Some("FF0000"));
        assert_eq!(normalize_hex("White").as_deref(), Some("FFFFFF"));
        assert_eq!(normalize_hex("#12345678").as_deref(), Some("123456"));
        assert_eq!(normalize_hex("url(x.png)"), None);
        assert_eq!(hex_rgb("#010203"), Some((1, 2, 3)));
    }

    #[test]
    fn test_with_brand_overlays() {
        let brand = BrandConfig {
            primary_color: Some("#123456".to_string()),
            accent_color: Some("#ff0000".to_string()),
            font: Some("Lato".to_string()),
            ..Default::default()
        };
        let theme = Theme::default().with_brand(&brand);
        assert_eq!(theme.heading_color, "#123456");
        assert_eq!(theme.accent_color, "#ff0000");
        assert_eq!(theme.font, "Lato");
        assert_eq!(theme.text_color, Theme::default().text_color);
    }
}
