//! Brand configuration: colours, font and logo placement applied over a theme.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where the brand logo sits on each slide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
    None,
}

/// Standalone brand file, `{primaryColor, secondaryColor, accentColor, font, logoPosition}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrandConfig {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub font: Option<String>,
    pub logo_position: LogoPosition,
}

impl BrandConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a brand file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded brand configuration from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// True when no field would change a theme.
    pub fn is_empty(&self) -> bool {
        self.primary_color.is_none()
            && self.secondary_color.is_none()
            && self.accent_color.is_none()
            && self.font.is_none()
    }
}
