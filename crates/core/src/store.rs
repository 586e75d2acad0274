//! Persisted editor state.
//!
//! A flat JSON object on disk with a fixed set of keys, mirroring the
//! browser key-value storage the editor uses. A missing or corrupt file
//! starts an empty store rather than failing.

use crate::brand::BrandConfig;
use crate::error::Result;
use crate::theme::Theme;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Keys under which editor state is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    Draft,
    NotesVisible,
    ThemeId,
    CustomTheme,
    Brand,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Draft => "draft",
            StateKey::NotesVisible => "notesVisible",
            StateKey::ThemeId => "themeId",
            StateKey::CustomTheme => "customTheme",
            StateKey::Brand => "brand",
        }
    }
}

/// Key-value state backed by an optional JSON file.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl StateStore {
    /// An in-memory store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<Value>(&json) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    log::warn!("Ignoring unreadable state file {}", path.display());
                    Map::new()
                }
            },
            Err(e) => {
                log::debug!("No state at {} ({}), starting empty", path.display(), e);
                Map::new()
            }
        };
        Self {
            path: Some(path),
            values,
        }
    }

    /// Read a value. Values of the wrong shape read as absent.
    pub fn get<T: DeserializeOwned>(&self, key: StateKey) -> Option<T> {
        let value = self.values.get(key.as_str())?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Ignoring stored '{}': {}", key.as_str(), e);
                None
            }
        }
    }

    /// Store a value and persist the store.
    pub fn set<T: Serialize>(&mut self, key: StateKey, value: &T) -> Result<()> {
        self.values
            .insert(key.as_str().to_string(), serde_json::to_value(value)?);
        self.persist()
    }

    pub fn remove(&mut self, key: StateKey) -> Result<()> {
        self.values.remove(key.as_str());
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }

    pub fn draft(&self) -> Option<String> {
        self.get(StateKey::Draft)
    }

    pub fn notes_visible(&self) -> bool {
        self.get(StateKey::NotesVisible).unwrap_or(false)
    }

    pub fn theme_id(&self) -> Option<String> {
        self.get(StateKey::ThemeId)
    }

    pub fn custom_theme(&self) -> Option<Theme> {
        self.get(StateKey::CustomTheme)
    }

    pub fn brand(&self) -> Option<BrandConfig> {
        self.get(StateKey::Brand)
    }

    /// The theme the editor should use: a custom theme, else the stored id,
    /// with brand overrides applied.
    pub fn active_theme(&self) -> Theme {
        let theme = self
            .custom_theme()
            .or_else(|| self.theme_id().map(|id| Theme::resolve(&id)))
            .unwrap_or_default();
        match self.brand() {
            Some(brand) => theme.with_brand(&brand),
            None => theme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_persist_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("editor.json");

        let mut store = StateStore::open(&path);
        assert!(store.draft().is_none());
        store.set(StateKey::Draft, &"# Hello").unwrap();
        store.set(StateKey::NotesVisible, &true).unwrap();
        store.set(StateKey::ThemeId, &"dark").unwrap();

        let reopened = StateStore::open(&path);
        assert_eq!(reopened.draft().as_deref(), Some("# Hello"));
        assert!(reopened.notes_visible());
        assert_eq!(reopened.active_theme().id, "dark");

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["notesVisible"], true);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("editor.json");
        fs::write(&path, "{not json").unwrap();
        let store = StateStore::open(&path);
        assert!(store.theme_id().is_none());
        assert!(!store.notes_visible());
    }

    #[test]
    fn test_brand_applies_to_active_theme() {
        let mut store = StateStore::in_memory();
        let brand = BrandConfig {
            accent_color: Some("#abcdef".to_string()),
            ..Default::default()
        };
        store.set(StateKey::Brand, &brand).unwrap();
        assert_eq!(store.brand(), Some(brand));
        assert_eq!(store.active_theme().accent_color, "#abcdef");

        store.remove(StateKey::Brand).unwrap();
        assert_eq!(store.active_theme(), Theme::default());
    }

    #[test]
    fn test_wrong_shape_reads_as_absent() {
        let mut store = StateStore::in_memory();
        store.set(StateKey::NotesVisible, &"yes").unwrap();
        assert!(!store.notes_visible());
    }
}
