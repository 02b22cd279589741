//! Client-side viewer preferences
//!
//! Stored as a small JSON object on disk. Missing or unreadable files fall
//! back to defaults; writes are explicit.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const MIN_FONT_SIZE: u32 = 75;
pub const MAX_FONT_SIZE: u32 = 150;
pub const DEFAULT_FONT_SIZE: u32 = 100;
const FONT_STEP: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Read,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Percentage of the base font size
    #[serde(rename = "viewer-font-size", default = "default_font_size")]
    pub font_size: u32,
    #[serde(rename = "view-mode", default)]
    pub view_mode: ViewMode,
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            view_mode: ViewMode::default(),
        }
    }
}

impl Preferences {
    pub fn increase_font(&mut self) -> u32 {
        self.font_size = self.font_size.saturating_add(FONT_STEP).min(MAX_FONT_SIZE);
        self.font_size
    }

    pub fn decrease_font(&mut self) -> u32 {
        self.font_size = self.font_size.saturating_sub(FONT_STEP).max(MIN_FONT_SIZE);
        self.font_size
    }

    /// CSS value applied to the document body
    pub fn font_size_css(&self) -> String {
        format!("{}%", self.font_size)
    }

    fn clamped(mut self) -> Self {
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self
    }
}

/// Preferences bound to a file
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    values: Preferences,
}

impl PreferenceStore {
    /// Read preferences from `path`, using defaults when the file is
    /// missing or malformed
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Preferences>(&bytes)
                .map(Preferences::clamped)
                .unwrap_or_else(|e| {
                    tracing::warn!("Ignoring malformed preferences {}: {}", path.display(), e);
                    Preferences::default()
                }),
            Err(e) => {
                tracing::debug!("No preferences at {}: {}", path.display(), e);
                Preferences::default()
            }
        };
        Self { path, values }
    }

    pub fn get(&self) -> &Preferences {
        &self.values
    }

    pub fn get_mut(&mut self) -> &mut Preferences {
        &mut self.values
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&self.values)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_font_steps_are_bounded() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.decrease_font(), 90);
        assert_eq!(prefs.decrease_font(), 80);
        assert_eq!(prefs.decrease_font(), 75);
        assert_eq!(prefs.decrease_font(), 75);

        for _ in 0..10 {
            prefs.increase_font();
        }
        assert_eq!(prefs.font_size, 150);
        assert_eq!(prefs.font_size_css(), "150%");

        // Values set directly never wrap
        prefs.font_size = u32::MAX;
        assert_eq!(prefs.increase_font(), 150);
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::load(dir.path().join("absent.json")).await;
        assert_eq!(store.get(), &Preferences::default());
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = PreferenceStore::load(&path).await;
        store.get_mut().increase_font();
        store.get_mut().view_mode = ViewMode::Edit;
        store.save().await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"viewer-font-size\": 110"));
        assert!(raw.contains("\"view-mode\": \"edit\""));

        let reloaded = PreferenceStore::load(&path).await;
        assert_eq!(reloaded.get().font_size, 110);
        assert_eq!(reloaded.get().view_mode, ViewMode::Edit);
    }

    #[tokio::test]
    async fn test_out_of_range_and_malformed_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        std::fs::write(&path, r#"{"viewer-font-size": 400}"#).unwrap();
        assert_eq!(PreferenceStore::load(&path).await.get().font_size, 150);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(PreferenceStore::load(&path).await.get(), &Preferences::default());
    }
}
