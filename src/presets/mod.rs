//! Saved request presets
//!
//! A preset is a named, reusable scrape configuration persisted as a JSON
//! array on disk. The store is deliberately forgiving on load: a missing or
//! malformed file reads as an empty collection, and entries without an id
//! or name are dropped rather than failing the whole file.

use crate::config::{ScrapeRequest, SelectorKind};
use crate::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Hex characters of the name digest kept as a generated preset id
const ID_LEN: usize = 12;

/// One saved scrape configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Preset {
    /// Stable identifier, generated from the name when absent
    #[serde(default)]
    pub id: String,

    /// Human-readable name, unique within a store
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,

    #[serde(default = "default_respect_robots")]
    pub respect_robots: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url_attribute: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_image_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_image_attribute: Option<String>,
}

fn default_respect_robots() -> bool {
    true
}

impl Preset {
    /// Builds the scrape request this preset describes
    pub fn to_request(&self) -> ScrapeRequest {
        let mut request = ScrapeRequest::new(&self.url, &self.selector);
        request.selector_kind = SelectorKind::Css;
        request.attribute = self.attribute.clone();
        request.identity = self.identity.clone();
        request.max_items = self.max_items;
        request.next_selector = self.next_selector.clone();
        request.max_pages = self.max_pages;
        request.respect_robots = self.respect_robots;
        request.detail_url_selector = self.detail_url_selector.clone();
        if let Some(attr) = &self.detail_url_attribute {
            request.detail_url_attribute = attr.clone();
        }
        request.detail_image_selector = self.detail_image_selector.clone();
        if let Some(attr) = &self.detail_image_attribute {
            request.detail_image_attribute = attr.clone();
        }
        request
    }
}

/// JSON-file-backed preset collection
pub struct PresetStore {
    path: PathBuf,
}

impl PresetStore {
    /// Opens a store at the given path; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every valid preset
    ///
    /// A missing or unreadable file and malformed JSON both read as empty.
    /// Entries missing an id or a name are silently dropped.
    pub fn load(&self) -> Vec<Preset> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        let presets: Vec<Preset> = match serde_json::from_str(&content) {
            Ok(presets) => presets,
            Err(e) => {
                tracing::warn!("preset file {} is malformed: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        presets
            .into_iter()
            .filter(|p| !p.id.is_empty() && !p.name.is_empty())
            .collect()
    }

    /// Inserts a preset, or replaces the existing one with the same id
    ///
    /// A preset arriving without an id gets one derived from its name, so
    /// saving the same name twice updates in place.
    ///
    /// # Returns
    ///
    /// * The stored preset, with its id filled in.
    pub fn save(&self, mut preset: Preset) -> Result<Preset> {
        if preset.id.is_empty() {
            preset.id = preset_id(&preset.name);
        }
        let mut presets = self.load();
        match presets.iter_mut().find(|p| p.id == preset.id) {
            Some(existing) => *existing = preset.clone(),
            None => presets.push(preset.clone()),
        }
        self.persist(&presets)?;
        Ok(preset)
    }

    /// Removes the preset with the given id
    ///
    /// # Returns
    ///
    /// * `true` if a preset was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut presets = self.load();
        let before = presets.len();
        presets.retain(|p| p.id != id);
        if presets.len() == before {
            return Ok(false);
        }
        self.persist(&presets)?;
        Ok(true)
    }

    fn persist(&self, presets: &[Preset]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(presets)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Derives a stable id from a preset name
fn preset_id(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(digest)[..ID_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset(name: &str) -> Preset {
        Preset {
            name: name.to_string(),
            url: "https://a.test/list".to_string(),
            selector: ".item".to_string(),
            respect_robots: true,
            ..Preset::default()
        }
    }

    fn temp_store() -> (tempfile::TempDir, PresetStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path().join("presets.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let (_dir, store) = temp_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_assigns_stable_id() {
        let (_dir, store) = temp_store();
        let saved = store.save(preset("news")).unwrap();
        assert_eq!(saved.id.len(), ID_LEN);
        assert_eq!(saved.id, preset_id("news"));
        assert!(saved.id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_save_same_name_updates_in_place() {
        let (_dir, store) = temp_store();
        store.save(preset("news")).unwrap();
        let mut updated = preset("news");
        updated.selector = ".headline".to_string();
        store.save(updated).unwrap();

        let presets = store.load();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].selector, ".headline");
    }

    #[test]
    fn test_save_distinct_names_accumulate() {
        let (_dir, store) = temp_store();
        store.save(preset("news")).unwrap();
        store.save(preset("shop")).unwrap();
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn test_delete_existing() {
        let (_dir, store) = temp_store();
        let saved = store.save(preset("news")).unwrap();
        assert!(store.delete(&saved.id).unwrap());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_delete_unknown_id() {
        let (_dir, store) = temp_store();
        store.save(preset("news")).unwrap();
        assert!(!store.delete("ffffffffffff").unwrap());
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_entries_without_name_dropped() {
        let (_dir, store) = temp_store();
        let raw = r#"[
            {"id": "abc123abc123", "name": "kept", "url": "https://a.test", "selector": "div"},
            {"id": "", "name": "no-id", "url": "https://a.test", "selector": "div"},
            {"id": "def456def456", "name": "", "url": "https://a.test", "selector": "div"}
        ]"#;
        std::fs::write(store.path(), raw).unwrap();
        let presets = store.load();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].name, "kept");
    }

    #[test]
    fn test_to_request_carries_fields() {
        let mut p = preset("news");
        p.max_items = Some(10);
        p.next_selector = Some("a.next".to_string());
        p.detail_image_selector = Some("img.hero".to_string());
        p.detail_image_attribute = Some("data-src".to_string());
        p.respect_robots = false;

        let request = p.to_request();
        assert_eq!(request.url, "https://a.test/list");
        assert_eq!(request.selector, ".item");
        assert_eq!(request.max_items, Some(10));
        assert!(request.is_paginated());
        assert!(request.wants_enrichment());
        assert!(!request.respect_robots);
        assert_eq!(request.detail_image_attribute, "data-src");
    }
}
