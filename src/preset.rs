use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::config;

/// Named, ordered sets of mod names, persisted as a single JSON mapping.
/// Member lists keep their saved order; duplicates are allowed and harmless.
#[derive(Debug, Default)]
pub struct PresetStore {
    path: PathBuf,
    presets: IndexMap<String, Vec<String>>,
}

impl PresetStore {
    pub fn load_or_create() -> Result<Self> {
        let base_dir = config::data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        Ok(Self::load_from(&base_dir.join("presets.json")))
    }

    /// An absent or unreadable file degrades to an empty store; only writes
    /// surface errors.
    pub fn load_from(path: &Path) -> Self {
        let presets = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(presets) => presets,
                Err(err) => {
                    debug!("ignoring unreadable presets {:?}: {err}", path);
                    IndexMap::new()
                }
            },
            Err(_) => IndexMap::new(),
        };
        PresetStore {
            path: path.to_path_buf(),
            presets,
        }
    }

    /// Overwrites any preset of the same name.
    pub fn save(&mut self, name: &str, members: Vec<String>) -> Result<()> {
        self.presets.insert(name.to_string(), members);
        self.persist()
    }

    /// Absent names are reported back, not treated as errors.
    pub fn delete(&mut self, names: &[String]) -> Result<(usize, Vec<String>)> {
        let mut removed = 0;
        let mut missing = Vec::new();
        for name in names {
            if self.presets.shift_remove(name).is_some() {
                removed += 1;
            } else {
                missing.push(name.clone());
            }
        }
        self.persist()?;
        Ok((removed, missing))
    }

    /// A preset that never existed reads the same as one with no members.
    pub fn get(&self, name: &str) -> Vec<String> {
        self.presets.get(name).cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.presets.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.presets).context("serialize presets")?;
        fs::write(&self.path, raw).context("write presets")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_file_is_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = PresetStore::load_from(&dir.path().join("presets.json"));
        assert!(store.is_empty());
        assert!(store.get("anything").is_empty());
    }

    #[test]
    fn corrupt_file_is_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        fs::write(&path, b"[1, 2,").unwrap();
        assert!(PresetStore::load_from(&path).is_empty());
    }

    #[test]
    fn save_then_get_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let mut store = PresetStore::load_from(&path);
        store
            .save("combat", vec!["b.esp".to_string(), "a.esp".to_string()])
            .unwrap();

        let reloaded = PresetStore::load_from(&path);
        assert_eq!(reloaded.get("combat"), ["b.esp", "a.esp"]);
    }

    #[test]
    fn save_overwrites_existing_preset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let mut store = PresetStore::load_from(&path);
        store.save("base", vec!["a.esp".to_string()]).unwrap();
        store.save("base", vec!["b.esp".to_string()]).unwrap();
        assert_eq!(store.get("base"), ["b.esp"]);
    }

    #[test]
    fn delete_counts_removed_and_reports_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let mut store = PresetStore::load_from(&path);
        store.save("keep", vec![]).unwrap();
        store.save("drop", vec![]).unwrap();

        let (removed, missing) = store
            .delete(&["drop".to_string(), "ghost".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(missing, ["ghost"]);
        assert!(store.contains("keep"));
        assert!(!store.contains("drop"));
    }

    #[test]
    fn listing_keeps_insertion_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let mut store = PresetStore::load_from(&path);
        store.save("zeta", vec![]).unwrap();
        store.save("alpha", vec![]).unwrap();

        let reloaded = PresetStore::load_from(&path);
        assert_eq!(reloaded.names(), ["zeta", "alpha"]);
    }
}
