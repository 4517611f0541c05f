use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Persisted configuration: where mods live, where the game reads them from,
/// and which file extensions count as mods. All keys optional on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub mods_source_dir: String,
    #[serde(default)]
    pub game_mods_dir: String,
    /// Comma-separated, optional leading dots. Empty means "show all".
    #[serde(default)]
    pub mod_extensions: String,
}

impl ManagerConfig {
    pub fn load_or_create() -> Result<Self> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        if !path.exists() {
            let config = ManagerConfig::default();
            config.save_to(&path)?;
            return Ok(config);
        }
        Ok(Self::load_from(&path))
    }

    /// Never fails: an absent or unreadable file yields defaults so the tool
    /// stays usable with no prior state.
    pub fn load_from(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return ManagerConfig::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                debug!("ignoring unreadable config {:?}: {err}", path);
                ManagerConfig::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        self.save_to(&base_dir.join("config.json"))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, raw).context("write config")?;
        Ok(())
    }

    pub fn source_dir(&self) -> PathBuf {
        expand_user(&self.mods_source_dir)
    }

    pub fn dest_dir(&self) -> PathBuf {
        expand_user(&self.game_mods_dir)
    }

    pub fn extension_filter(&self) -> ExtensionFilter {
        ExtensionFilter::parse(&self.mod_extensions)
    }
}

/// Normalized extension set, parsed once per configuration use. `None` means
/// no filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter(Option<HashSet<String>>);

impl ExtensionFilter {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return ExtensionFilter(None);
        }
        let set: HashSet<String> = raw
            .split(',')
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .map(|part| {
                if part.starts_with('.') {
                    part
                } else {
                    format!(".{part}")
                }
            })
            .collect();
        if set.is_empty() {
            ExtensionFilter(None)
        } else {
            ExtensionFilter(Some(set))
        }
    }

    /// Applies to files only; the catalog always lets directories through.
    pub fn allows_file(&self, path: &Path) -> bool {
        let Some(set) = &self.0 else {
            return true;
        };
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .map_or(false, |ext| set.contains(&ext))
    }

    pub fn is_unfiltered(&self) -> bool {
        self.0.is_none()
    }
}

fn expand_user(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(raw)
}

pub fn data_dir() -> Result<PathBuf> {
    base_data_dir()
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("linksmith"))
}
