use crate::{
    config::ManagerConfig,
    linker::{classify_destination, DestState},
};
use serde::Serialize;
use std::{collections::HashSet, fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModKind {
    File,
    Directory,
}

impl ModKind {
    pub fn label(self) -> &'static str {
        match self {
            ModKind::File => "FILE",
            ModKind::Directory => "DIR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModState {
    NotInstalled,
    Installed,
    Broken,
}

/// One candidate mod, rebuilt from the filesystem on every discovery pass.
/// Source and destination are correlated by name equality only.
#[derive(Debug, Clone, Serialize)]
pub struct ModEntry {
    pub name: String,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub kind: ModKind,
    pub state: ModState,
}

impl ModEntry {
    pub fn is_present(&self) -> bool {
        self.state != ModState::NotInstalled
    }
}

/// Scans the immediate children of the source directory and derives each
/// entry's state from the destination tree. A missing source directory means
/// "nothing to show", not an error.
///
/// Leftover links in the destination whose source entry vanished are folded
/// in as Broken so cleanup can find them.
pub fn discover(config: &ManagerConfig) -> Vec<ModEntry> {
    let source_dir = config.source_dir();
    let dest_dir = config.dest_dir();
    let filter = config.extension_filter();

    // An unset or missing source directory means nothing to show, and the
    // destination is not scanned either.
    let Ok(read_dir) = fs::read_dir(&source_dir) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for dir_entry in read_dir.flatten() {
        let source_path = dir_entry.path();
        let kind = if source_path.is_dir() {
            ModKind::Directory
        } else if source_path.is_file() {
            ModKind::File
        } else {
            // Dangling links inside the source tree are not mods.
            continue;
        };
        if kind == ModKind::File && !filter.allows_file(&source_path) {
            continue;
        }
        let name = dir_entry.file_name().to_string_lossy().to_string();
        let dest_path = dest_dir.join(&name);
        let state = match classify_destination(&dest_path) {
            DestState::Absent => ModState::NotInstalled,
            DestState::Present | DestState::DanglingLink => {
                if source_path.exists() {
                    ModState::Installed
                } else {
                    ModState::Broken
                }
            }
        };
        entries.push(ModEntry {
            name,
            source_path,
            dest_path,
            kind,
            state,
        });
    }

    collect_orphaned_links(config, &mut entries);

    // Files first, then directories, case-insensitive within each group.
    // The order must stay stable across calls for pagination consistency.
    entries.sort_by(|a, b| {
        let a_key = (a.kind == ModKind::Directory, a.name.to_lowercase());
        let b_key = (b.kind == ModKind::Directory, b.name.to_lowercase());
        a_key.cmp(&b_key).then_with(|| a.name.cmp(&b.name))
    });
    debug!("discovered {} mod entries", entries.len());
    entries
}

/// Destination links whose name no longer exists in the source directory.
/// Only dangling link entries qualify; real files or directories a user put
/// in the game folder themselves are not candidate mods.
fn collect_orphaned_links(config: &ManagerConfig, entries: &mut Vec<ModEntry>) {
    let dest_dir = config.dest_dir();
    let source_dir = config.source_dir();
    let known: HashSet<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();

    let Ok(read_dir) = fs::read_dir(&dest_dir) else {
        return;
    };
    let mut orphans = Vec::new();
    for dir_entry in read_dir.flatten() {
        let dest_path = dir_entry.path();
        let name = dir_entry.file_name().to_string_lossy().to_string();
        if known.contains(name.as_str()) {
            continue;
        }
        if classify_destination(&dest_path) != DestState::DanglingLink {
            continue;
        }
        // The target is gone, so the original kind is unknowable; go by what
        // the link entry itself reports (junctions still read as directories).
        let kind = match fs::symlink_metadata(&dest_path) {
            Ok(meta) if meta.file_type().is_dir() => ModKind::Directory,
            _ => ModKind::File,
        };
        orphans.push(ModEntry {
            source_path: source_dir.join(&name),
            dest_path,
            name,
            kind,
            state: ModState::Broken,
        });
    }
    entries.append(&mut orphans);
}

pub fn list_installed(config: &ManagerConfig) -> Vec<ModEntry> {
    discover(config)
        .into_iter()
        .filter(ModEntry::is_present)
        .collect()
}

pub fn list_broken(config: &ManagerConfig) -> Vec<ModEntry> {
    discover(config)
        .into_iter()
        .filter(|entry| entry.state == ModState::Broken)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::create_link;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config(root: &Path, extensions: &str) -> ManagerConfig {
        let source = root.join("mods");
        let dest = root.join("game");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dest).unwrap();
        ManagerConfig {
            mods_source_dir: source.to_string_lossy().to_string(),
            game_mods_dir: dest.to_string_lossy().to_string(),
            mod_extensions: extensions.to_string(),
        }
    }

    #[test]
    fn absent_source_dir_yields_empty_list() {
        let dir = TempDir::new().unwrap();
        let config = ManagerConfig {
            mods_source_dir: dir
                .path()
                .join("does-not-exist")
                .to_string_lossy()
                .to_string(),
            game_mods_dir: dir.path().to_string_lossy().to_string(),
            mod_extensions: String::new(),
        };
        assert!(discover(&config).is_empty());
    }

    #[test]
    fn empty_source_dir_yields_empty_list() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "");
        assert!(discover(&config).is_empty());
    }

    #[test]
    fn files_sort_before_directories_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "");
        let source = config.source_dir();
        fs::create_dir_all(source.join("Zeta")).unwrap();
        fs::create_dir_all(source.join("alpha")).unwrap();
        fs::write(source.join("beta.esp"), b"").unwrap();
        fs::write(source.join("Apple.esp"), b"").unwrap();

        let names: Vec<String> = discover(&config)
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["Apple.esp", "beta.esp", "alpha", "Zeta"]);
    }

    #[test]
    fn filter_excludes_files_but_never_directories() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "esp");
        let source = config.source_dir();
        fs::write(source.join("x.esp"), b"").unwrap();
        fs::write(source.join("x.ESP"), b"").unwrap();
        fs::write(source.join("x.txt"), b"").unwrap();
        fs::create_dir_all(source.join("foo.bar")).unwrap();

        let mods = discover(&config);
        let names: Vec<&str> = mods.iter().map(|entry| entry.name.as_str()).collect();
        assert!(names.contains(&"x.esp"));
        assert!(names.contains(&"x.ESP"));
        assert!(names.contains(&"foo.bar"));
        assert!(!names.contains(&"x.txt"));
    }

    #[test]
    fn state_tracks_destination_entries() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "");
        let source = config.source_dir();
        fs::write(source.join("linked.esp"), b"").unwrap();
        fs::write(source.join("loose.esp"), b"").unwrap();
        create_link(&source.join("linked.esp"), &config.dest_dir().join("linked.esp")).unwrap();

        let mods = discover(&config);
        let state_of = |name: &str| {
            mods.iter()
                .find(|entry| entry.name == name)
                .map(|entry| entry.state)
                .unwrap()
        };
        assert_eq!(state_of("linked.esp"), ModState::Installed);
        assert_eq!(state_of("loose.esp"), ModState::NotInstalled);
    }

    #[cfg(unix)]
    #[test]
    fn deleted_source_shows_up_broken() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "esp");
        let source = config.source_dir();
        fs::create_dir_all(source.join("ModA")).unwrap();
        create_link(&source.join("ModA"), &config.dest_dir().join("ModA")).unwrap();
        fs::remove_dir_all(source.join("ModA")).unwrap();

        let mods = discover(&config);
        let moda = mods.iter().find(|entry| entry.name == "ModA").unwrap();
        assert_eq!(moda.state, ModState::Broken);
        assert_eq!(list_broken(&config).len(), 1);
    }

    #[test]
    fn real_destination_content_is_not_a_mod() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "");
        let dest = config.dest_dir();
        fs::create_dir_all(dest.join("HandPlaced")).unwrap();
        fs::write(dest.join("notes.txt"), b"mine").unwrap();

        assert!(discover(&config).is_empty());
    }

    #[test]
    fn list_installed_excludes_not_installed() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "");
        let source = config.source_dir();
        fs::write(source.join("a.esp"), b"").unwrap();
        fs::write(source.join("b.esp"), b"").unwrap();
        create_link(&source.join("a.esp"), &config.dest_dir().join("a.esp")).unwrap();

        let installed = list_installed(&config);
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].name, "a.esp");
    }
}
