use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Failure modes of single-entry link operations. Batch callers treat these
/// as per-item data, not control flow.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("target already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("source not found: {0}")]
    SourceMissing(PathBuf),
    #[error("already removed")]
    AlreadyRemoved,
    #[error("not a link or not empty")]
    NotALinkOrNotEmpty,
    #[error("{0}")]
    LinkFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestState {
    Absent,
    Present,
    DanglingLink,
}

/// Single implementation of the existence probe used for state derivation.
/// A dangling link counts as occupying the destination.
pub fn classify_destination(path: &Path) -> DestState {
    if path.exists() {
        return DestState::Present;
    }
    // exists() follows links; an entry that still answers symlink_metadata
    // is a link whose target is gone.
    if fs::symlink_metadata(path).is_ok() {
        return DestState::DanglingLink;
    }
    DestState::Absent
}

/// Creates a link at `dest` resolving to `source`. Directories get a
/// directory-level link (symlink/junction), files a file-level one. Does not
/// recurse into the source tree.
pub fn create_link(source: &Path, dest: &Path) -> Result<(), LinkError> {
    if classify_destination(dest) != DestState::Absent {
        return Err(LinkError::AlreadyExists(dest.to_path_buf()));
    }
    if !source.exists() {
        return Err(LinkError::SourceMissing(source.to_path_buf()));
    }
    platform_link(source, dest).map_err(|err| LinkError::LinkFailed(err.to_string()))
}

#[cfg(unix)]
fn platform_link(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
fn platform_link(source: &Path, dest: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        junction::create(source, dest)
    } else {
        fs::hard_link(source, dest)
    }
}

/// Removes the single entry at `dest`. A real directory only ever gets an
/// empty-directory removal, so content a user placed in the game folder by
/// hand survives with its files intact.
pub fn remove_link(dest: &Path) -> Result<(), LinkError> {
    let meta = match fs::symlink_metadata(dest) {
        Ok(meta) => meta,
        Err(_) => return Err(LinkError::AlreadyRemoved),
    };

    if meta.file_type().is_dir() {
        // Covers real directories and, on Windows, junctions. remove_dir
        // detaches a junction without touching its target and refuses a
        // non-empty real directory.
        return fs::remove_dir(dest).map_err(|_| LinkError::NotALinkOrNotEmpty);
    }

    fs::remove_file(dest).map_err(|err| LinkError::LinkFailed(err.to_string()))
}
