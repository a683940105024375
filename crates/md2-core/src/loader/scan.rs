//! Library directory listing

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{LoadError, LoadResult};

/// Clip file extensions the loader can decode
const CLIP_EXTENSIONS: &[&str] = &["wav"];

/// Immediate contents of one library directory, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryScan {
    pub root: PathBuf,
    pub directories: Vec<PathBuf>,
    pub clips: Vec<PathBuf>,
}

impl LibraryScan {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.clips.is_empty()
    }
}

fn is_clip(path: &Path) -> bool {
    path.extension()
        .map(|ext| CLIP_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// List sub-directories and clip files directly under `root`
///
/// Hidden entries are skipped. Unreadable entries are logged and skipped;
/// only a failure to read `root` itself is an error.
pub fn scan_directory(root: &Path) -> LoadResult<LibraryScan> {
    if !root.is_dir() {
        return Err(LoadError::NotADirectory(root.to_owned()));
    }

    let mut scan = LibraryScan {
        root: root.to_owned(),
        ..LibraryScan::default()
    };

    let entries = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(LoadError::Walk {
                    path: root.to_owned(),
                    source: e,
                })
            }
            Err(e) => {
                log::warn!("Skipping unreadable entry in {:?}: {}", root, e);
                continue;
            }
        };

        if is_hidden(&entry) {
            continue;
        }
        if entry.file_type().is_dir() {
            scan.directories.push(entry.into_path());
        } else if is_clip(entry.path()) {
            scan.clips.push(entry.into_path());
        }
    }

    log::debug!(
        "Scanned {:?}: {} directories, {} clips",
        root,
        scan.directories.len(),
        scan.clips.len()
    );
    Ok(scan)
}
