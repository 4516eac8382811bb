//! Directory enumerator: list the granted folder, drop sub-folders, sort newest first.

use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::media::{Locator, MediaEntry, MIME_TYPE_DIR, UNNAMED};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("folder not found: {0}")]
    NotFound(PathBuf),

    #[error("not a folder: {0}")]
    NotADirectory(PathBuf),

    #[error("listing {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
            _ => ScanError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// One row of a folder listing, as the document provider reports it.
#[derive(Clone, Debug)]
pub struct ChildDoc {
    pub locator: Locator,
    pub display_name: Option<String>,
    pub last_modified: i64,
    pub mime: Option<String>,
}

impl ChildDoc {
    pub fn is_dir(&self) -> bool {
        self.mime.as_deref() == Some(MIME_TYPE_DIR)
    }
}

/// "List children of folder" capability.
pub trait FolderSource {
    /// Direct children only, in provider order.
    fn list_children(&self) -> Result<Vec<ChildDoc>, ScanError>;
}

/// A granted folder on the local filesystem.
pub struct FsFolder {
    root: PathBuf,
}

impl FsFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsFolder { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FolderSource for FsFolder {
    fn list_children(&self) -> Result<Vec<ChildDoc>, ScanError> {
        let meta = std::fs::metadata(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let mut children = Vec::new();
        let walk = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);
        for item in walk {
            let entry = match item {
                Ok(e) => e,
                Err(e) if e.depth() == 0 => {
                    let err = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk failed"));
                    return Err(ScanError::from_io(&self.root, err));
                }
                Err(e) => {
                    warn!("scan: skipping unreadable child: {}", e);
                    continue;
                }
            };

            // Entry may have vanished between readdir and stat. Symlinks report
            // their target.
            let fmeta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("scan: skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let last_modified = fmeta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);

            let mime = if fmeta.is_dir() {
                Some(MIME_TYPE_DIR.to_string())
            } else {
                mime_guess::from_path(entry.path())
                    .first_raw()
                    .map(str::to_string)
            };

            children.push(ChildDoc {
                locator: Locator::new(entry.path()),
                display_name: entry.file_name().to_str().map(str::to_string),
                last_modified,
                mime,
            });
        }
        Ok(children)
    }
}

/// List the folder, drop sub-folders, and sort newest first.
///
/// Every call re-lists from scratch. Ties keep provider order.
pub fn enumerate(source: &dyn FolderSource) -> Result<Vec<MediaEntry>, ScanError> {
    let children = source.list_children()?;
    let total = children.len();

    let mut entries: Vec<MediaEntry> = children
        .into_iter()
        .filter(|c| !c.is_dir())
        .map(|c| MediaEntry {
            locator: c.locator,
            display_name: c.display_name.unwrap_or_else(|| UNNAMED.to_string()),
            last_modified: c.last_modified,
            mime: c.mime,
        })
        .collect();

    entries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    debug!("scan: {} children, {} files", total, entries.len());
    Ok(entries)
}
