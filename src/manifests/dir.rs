//! Manifests served from a directory on disk

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{FileInfo, ManifestArchive, normalize, not_found};
use crate::error::Result;

/// Archive rooted at a real directory
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let normalized = normalize(path);
        normalized
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != "..")
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

impl ManifestArchive for DirArchive {
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(not_found(path));
        }
        Ok(Box::new(fs::File::open(full)?))
    }

    fn list(&self, dir: &str) -> Result<Vec<FileInfo>> {
        let full = self.resolve(dir);
        if !full.is_dir() {
            return Err(not_found(dir));
        }

        let base = normalize(dir);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&full)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = if base.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", base, name)
            };
            entries.push(FileInfo {
                path,
                name,
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
