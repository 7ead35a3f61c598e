//! Manifest archive
//!
//! A read-only, path-indexed tree of YAML manifests. The tree compiled into
//! the binary ([`EmbeddedArchive`]) has this layout:
//!
//! ```text
//! crd/crd-NN.yaml
//! templates/template-NN.yaml
//! operator/operator-NN.yaml
//! infra/<nn-family>/...
//! infra-min/<nn-family>/...
//! ```
//!
//! [`DirArchive`] serves the same contract from a directory on disk.
//! Listings are always in lexicographic order, which is also the order
//! manifests are installed in.

mod dir;
mod embedded;

pub use dir::DirArchive;
pub use embedded::EmbeddedArchive;

use std::io::Read;

use crate::error::{Error, Result};
use crate::kube::ManifestObject;
use crate::kube::apply::parse_documents;

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full archive path without a leading slash
    pub path: String,
    /// Last path segment
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Read-only manifest tree
pub trait ManifestArchive: Send + Sync {
    /// Open a file for reading
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>>;

    /// Immediate children of a directory, sorted by name
    fn list(&self, dir: &str) -> Result<Vec<FileInfo>>;

    /// Every file below `dir`, depth first, in lexicographic order
    fn walk(&self, dir: &str) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in self.list(dir)? {
            if entry.is_dir {
                files.extend(self.walk(&entry.path)?);
            } else {
                files.push(entry.path);
            }
        }
        Ok(files)
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        let mut contents = String::new();
        self.open(path)?.read_to_string(&mut contents)?;
        Ok(contents)
    }

    /// Parse every object of a multi-document YAML file
    fn read_documents(&self, path: &str) -> Result<Vec<ManifestObject>> {
        let contents = self.read_to_string(path)?;
        parse_documents(&contents).map_err(|e| match e {
            Error::BadInput(message) => Error::BadInput(format!("{}: {}", path, message)),
            other => other,
        })
    }

    /// Every object of every file below `dir`, in install order
    fn objects_in(&self, dir: &str) -> Result<Vec<ManifestObject>> {
        let mut objects = Vec::new();
        for file in self.walk(dir)? {
            objects.extend(self.read_documents(&file)?);
        }
        Ok(objects)
    }
}

/// Normalize a POSIX-style archive path: no leading or trailing slash
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn not_found(path: &str) -> Error {
    Error::not_found("manifest", format!("/{}", normalize(path)))
}

/// Embedded archive, or the directory named by settings when present
pub fn archive_for(dir: Option<&std::path::Path>) -> Box<dyn ManifestArchive> {
    match dir {
        Some(dir) => {
            tracing::debug!("Using manifests from {}", dir.display());
            Box::new(DirArchive::new(dir))
        }
        None => Box::new(EmbeddedArchive),
    }
}
