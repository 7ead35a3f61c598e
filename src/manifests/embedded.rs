//! Manifests compiled into the binary

use std::collections::BTreeMap;
use std::io::Read;

use super::{FileInfo, ManifestArchive, normalize, not_found};
use crate::error::Result;

mod index {
    include!(concat!(env!("OUT_DIR"), "/manifest_index.rs"));
}

/// The archive bundled at build time
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedArchive;

impl EmbeddedArchive {
    fn lookup(path: &str) -> Option<&'static [u8]> {
        let path = normalize(path);
        index::ENTRIES
            .binary_search_by(|(key, _)| (*key).cmp(path.as_str()))
            .ok()
            .map(|i| index::ENTRIES[i].1)
    }

    /// Number of bundled files
    pub fn len(&self) -> usize {
        index::ENTRIES.len()
    }

    pub fn is_empty(&self) -> bool {
        index::ENTRIES.is_empty()
    }
}

impl ManifestArchive for EmbeddedArchive {
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>> {
        Self::lookup(path)
            .map(|bytes| Box::new(bytes) as Box<dyn Read>)
            .ok_or_else(|| not_found(path))
    }

    fn list(&self, dir: &str) -> Result<Vec<FileInfo>> {
        let dir = normalize(dir);
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut children: BTreeMap<String, FileInfo> = BTreeMap::new();
        for (key, bytes) in index::ENTRIES {
            let Some(rest) = key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let (name, is_dir) = match rest.split_once('/') {
                Some((first, _)) => (first, true),
                None => (rest, false),
            };
            children.entry(name.to_string()).or_insert_with(|| FileInfo {
                path: format!("{}{}", prefix, name),
                name: name.to_string(),
                is_dir,
                size: if is_dir { 0 } else { bytes.len() as u64 },
            });
        }

        if children.is_empty() {
            return Err(not_found(&dir));
        }
        Ok(children.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_sorted() {
        let keys: Vec<&str> = index::ENTRIES.iter().map(|(k, _)| *k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_top_level_layout() {
        let names: Vec<String> = EmbeddedArchive
            .list("/")
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["crd", "infra", "infra-min", "operator", "templates"]);
    }

    #[test]
    fn test_open_missing() {
        assert!(EmbeddedArchive.open("/crd/nope.yaml").err().unwrap().is_not_found());
        assert!(EmbeddedArchive.list("/nope").unwrap_err().is_not_found());
    }
}
