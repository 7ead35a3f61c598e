//! The user-local chart repositories file
//!
//! Same format as helm's `repositories.yaml`, so both tools can share it.
//! Fields swctl does not know about are carried through a rewrite.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::paths;
use crate::error::Result;

/// One registered repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub url: String,
    /// Credentials, TLS files and the like
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RepoEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoFile {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub generated: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub repositories: Vec<RepoEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<RepoEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<RepoEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for RepoFile {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            generated: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            repositories: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl RepoFile {
    /// Load the file; a missing or empty file is an empty repository list
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No repository file at {}", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read repository file: {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let file = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse repository file: {}", path.display()))?;
        Ok(file)
    }

    /// Write the file atomically via a sibling temp file
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        paths::ensure_dir(parent)?;

        let yaml = serde_yaml::to_string(self).context("Failed to serialize repository file")?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .context("Failed to create temporary repository file")?;
        std::io::Write::write_all(&mut tmp, yaml.as_bytes())?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write repository file: {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RepoEntry> {
        self.repositories.iter().find(|r| r.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append an entry and refresh the `generated` stamp
    pub fn add(&mut self, entry: RepoEntry) {
        self.repositories.push(entry);
        self.generated = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
    }
}
