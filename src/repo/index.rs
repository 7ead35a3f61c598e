//! Chart repository index (`index.yaml`)

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One published version of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

impl IndexFile {
    pub fn parse(contents: &str) -> Result<Self> {
        let index: IndexFile =
            serde_yaml::from_str(contents).context("Failed to parse repository index")?;
        if index.api_version.is_empty() {
            return Err(Error::Other(anyhow::anyhow!(
                "repository index has no apiVersion"
            )));
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read repository index: {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Find a chart version; without a version the first (newest) listed wins
    pub fn find(&self, chart: &str, version: Option<&str>) -> Result<&ChartVersion> {
        let versions = self
            .entries
            .get(chart)
            .ok_or_else(|| Error::not_found("chart", chart))?;
        let found = match version {
            Some(version) => versions.iter().find(|v| v.version == version),
            None => versions.first(),
        };
        found.ok_or_else(|| {
            Error::not_found(
                "chart version",
                format!("{}-{}", chart, version.unwrap_or("latest")),
            )
        })
    }
}
