//! `Chart.yaml` contents

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub description: String,
    /// `application`, `library`, or empty
    #[serde(default, rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl ChartMetadata {
    pub fn parse(contents: &str) -> Result<Self> {
        let metadata = serde_yaml::from_str(contents).context("Failed to parse Chart.yaml")?;
        Ok(metadata)
    }
}
