//! Helm charts
//!
//! [`Chart`] reads chart metadata and bundled sub-charts from a packaged
//! `.tgz` or a chart directory. Installing, uninstalling and dependency
//! updates go through the [`ChartDriver`] trait.

pub mod driver;
pub mod metadata;

pub use driver::{ChartDriver, HelmCli, InstallRequest, ReleaseInfo};
#[cfg(test)]
pub use driver::MockChartDriver;
pub use metadata::{ChartMetadata, Dependency};

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use flate2::read::GzDecoder;

use crate::error::{Error, Result};

/// A loaded chart: metadata plus the names of bundled sub-charts
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub path: PathBuf,
    pub metadata: ChartMetadata,
    pub subcharts: Vec<String>,
}

impl Chart {
    /// Load a chart from a `.tgz` archive or a directory
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            let file = File::open(path)
                .with_context(|| format!("Failed to open chart {}", path.display()))?;
            let (metadata, subcharts) = read_archive(file)
                .with_context(|| format!("Failed to read chart archive {}", path.display()))?;
            Ok(Self {
                path: path.to_path_buf(),
                metadata,
                subcharts,
            })
        }
    }

    fn load_dir(path: &Path) -> Result<Self> {
        let chart_yaml = path.join("Chart.yaml");
        let contents = std::fs::read_to_string(&chart_yaml)
            .with_context(|| format!("Failed to read {}", chart_yaml.display()))?;
        let metadata = ChartMetadata::parse(&contents)?;

        let mut subcharts = Vec::new();
        let charts_dir = path.join("charts");
        if charts_dir.is_dir() {
            for entry in std::fs::read_dir(&charts_dir)? {
                let sub = entry?.path();
                if sub.is_dir() {
                    let contents = std::fs::read_to_string(sub.join("Chart.yaml"))?;
                    subcharts.push(ChartMetadata::parse(&contents)?.name);
                } else if sub.extension().is_some_and(|ext| ext == "tgz") {
                    let (meta, _) = read_archive(File::open(&sub)?)?;
                    subcharts.push(meta.name);
                }
            }
        }
        subcharts.sort();

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            subcharts,
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Only application charts can be installed
    pub fn validate_installable(&self) -> Result<()> {
        match self.metadata.chart_type.as_str() {
            "" | "application" => Ok(()),
            other => Err(Error::ChartIncompatible {
                chart: self.metadata.name.clone(),
                reason: format!("{} charts are not installable", other),
            }),
        }
    }

    /// Declared dependencies with no matching bundled sub-chart
    pub fn missing_dependencies(&self) -> Vec<String> {
        self.metadata
            .dependencies
            .iter()
            .filter(|dep| {
                !self
                    .subcharts
                    .iter()
                    .any(|sub| sub == &dep.name || dep.alias.as_deref() == Some(sub.as_str()))
            })
            .map(|dep| dep.name.clone())
            .collect()
    }

    /// Unpack a packaged chart under `dest`, returning the chart directory
    pub fn unpack(&self, dest: &Path) -> Result<PathBuf> {
        if self.path.is_dir() {
            return Ok(self.path.clone());
        }
        let file = File::open(&self.path)?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .unpack(dest)
            .with_context(|| format!("Failed to unpack chart {}", self.path.display()))?;
        Ok(dest.join(&self.metadata.name))
    }
}

/// Read `<chart>/Chart.yaml` and bundled `<chart>/charts/*` from a gzipped tar
fn read_archive(reader: impl Read) -> anyhow::Result<(ChartMetadata, Vec<String>)> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut metadata = None;
    let mut subcharts = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        match parts.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            [_, "Chart.yaml"] => {
                let mut contents = String::new();
                entry.read_to_string(&mut contents)?;
                metadata = Some(ChartMetadata::parse(&contents)?);
            }
            [_, "charts", sub, "Chart.yaml"] => {
                let mut contents = String::new();
                entry.read_to_string(&mut contents)?;
                let name = ChartMetadata::parse(&contents)
                    .map(|m| m.name)
                    .unwrap_or_else(|_| sub.to_string());
                subcharts.push(name);
            }
            [_, "charts", file] if file.ends_with(".tgz") => {
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes)?;
                let (meta, _) = read_archive(bytes.as_slice())?;
                subcharts.push(meta.name);
            }
            _ => {}
        }
    }

    let metadata = metadata.ok_or_else(|| anyhow::anyhow!("Chart.yaml file is missing"))?;
    subcharts.sort();
    subcharts.dedup();
    Ok((metadata, subcharts))
}

#[cfg(test)]
pub(crate) mod testing {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    /// Build a gzipped chart archive from `(path, contents)` pairs
    pub fn chart_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }
}
