//! Chart repository manager
//!
//! Registers the platform's chart repository in the user-local
//! repositories file, keeps cached indices fresh and fetches chart archives.
//! Writers of the repositories file serialize on [`RepoLock`]; readers
//! never lock.

pub mod file;
pub mod index;
pub mod lock;

pub use file::{RepoEntry, RepoFile};
pub use index::{ChartVersion, IndexFile};
pub use lock::RepoLock;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tokio::task::JoinSet;
use url::Url;

use crate::config::{Settings, paths};
use crate::constants::DOWNLOAD_TIMEOUT;
use crate::error::{Error, Result};

/// Outcome of [`RepoManager::ensure_repo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Added,
    AlreadyPresent,
}

/// Per-repository result of an index refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoUpdate {
    pub name: String,
    pub error: Option<String>,
}

impl RepoUpdate {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct RepoManager {
    config_path: PathBuf,
    cache_dir: PathBuf,
    http: reqwest::Client,
}

impl RepoManager {
    pub fn new(config_path: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("swctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            config_path: config_path.into(),
            cache_dir: cache_dir.into(),
            http,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.repository_config(), settings.repository_cache())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Cached index location for a repository
    pub fn index_path(&self, name: &str) -> PathBuf {
        index_path(&self.cache_dir, name)
    }

    /// Register `name` unless already present
    ///
    /// The entry is only persisted once its index downloaded successfully.
    pub async fn ensure_repo(&self, name: &str, url: &str) -> Result<EnsureOutcome> {
        let _lock = RepoLock::acquire_for(&self.config_path).await?;

        let mut repos = RepoFile::load(&self.config_path)?;
        if repos.has(name) {
            tracing::debug!("Repository '{}' already registered", name);
            return Ok(EnsureOutcome::AlreadyPresent);
        }

        download_index(&self.http, &self.cache_dir, name, url)
            .await
            .map_err(|e| match e {
                Error::Timeout(_) => e,
                other => Error::Other(anyhow::anyhow!(
                    "looks like \"{}\" is not a valid chart repository or cannot be reached: {}",
                    url,
                    other
                )),
            })?;

        repos.add(RepoEntry::new(name, url));
        repos.save(&self.config_path)?;
        tracing::info!("\"{}\" has been added to your repositories", name);
        Ok(EnsureOutcome::Added)
    }

    /// Refresh every registered index in parallel
    ///
    /// A failing repository is reported in its [`RepoUpdate`], the rest of
    /// the batch still runs.
    pub async fn update_all_repos(&self) -> Result<Vec<RepoUpdate>> {
        let repos = RepoFile::load(&self.config_path)?;
        let mut tasks = JoinSet::new();
        for (slot, entry) in repos.repositories.into_iter().enumerate() {
            let http = self.http.clone();
            let cache_dir = self.cache_dir.clone();
            tasks.spawn(async move {
                let result = download_index(&http, &cache_dir, &entry.name, &entry.url).await;
                (slot, entry.name, result)
            });
        }

        let mut updates: Vec<(usize, RepoUpdate)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (slot, name, result) = joined.context("Repository update task failed")?;
            let error = match result {
                Ok(()) => {
                    tracing::info!("Successfully got an update from the \"{}\" chart repository", name);
                    None
                }
                Err(e) => {
                    tracing::warn!("Unable to get an update from the \"{}\" chart repository: {}", name, e);
                    Some(e.to_string())
                }
            };
            updates.push((slot, RepoUpdate { name, error }));
        }
        updates.sort_by_key(|(slot, _)| *slot);
        Ok(updates.into_iter().map(|(_, update)| update).collect())
    }

    /// Download a chart archive into the cache and return its path
    pub async fn resolve_chart(&self, repo: &str, chart: &str, version: Option<&str>) -> Result<PathBuf> {
        let repos = RepoFile::load(&self.config_path)?;
        let entry = repos
            .get(repo)
            .ok_or_else(|| Error::not_found("chart repository", repo))?;

        let index_file = self.index_path(repo);
        if !index_file.exists() {
            download_index(&self.http, &self.cache_dir, repo, &entry.url).await?;
        }
        let index = IndexFile::load(&index_file)?;
        let found = index.find(chart, version)?;
        let chart_url = found.urls.first().ok_or_else(|| {
            Error::Other(anyhow::anyhow!(
                "chart {}-{} has no download URL",
                chart,
                found.version
            ))
        })?;

        let target = self
            .cache_dir
            .join(format!("{}-{}.tgz", found.name, found.version));
        if target.exists() {
            tracing::debug!("Using cached chart {}", target.display());
            return Ok(target);
        }

        let url = resolve_chart_url(&entry.url, chart_url)?;
        tracing::debug!("Downloading chart from {}", url);
        let bytes = fetch(&self.http, url.as_str()).await?;
        write_atomic(&target, &bytes)?;
        Ok(target)
    }
}

pub fn index_path(cache_dir: &Path, name: &str) -> PathBuf {
    cache_dir.join(format!("{}-index.yaml", name))
}

/// Resolve a chart URL from an index against its repository URL
pub fn resolve_chart_url(repo_url: &str, chart_url: &str) -> Result<Url> {
    let base = Url::parse(&format!("{}/", repo_url.trim_end_matches('/')))
        .with_context(|| format!("Invalid repository URL: {}", repo_url))?;
    let url = base
        .join(chart_url)
        .with_context(|| format!("Invalid chart URL: {}", chart_url))?;
    Ok(url)
}

async fn fetch(http: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let map = |e: reqwest::Error| {
        if e.is_timeout() {
            Error::Timeout(format!("downloading {}", url))
        } else {
            Error::Other(anyhow::Error::new(e).context(format!("Failed to download {}", url)))
        }
    };
    let response = http
        .get(url)
        .send()
        .await
        .map_err(map)?
        .error_for_status()
        .map_err(map)?;
    Ok(response.bytes().await.map_err(map)?.to_vec())
}

async fn download_index(http: &reqwest::Client, cache_dir: &Path, name: &str, url: &str) -> Result<()> {
    let index_url = format!("{}/index.yaml", url.trim_end_matches('/'));
    tracing::debug!("Fetching index for '{}' from {}", name, index_url);
    let bytes = fetch(http, &index_url).await?;

    let contents = String::from_utf8_lossy(&bytes);
    IndexFile::parse(&contents)?;

    paths::ensure_dir(cache_dir)?;
    write_atomic(&index_path(cache_dir, name), &bytes)
}

fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    paths::ensure_dir(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.persist(target)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}
