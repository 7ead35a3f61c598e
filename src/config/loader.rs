//! Settings loading and merging logic
//!
//! Precedence order (highest to lowest):
//! 1. Environment variable overrides
//! 2. `~/.swctl/config.yaml`
//! 3. Built-in defaults

use super::{paths, schema::Settings};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Settings loader
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from the process environment
    pub fn load() -> Result<Settings> {
        Self::load_with(&|key| std::env::var(key).ok())
    }

    /// Load settings with an explicit environment lookup
    pub fn load_with(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Settings> {
        let config_path = Self::config_path(lookup);
        let settings = if config_path.exists() {
            Self::load_file(&config_path)?
        } else {
            Settings::default()
        };
        Ok(Self::apply_env_overrides(settings, lookup))
    }

    /// Location of the settings file
    pub fn config_path(lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
        paths::swctl_home(lookup).join("config.yaml")
    }

    /// Load settings from a file
    pub fn load_file(path: &Path) -> Result<Settings> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        mut settings: Settings,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Settings {
        if let Some(namespace) = lookup("SWCTL_NAMESPACE").filter(|v| !v.is_empty()) {
            settings.namespace = namespace;
        }
        if let Some(context) = lookup("SWCTL_KUBECONTEXT").filter(|v| !v.is_empty()) {
            settings.kube_context = Some(context);
        }
        if let Some(token) = lookup("SWCTL_KUBETOKEN").filter(|v| !v.is_empty()) {
            settings.kube_token = Some(token);
        }
        if let Some(server) = lookup("SWCTL_KUBEAPISERVER").filter(|v| !v.is_empty()) {
            settings.kube_api_server = Some(server);
        }
        if let Some(debug) = lookup("SWCTL_DEBUG") {
            if let Ok(val) = debug.parse::<bool>() {
                settings.debug = val;
            }
        }
        if let Some(driver) = lookup("HELM_DRIVER").filter(|v| !v.is_empty()) {
            settings.helm.driver = driver;
        }
        if let Some(namespace) = lookup("HELM_NAMESPACE").filter(|v| !v.is_empty()) {
            settings.helm.namespace = namespace;
        }
        if let Some(bin) = lookup("SWCTL_HELM_BIN").filter(|v| !v.is_empty()) {
            settings.helm.bin = bin;
        }
        if let Some(dir) = lookup("SWCTL_MANIFESTS").filter(|v| !v.is_empty()) {
            settings.manifests = Some(PathBuf::from(dir));
        }
        if settings.home.is_none() {
            settings.home = Some(paths::swctl_home(lookup));
        }
        if settings.helm.repository_config.is_none() || lookup("HELM_REPOSITORY_CONFIG").is_some()
        {
            settings.helm.repository_config = Some(paths::repository_config(lookup));
        }
        if settings.helm.repository_cache.is_none() || lookup("HELM_REPOSITORY_CACHE").is_some() {
            settings.helm.repository_cache = Some(paths::repository_cache(lookup));
        }

        settings
    }

    /// Save settings to a file
    pub fn save(settings: &Settings, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(settings).context("Failed to serialize settings to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

impl Settings {
    /// Directory holding user templates
    pub fn home_dir(&self) -> PathBuf {
        self.home
            .clone()
            .unwrap_or_else(|| paths::swctl_home(&|key| std::env::var(key).ok()))
    }

    /// Helm repositories file
    pub fn repository_config(&self) -> PathBuf {
        self.helm
            .repository_config
            .clone()
            .unwrap_or_else(|| paths::repository_config(&|key| std::env::var(key).ok()))
    }

    /// Helm repository cache directory
    pub fn repository_cache(&self) -> PathBuf {
        self.helm
            .repository_cache
            .clone()
            .unwrap_or_else(|| paths::repository_cache(&|key| std::env::var(key).ok()))
    }
}
