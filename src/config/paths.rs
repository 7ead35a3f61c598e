//! User-local path resolution
//!
//! - swctl home: `SWCTL_HOME` or `~/.swctl` (templates live here)
//! - helm repository file: `HELM_REPOSITORY_CONFIG` or `<config>/helm/repositories.yaml`
//! - helm repository cache: `HELM_REPOSITORY_CACHE` or `<cache>/helm/repository`
//!
//! The helm locations follow the XDG layout on Unix and the Known Folder
//! layout on Windows, so that a `helm` binary sees the same repositories.

use directories::BaseDirs;
use std::path::{Path, PathBuf};

fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Directory holding user-overridable templates
pub fn swctl_home(lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    lookup("SWCTL_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".swctl"))
}

/// Helm repositories file
pub fn repository_config(lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = lookup("HELM_REPOSITORY_CONFIG") {
        return PathBuf::from(path);
    }
    #[cfg(windows)]
    {
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("helm"))
            .unwrap_or_else(|| home_dir().join(".config").join("helm"))
            .join("repositories.yaml")
    }
    #[cfg(not(windows))]
    {
        lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".config"))
            .join("helm")
            .join("repositories.yaml")
    }
}

/// Helm repository index cache directory
pub fn repository_cache(lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = lookup("HELM_REPOSITORY_CACHE") {
        return PathBuf::from(path);
    }
    #[cfg(windows)]
    {
        BaseDirs::new()
            .map(|dirs| dirs.cache_dir().join("helm"))
            .unwrap_or_else(|| home_dir().join(".cache").join("helm"))
            .join("repository")
    }
    #[cfg(not(windows))]
    {
        lookup("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".cache"))
            .join("helm")
            .join("repository")
    }
}

/// Sibling lockfile for a path: `repositories.yaml` → `repositories.lock`
pub fn lock_path_for(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_swctl_home_default() {
        let dir = swctl_home(&no_env);
        assert!(dir.ends_with(".swctl"));
    }

    #[test]
    fn test_overrides_win() {
        let lookup = |key: &str| match key {
            "SWCTL_HOME" => Some("/tmp/sw".to_string()),
            "HELM_REPOSITORY_CONFIG" => Some("/tmp/helm/repos.yaml".to_string()),
            "HELM_REPOSITORY_CACHE" => Some("/tmp/helm/cache".to_string()),
            _ => None,
        };
        assert_eq!(swctl_home(&lookup), PathBuf::from("/tmp/sw"));
        assert_eq!(
            repository_config(&lookup),
            PathBuf::from("/tmp/helm/repos.yaml")
        );
        assert_eq!(repository_cache(&lookup), PathBuf::from("/tmp/helm/cache"));
    }

    #[test]
    fn test_lock_path_is_sibling() {
        assert_eq!(
            lock_path_for(Path::new("/a/b/repositories.yaml")),
            PathBuf::from("/a/b/repositories.lock")
        );
    }
}
