//! Settings schema
//!
//! Defines the optional `~/.swctl/config.yaml` file using serde. Every field
//! can also be supplied through the environment (see the loader).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::SYSTEM_NAMESPACE;

/// Root settings structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Namespace used for namespaced manifests without an explicit namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Kubeconfig context to use instead of the current one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_context: Option<String>,

    /// Bearer token for the API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_token: Option<String>,

    /// API server URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_api_server: Option<String>,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,

    /// Helm settings
    #[serde(default)]
    pub helm: HelmSettings,

    /// Directory holding user templates (`default.yaml`, `minimal.yaml`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,

    /// Directory overriding the embedded manifest archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests: Option<PathBuf>,
}

/// Helm configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmSettings {
    /// Storage driver for release records (`secret`, `configmap`, `memory`)
    #[serde(default = "default_helm_driver")]
    pub driver: String,

    /// Namespace helm operates in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// helm executable used for chart installs
    #[serde(default = "default_helm_bin")]
    pub bin: String,

    /// Repository file override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_config: Option<PathBuf>,

    /// Repository cache override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_cache: Option<PathBuf>,
}

fn default_namespace() -> String {
    SYSTEM_NAMESPACE.to_string()
}

fn default_helm_driver() -> String {
    "secret".to_string()
}

fn default_helm_bin() -> String {
    "helm".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            kube_context: None,
            kube_token: None,
            kube_api_server: None,
            debug: false,
            helm: HelmSettings::default(),
            home: None,
            manifests: None,
        }
    }
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            driver: default_helm_driver(),
            namespace: default_namespace(),
            bin: default_helm_bin(),
            repository_config: None,
            repository_cache: None,
        }
    }
}
