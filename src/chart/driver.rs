//! Chart install/uninstall backends

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tabled::Tabled;
use tokio::process::Command;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Everything needed to install one release
#[derive(Debug, Clone, PartialEq)]
pub struct InstallRequest {
    pub release: String,
    pub namespace: String,
    pub chart: PathBuf,
    pub values: serde_json::Value,
    pub create_namespace: bool,
    pub skip_crds: bool,
    pub wait: bool,
    pub timeout: Duration,
}

/// Identity of an installed or removed release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReleaseInfo {
    pub release_name: String,
    pub namespace: String,
}

/// Performs chart operations against the cluster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChartDriver: Send + Sync {
    /// Fetch the chart's declared dependencies into its `charts/` directory
    async fn dependency_update(&self, chart_dir: &Path) -> Result<()>;

    async fn install(&self, request: &InstallRequest) -> Result<ReleaseInfo>;

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<ReleaseInfo>;
}

/// Driver backed by the `helm` binary
#[derive(Debug, Clone)]
pub struct HelmCli {
    bin: String,
    driver: String,
    repository_config: PathBuf,
    repository_cache: PathBuf,
    kube_context: Option<String>,
    kube_token: Option<String>,
    kube_api_server: Option<String>,
}

impl HelmCli {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bin: settings.helm.bin.clone(),
            driver: settings.helm.driver.clone(),
            repository_config: settings.repository_config(),
            repository_cache: settings.repository_cache(),
            kube_context: settings.kube_context.clone(),
            kube_token: settings.kube_token.clone(),
            kube_api_server: settings.kube_api_server.clone(),
        }
    }

    /// Repository flags shared by every command
    fn global_args(&self) -> Vec<String> {
        vec![
            "--repository-config".to_string(),
            self.repository_config.to_string_lossy().into_owned(),
            "--repository-cache".to_string(),
            self.repository_cache.to_string_lossy().into_owned(),
        ]
    }

    /// Environment of the child; cluster credentials never go on argv
    fn helm_env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![("HELM_DRIVER", self.driver.clone())];
        if let Some(context) = &self.kube_context {
            env.push(("HELM_KUBECONTEXT", context.clone()));
        }
        if let Some(token) = &self.kube_token {
            env.push(("HELM_KUBETOKEN", token.clone()));
        }
        if let Some(server) = &self.kube_api_server {
            env.push(("HELM_KUBEAPISERVER", server.clone()));
        }
        env
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        let verb = args.first().map(String::as_str).unwrap_or_default();
        tracing::debug!("Running {} {}", self.bin, verb);

        let output = Command::new(&self.bin)
            .envs(self.helm_env())
            .args(args)
            .args(self.global_args())
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Other(anyhow::anyhow!(
                "{} {} failed: {}",
                self.bin,
                verb,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Arguments for `helm install`, excluding connection flags
pub fn install_args(request: &InstallRequest, values_file: &Path) -> Vec<String> {
    let mut args = vec![
        "install".to_string(),
        request.release.clone(),
        request.chart.to_string_lossy().into_owned(),
        "--namespace".to_string(),
        request.namespace.clone(),
        "--values".to_string(),
        values_file.to_string_lossy().into_owned(),
    ];
    if request.create_namespace {
        args.push("--create-namespace".to_string());
    }
    if request.skip_crds {
        args.push("--skip-crds".to_string());
    }
    if request.wait {
        args.push("--wait".to_string());
        args.push("--timeout".to_string());
        args.push(format!("{}s", request.timeout.as_secs()));
    }
    args
}

#[async_trait]
impl ChartDriver for HelmCli {
    async fn dependency_update(&self, chart_dir: &Path) -> Result<()> {
        let args = vec![
            "dependency".to_string(),
            "update".to_string(),
            chart_dir.to_string_lossy().into_owned(),
        ];
        self.run(&args).await?;
        Ok(())
    }

    async fn install(&self, request: &InstallRequest) -> Result<ReleaseInfo> {
        let values = serde_yaml::to_string(&request.values)?;
        let mut values_file = tempfile::Builder::new()
            .prefix("swctl-values-")
            .suffix(".yaml")
            .tempfile()
            .context("Failed to create values file")?;
        std::io::Write::write_all(&mut values_file, values.as_bytes())?;

        self.run(&install_args(request, values_file.path())).await?;
        Ok(ReleaseInfo {
            release_name: request.release.clone(),
            namespace: request.namespace.clone(),
        })
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<ReleaseInfo> {
        let args = vec![
            "uninstall".to_string(),
            release.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        self.run(&args).await?;
        Ok(ReleaseInfo {
            release_name: release.to_string(),
            namespace: namespace.to_string(),
        })
    }
}
