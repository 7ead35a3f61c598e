//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and provides the
//! [`Cluster`] gateway used by every swctl action.
//!
//! Connection settings, in order of precedence:
//! - `SWCTL_KUBEAPISERVER` / `SWCTL_KUBETOKEN` override the API server URL and credentials
//! - `SWCTL_KUBECONTEXT` selects a kubeconfig context
//! - otherwise the default inference (in-cluster, `KUBECONFIG`, `~/.kube/config`)

pub mod apply;
pub mod errors;
pub mod gateway;
pub mod helm_release;
pub mod idempotent;
pub mod mapper;
pub mod readiness;

pub use apply::{ApplyOutcome, ManifestObject};
pub use errors::classify;
pub use gateway::{Cluster, KubeCluster, LogLines};
#[cfg(test)]
pub use gateway::MockCluster;
pub use idempotent::{Created, DeleteOutcome, create_if_absent, delete_if_present};

use anyhow::{Context, Result};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};

use crate::config::Settings;

/// Build the client configuration from settings
pub async fn client_config(settings: &Settings) -> Result<Config> {
    let mut config = match &settings.kube_context {
        Some(context) => {
            let options = KubeConfigOptions {
                context: Some(context.clone()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context '{}'", context))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    if let Some(server) = &settings.kube_api_server {
        config.cluster_url = server
            .parse()
            .with_context(|| format!("Invalid API server URL: {}", server))?;
    }

    if let Some(token) = &settings.kube_token {
        config.auth_info.token = Some(token.clone().into());
    }

    Ok(config)
}

/// Initialize and return a Kubernetes client
pub async fn create_client(settings: &Settings) -> Result<Client> {
    let config = client_config(settings).await?;
    tracing::debug!("Connecting to Kubernetes API server at {}", config.cluster_url);
    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok(client)
}

/// Connect and wrap the client in the kube-rs gateway
pub async fn connect(settings: &Settings) -> Result<KubeCluster> {
    let client = create_client(settings).await?;
    Ok(KubeCluster::new(client, settings.namespace.clone()))
}
