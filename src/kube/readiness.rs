//! Readiness polling
//!
//! Each wait polls at a fixed interval until its predicate holds or the
//! deadline passes. Objects that do not exist yet count as not ready.
//!
//! `install --wait` uses [`wait_for_deployment`] for the operator and the
//! legacy installer uses [`wait_for_crd`]. [`wait_for_pod`] and
//! [`wait_for_secret`] are library helpers with no command of their own.

use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use tokio::time::Instant;

use super::gateway::Cluster;
use crate::constants::{READINESS_POLL, READINESS_TIMEOUT};
use crate::error::{Error, Result};

/// Poll cadence and deadline
#[derive(Debug, Clone, Copy)]
pub struct Poll {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            interval: READINESS_POLL,
            timeout: READINESS_TIMEOUT,
        }
    }
}

/// Poll `check` until it returns true, or fail with `Timeout`
pub async fn poll_until<F, Fut>(what: &str, poll: Poll, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + poll.timeout;
    loop {
        match check().await {
            Ok(true) => {
                tracing::debug!("{} is ready", what);
                return Ok(());
            }
            Ok(false) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if Instant::now() + poll.interval > deadline {
            return Err(Error::Timeout(format!("waiting for {}", what)));
        }
        tracing::debug!("Waiting for {}", what);
        tokio::time::sleep(poll.interval).await;
    }
}

/// `Progressing=True` and every available replica ready
pub fn deployment_ready(deployment: &Deployment) -> bool {
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };
    let progressing = status.conditions.as_ref().is_some_and(|conditions| {
        conditions
            .iter()
            .any(|c| c.type_ == "Progressing" && c.status == "True")
    });
    let ready = status.ready_replicas.unwrap_or(0);
    let available = status.available_replicas.unwrap_or(0);
    progressing && ready >= available
}

/// Every container reports ready
pub fn pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .is_some_and(|statuses| !statuses.is_empty() && statuses.iter().all(|c| c.ready))
}

/// `Established=True`
pub fn crd_established(crd: &CustomResourceDefinition) -> bool {
    crd.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Established" && c.status == "True")
        })
}

pub async fn wait_for_deployment(
    cluster: &dyn Cluster,
    namespace: &str,
    name: &str,
    poll: Poll,
) -> Result<()> {
    poll_until(&format!("deployment {}/{}", namespace, name), poll, || async move {
        Ok(deployment_ready(&cluster.get_deployment(namespace, name).await?))
    })
    .await
}

pub async fn wait_for_pod(cluster: &dyn Cluster, namespace: &str, name: &str, poll: Poll) -> Result<()> {
    poll_until(&format!("pod {}/{}", namespace, name), poll, || async move {
        Ok(pod_ready(&cluster.get_pod(namespace, name).await?))
    })
    .await
}

pub async fn wait_for_crd(cluster: &dyn Cluster, name: &str, poll: Poll) -> Result<()> {
    poll_until(&format!("custom resource definition {}", name), poll, || async move {
        Ok(crd_established(&cluster.get_crd(name).await?))
    })
    .await
}

pub async fn wait_for_secret(
    cluster: &dyn Cluster,
    namespace: &str,
    name: &str,
    poll: Poll,
) -> Result<()> {
    poll_until(&format!("secret {}/{}", namespace, name), poll, || async move {
        cluster.get_secret(namespace, name).await.map(|_| true)
    })
    .await
}
