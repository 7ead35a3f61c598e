//! Cluster gateway
//!
//! [`Cluster`] is the seam between swctl actions and the Kubernetes API.
//! Actions only ever see classified [`crate::error::Error`] values, never
//! raw kube-rs errors. [`KubeCluster`] is the kube-rs implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{AsyncBufRead, AsyncBufReadExt, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Secret};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{DeleteParams, DynamicObject, ListParams, LogParams, ObjectMeta, PostParams};
use kube::{Api, Client};

use super::apply::{self, ApplyOutcome, ManifestObject};
use super::errors::classify;
use super::idempotent::{Created, DeleteOutcome, create_if_absent, delete_if_present};
use super::mapper::RestMapper;
use crate::error::{Error, Result};
use crate::models::{
    InstanceSpec, SiteWhereInstance, SiteWhereMicroservice, SiteWhereTenant, legacy_instance_resource,
};

/// Lines of a container log, raw bytes without the trailing newline
pub type LogLines = BoxStream<'static, Result<Vec<u8>>>;

/// Split a log stream on `\n` without decoding it
pub fn byte_lines<R>(reader: R) -> LogLines
where
    R: AsyncBufRead + Send + 'static,
{
    futures::stream::unfold(Box::pin(reader), |mut reader| async move {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => None,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                Some((Ok(line), reader))
            }
            Err(e) => Some((Err(Error::from(e)), reader)),
        }
    })
    .boxed()
}

/// Operations swctl needs from a cluster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Check that the API server answers
    async fn is_reachable(&self) -> Result<()>;

    async fn namespace_exists(&self, name: &str) -> Result<bool>;
    /// Create the namespace unless it exists
    async fn namespace_ensure(
        &self,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<Created<Namespace>>;
    /// Delete the namespace; absence is success
    async fn namespace_delete(&self, name: &str) -> Result<DeleteOutcome>;

    async fn get_instance(&self, name: &str) -> Result<SiteWhereInstance>;
    /// List instances, falling back to the legacy API version
    async fn list_instances(&self) -> Result<Vec<SiteWhereInstance>>;
    async fn create_instance(&self, instance: &SiteWhereInstance) -> Result<SiteWhereInstance>;
    /// Replace an instance; a stale resourceVersion yields `Conflict`
    async fn update_instance(&self, instance: &SiteWhereInstance) -> Result<SiteWhereInstance>;
    async fn delete_instance(&self, name: &str) -> Result<()>;

    async fn get_microservice(&self, namespace: &str, name: &str)
    -> Result<SiteWhereMicroservice>;
    async fn list_microservices(&self, namespace: &str) -> Result<Vec<SiteWhereMicroservice>>;
    /// Replace a microservice; a stale resourceVersion yields `Conflict`
    async fn update_microservice(
        &self,
        microservice: &SiteWhereMicroservice,
    ) -> Result<SiteWhereMicroservice>;

    async fn get_tenant(&self, namespace: &str, name: &str) -> Result<SiteWhereTenant>;
    async fn create_tenant(&self, tenant: &SiteWhereTenant) -> Result<SiteWhereTenant>;
    async fn delete_tenant(&self, namespace: &str, name: &str) -> Result<()>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment>;
    /// Pods matched by the deployment's label selector
    async fn pods_for_deployment(&self, deployment: &Deployment) -> Result<Vec<Pod>>;
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;
    async fn get_crd(&self, name: &str) -> Result<CustomResourceDefinition>;
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;
    async fn list_secrets(&self, namespace: &str, label_selector: &str) -> Result<Vec<Secret>>;

    /// Stream container log lines, optionally following
    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        follow: bool,
    ) -> Result<LogLines>;

    /// Create-if-absent for an arbitrary manifest object
    async fn apply_manifest(&self, object: &ManifestObject) -> Result<ApplyOutcome>;
    /// Delete an arbitrary manifest object; absence is success
    async fn delete_manifest(&self, object: &ManifestObject) -> Result<DeleteOutcome>;
}

/// kube-rs backed gateway
pub struct KubeCluster {
    client: Client,
    default_namespace: String,
    mapper: RestMapper,
}

impl KubeCluster {
    pub fn new(client: Client, default_namespace: String) -> Self {
        let mapper = RestMapper::new(client.clone());
        Self {
            client,
            default_namespace,
            mapper,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn list_legacy_instances(&self) -> Result<Vec<SiteWhereInstance>> {
        let resource = legacy_instance_resource();
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let list = match api.list(&ListParams::default()).await {
            Ok(list) => list,
            Err(e) => {
                let err = classify(e, "sitewhere instances", "");
                if err.is_not_found() {
                    tracing::debug!("Legacy instance API is not served either");
                    return Ok(Vec::new());
                }
                return Err(err);
            }
        };

        tracing::debug!("Found {} legacy instances", list.items.len());
        list.items
            .into_iter()
            .map(|obj| {
                let spec: InstanceSpec = match obj.data.get("spec") {
                    Some(spec) => serde_json::from_value(spec.clone())?,
                    None => InstanceSpec::default(),
                };
                Ok(SiteWhereInstance {
                    metadata: obj.metadata,
                    spec,
                    status: None,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn is_reachable(&self) -> Result<()> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| Error::Unreachable(e.to_string()))?;
        tracing::debug!(
            "Kubernetes API server version {}.{}",
            version.major,
            version.minor
        );
        Ok(())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get(name).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = classify(e, "namespace", name);
                if err.is_not_found() { Ok(false) } else { Err(err) }
            }
        }
    }

    async fn namespace_ensure(
        &self,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<Created<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let api = &api;
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: (!labels.is_empty()).then_some(labels),
                ..Default::default()
            },
            ..Default::default()
        };
        let namespace = &namespace;
        create_if_absent(
            "namespace",
            name,
            || async move { api.get(name).await.map_err(|e| classify(e, "namespace", name)) },
            || async move {
                api.create(&PostParams::default(), namespace)
                    .await
                    .map_err(|e| classify(e, "namespace", name))
            },
        )
        .await
    }

    async fn namespace_delete(&self, name: &str) -> Result<DeleteOutcome> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let api = &api;
        delete_if_present("namespace", name, || async move {
            api.delete(name, &DeleteParams::default())
                .await
                .map(|_| ())
                .map_err(|e| classify(e, "namespace", name))
        })
        .await
    }

    async fn get_instance(&self, name: &str) -> Result<SiteWhereInstance> {
        let api: Api<SiteWhereInstance> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| classify(e, "sitewhere instance", name))
    }

    async fn list_instances(&self) -> Result<Vec<SiteWhereInstance>> {
        let api: Api<SiteWhereInstance> = Api::all(self.client.clone());
        match api.list(&ListParams::default()).await {
            Ok(list) => Ok(list.items),
            Err(e) => {
                let err = classify(e, "sitewhere instances", "");
                if err.is_not_found() {
                    tracing::debug!("Current instance API not served, trying legacy version");
                    self.list_legacy_instances().await
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn create_instance(&self, instance: &SiteWhereInstance) -> Result<SiteWhereInstance> {
        let name = instance.metadata.name.clone().unwrap_or_default();
        let api: Api<SiteWhereInstance> = Api::all(self.client.clone());
        api.create(&PostParams::default(), instance)
            .await
            .map_err(|e| classify(e, "sitewhere instance", &name))
    }

    async fn update_instance(&self, instance: &SiteWhereInstance) -> Result<SiteWhereInstance> {
        let name = instance.metadata.name.clone().unwrap_or_default();
        let api: Api<SiteWhereInstance> = Api::all(self.client.clone());
        api.replace(&name, &PostParams::default(), instance)
            .await
            .map_err(|e| classify(e, "sitewhere instance", &name))
    }

    async fn delete_instance(&self, name: &str) -> Result<()> {
        let api: Api<SiteWhereInstance> = Api::all(self.client.clone());
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, "sitewhere instance", name))
    }

    async fn get_microservice(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SiteWhereMicroservice> {
        let api: Api<SiteWhereMicroservice> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, "sitewhere microservice", name))
    }

    async fn list_microservices(&self, namespace: &str) -> Result<Vec<SiteWhereMicroservice>> {
        let api: Api<SiteWhereMicroservice> = Api::namespaced(self.client.clone(), namespace);
        api.list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| classify(e, "sitewhere microservices", namespace))
    }

    async fn update_microservice(
        &self,
        microservice: &SiteWhereMicroservice,
    ) -> Result<SiteWhereMicroservice> {
        let name = microservice.metadata.name.clone().unwrap_or_default();
        let namespace = microservice
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| self.default_namespace.clone());
        let api: Api<SiteWhereMicroservice> = Api::namespaced(self.client.clone(), &namespace);
        api.replace(&name, &PostParams::default(), microservice)
            .await
            .map_err(|e| classify(e, "sitewhere microservice", &name))
    }

    async fn get_tenant(&self, namespace: &str, name: &str) -> Result<SiteWhereTenant> {
        let api: Api<SiteWhereTenant> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, "sitewhere tenant", name))
    }

    async fn create_tenant(&self, tenant: &SiteWhereTenant) -> Result<SiteWhereTenant> {
        let name = tenant.metadata.name.clone().unwrap_or_default();
        let namespace = tenant
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| self.default_namespace.clone());
        let api: Api<SiteWhereTenant> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), tenant)
            .await
            .map_err(|e| classify(e, "sitewhere tenant", &name))
    }

    async fn delete_tenant(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<SiteWhereTenant> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, "sitewhere tenant", name))
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| classify(e, "deployment", name))
    }

    async fn pods_for_deployment(&self, deployment: &Deployment) -> Result<Vec<Pod>> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        let namespace = deployment
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| self.default_namespace.clone());
        let selector = selector_for(deployment).ok_or_else(|| {
            Error::Other(anyhow::anyhow!(
                "Deployment '{}' has no label selector",
                name
            ))
        })?;

        tracing::debug!("Listing pods in {} with selector {}", namespace, selector);
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
        api.list(&ListParams::default().labels(&selector))
            .await
            .map(|list| list.items)
            .map_err(|e| classify(e, "pods", &name))
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| classify(e, "pod", name))
    }

    async fn get_crd(&self, name: &str) -> Result<CustomResourceDefinition> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| classify(e, "custom resource definition", name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| classify(e, "secret", name))
    }

    async fn list_secrets(&self, namespace: &str, label_selector: &str) -> Result<Vec<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.list(&ListParams::default().labels(label_selector))
            .await
            .map(|list| list.items)
            .map_err(|e| classify(e, "secrets", namespace))
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        follow: bool,
    ) -> Result<LogLines> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            follow,
            ..Default::default()
        };
        let reader = api
            .log_stream(pod, &params)
            .await
            .map_err(|e| classify(e, "pod", pod))?;
        Ok(byte_lines(reader))
    }

    async fn apply_manifest(&self, object: &ManifestObject) -> Result<ApplyOutcome> {
        apply::apply(&self.client, &self.mapper, &self.default_namespace, object).await
    }

    async fn delete_manifest(&self, object: &ManifestObject) -> Result<DeleteOutcome> {
        apply::delete(&self.client, &self.mapper, &self.default_namespace, object).await
    }
}

/// Render a deployment's `matchLabels` as a label selector string
pub fn selector_for(deployment: &Deployment) -> Option<String> {
    let labels = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.match_labels.as_ref())
        .filter(|labels| !labels.is_empty())?;
    Some(
        labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(","),
    )
}
