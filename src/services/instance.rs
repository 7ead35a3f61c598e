//! Instance materializer
//!
//! Maps user intent onto a cluster-scoped `SiteWhereInstance` carrying the
//! rendered microservice list, and reads instances back for listing.

use std::path::Path;

use serde::Serialize;
use tabled::Tabled;

use crate::constants::{
    DEFAULT_INSTANCE_NAME, DEFAULT_REGISTRY, DEFAULT_REPOSITORY, DEFAULT_TAG, DEFAULT_TEMPLATE,
    MINIMAL_TEMPLATE,
};
use crate::error::Result;
use crate::kube::{Cluster, DeleteOutcome, create_if_absent};
use crate::models::{
    BootstrapState, DockerSpec, InstanceSpec, Profile, SiteWhereInstance, SiteWhereMicroservice,
};
use crate::render::{self, PlaceHolder};

/// What the user asked for on `create instance` / `delete instance`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceRequest {
    pub name: String,
    pub namespace: String,
    pub tag: String,
    pub registry: String,
    pub repository: String,
    pub replicas: i32,
    pub minimal: bool,
    pub debug: bool,
    pub configuration_template: String,
    pub dataset_template: String,
}

impl InstanceRequest {
    /// Fill empty fields with their defaults
    ///
    /// Values are not trimmed; only the empty string is replaced.
    pub fn with_defaults(mut self) -> Self {
        if self.name.is_empty() {
            self.name = DEFAULT_INSTANCE_NAME.to_string();
        }
        if self.namespace.is_empty() {
            self.namespace = self.name.clone();
        }
        if self.tag.is_empty() {
            self.tag = DEFAULT_TAG.to_string();
        }
        if self.registry.is_empty() {
            self.registry = DEFAULT_REGISTRY.to_string();
        }
        if self.repository.is_empty() {
            self.repository = DEFAULT_REPOSITORY.to_string();
        }
        if self.replicas <= 0 {
            self.replicas = 1;
        }
        if self.minimal {
            self.configuration_template = MINIMAL_TEMPLATE.to_string();
        } else if self.configuration_template.is_empty() {
            self.configuration_template = DEFAULT_TEMPLATE.to_string();
        }
        if self.dataset_template.is_empty() {
            self.dataset_template = DEFAULT_TEMPLATE.to_string();
        }
        self
    }

    pub fn profile(&self) -> Result<Profile> {
        Profile::from_flags(self.minimal, self.debug)
    }

    fn placeholder(&self) -> PlaceHolder {
        PlaceHolder {
            instance_name: self.name.clone(),
            replicas: self.replicas,
            tag: self.tag.clone(),
            registry: self.registry.clone(),
            repository: self.repository.clone(),
        }
    }
}

/// Outcome of `create instance`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct InstanceCreated {
    pub name: String,
    pub namespace: String,
    pub tag: String,
    pub configuration_template: String,
    pub microservices: usize,
    pub created: bool,
}

/// Outcome of `delete instance`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct InstanceDeleted {
    pub name: String,
    pub namespace_deleted: bool,
}

/// One row of `instances`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct InstanceSummary {
    pub name: String,
    pub configuration_template: String,
    pub dataset_template: String,
    pub tag: String,
    pub microservices: usize,
    pub tenant_management: String,
    pub user_management: String,
}

impl From<&SiteWhereInstance> for InstanceSummary {
    fn from(instance: &SiteWhereInstance) -> Self {
        let status = instance.status.as_ref();
        let state = |s: Option<BootstrapState>| s.unwrap_or_default().to_string();
        Self {
            name: instance.metadata.name.clone().unwrap_or_default(),
            configuration_template: instance.spec.configuration_template.clone(),
            dataset_template: instance.spec.dataset_template.clone(),
            tag: instance.tag().unwrap_or_default().to_string(),
            microservices: instance.spec.microservices.len(),
            tenant_management: state(status.and_then(|s| s.tenant_management_bootstrap_state)),
            user_management: state(status.and_then(|s| s.user_management_bootstrap_state)),
        }
    }
}

/// One microservice row of `instances <NAME>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MicroserviceSummary {
    pub name: String,
    pub functional_area: String,
    pub replicas: i32,
    pub ready: i32,
    pub deployment: String,
    pub bootstrap: String,
}

impl From<&SiteWhereMicroservice> for MicroserviceSummary {
    fn from(microservice: &SiteWhereMicroservice) -> Self {
        let status = microservice.status.clone().unwrap_or_default();
        Self {
            name: microservice.metadata.name.clone().unwrap_or_default(),
            functional_area: microservice.spec.functional_area.to_string(),
            replicas: microservice.spec.replicas,
            ready: status.ready_replicas.unwrap_or(0),
            deployment: status.deployment.unwrap_or_default(),
            bootstrap: status.bootstrap_state.unwrap_or_default().to_string(),
        }
    }
}

/// Result of `instances [NAME]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceListing {
    pub instances: Vec<InstanceSummary>,
    /// Filled only when a single instance was requested
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub microservices: Vec<MicroserviceSummary>,
}

/// Build the custom resource for a resolved request
pub fn build_instance(request: &InstanceRequest, home: &Path) -> Result<SiteWhereInstance> {
    let profile = request.profile()?;
    let configuration = render::load_or_default(home, profile, &request.placeholder())?;
    tracing::debug!(
        "Rendered {} microservices for profile {:?}",
        configuration.microservices.len(),
        profile
    );

    Ok(SiteWhereInstance::new(
        &request.name,
        InstanceSpec {
            configuration_template: request.configuration_template.clone(),
            dataset_template: request.dataset_template.clone(),
            configuration: None,
            docker_spec: Some(DockerSpec {
                registry: request.registry.clone(),
                repository: request.repository.clone(),
                tag: request.tag.clone(),
            }),
            microservices: configuration.microservices,
        },
    ))
}

pub async fn create_instance(
    cluster: &dyn Cluster,
    home: &Path,
    request: InstanceRequest,
) -> Result<InstanceCreated> {
    let request = request.with_defaults();
    cluster.is_reachable().await?;

    let instance = build_instance(&request, home)?;
    let instance = &instance;
    let name = request.name.as_str();
    let outcome = create_if_absent(
        "sitewhere instance",
        name,
        || async move { cluster.get_instance(name).await },
        || async move { cluster.create_instance(instance).await },
    )
    .await?;

    let created = outcome.was_created();
    let stored = outcome.into_inner();
    Ok(InstanceCreated {
        name: request.name.clone(),
        namespace: request.namespace.clone(),
        tag: stored.tag().unwrap_or(&request.tag).to_string(),
        configuration_template: stored.spec.configuration_template.clone(),
        microservices: stored.spec.microservices.len(),
        created,
    })
}

pub async fn delete_instance(cluster: &dyn Cluster, name: &str, purge: bool) -> Result<InstanceDeleted> {
    let name = if name.is_empty() { DEFAULT_INSTANCE_NAME } else { name };
    cluster.is_reachable().await?;

    cluster
        .get_instance(name)
        .await
        .map_err(|e| e.with_kind("sitewhere instance"))?;
    cluster.delete_instance(name).await?;
    tracing::info!("Deleted sitewhere instance '{}'", name);

    let namespace_deleted = if purge {
        cluster.namespace_delete(name).await? == DeleteOutcome::Deleted
    } else {
        false
    };

    Ok(InstanceDeleted {
        name: name.to_string(),
        namespace_deleted,
    })
}

pub async fn list_instances(cluster: &dyn Cluster, name: Option<&str>) -> Result<InstanceListing> {
    cluster.is_reachable().await?;

    let Some(name) = name.filter(|n| !n.is_empty()) else {
        let instances = match cluster.list_instances().await {
            Ok(instances) => instances,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        return Ok(InstanceListing {
            instances: instances.iter().map(InstanceSummary::from).collect(),
            microservices: Vec::new(),
        });
    };

    let instance = cluster
        .get_instance(name)
        .await
        .map_err(|e| e.with_kind("sitewhere instance"))?;
    let microservices = match cluster.list_microservices(name).await {
        Ok(list) => list,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };

    Ok(InstanceListing {
        instances: vec![InstanceSummary::from(&instance)],
        microservices: microservices.iter().map(MicroserviceSummary::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::kube::MockCluster;
    use crate::models::FunctionalArea;
    use std::sync::{Arc, Mutex};

    /// Cluster mock backed by one stored instance slot
    fn cluster_with_store(store: Arc<Mutex<Option<SiteWhereInstance>>>) -> MockCluster {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        let get_store = store.clone();
        cluster.expect_get_instance().returning(move |name| {
            get_store
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Error::not_found("sitewhere instance", name))
        });
        cluster.expect_create_instance().returning(move |instance| {
            let mut slot = store.lock().unwrap();
            if slot.is_some() {
                return Err(Error::already_exists("sitewhere instance", "sitewhere"));
            }
            *slot = Some(instance.clone());
            Ok(instance.clone())
        });
        cluster
    }

    fn request(name: &str, tag: &str) -> InstanceRequest {
        InstanceRequest {
            name: name.into(),
            tag: tag.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let request = InstanceRequest::default().with_defaults();
        assert_eq!(request.name, "sitewhere");
        assert_eq!(request.namespace, "sitewhere");
        assert_eq!(request.tag, "3.0");
        assert_eq!(request.replicas, 1);
        assert_eq!(request.configuration_template, "default");
        assert_eq!(request.dataset_template, "default");
    }

    #[test]
    fn test_minimal_overrides_configuration_template() {
        let request = InstanceRequest {
            minimal: true,
            configuration_template: "custom".into(),
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(request.configuration_template, "minimal");
    }

    #[test]
    fn test_names_are_not_trimmed() {
        let request = request(" iot ", "").with_defaults();
        assert_eq!(request.name, " iot ");
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let home = tempfile::tempdir().unwrap();
        let store = Arc::new(Mutex::new(None));
        let cluster = cluster_with_store(store.clone());

        let first = create_instance(&cluster, home.path(), request("sitewhere", "3.0"))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.microservices, FunctionalArea::all().len());
        let stored = store.lock().unwrap().clone().unwrap();
        assert_eq!(stored.spec.docker_spec.as_ref().unwrap().tag, "3.0");

        let second = create_instance(&cluster, home.path(), request("sitewhere", "3.0"))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(store.lock().unwrap().clone().unwrap(), stored);
    }

    #[tokio::test]
    async fn test_create_minimal() {
        let home = tempfile::tempdir().unwrap();
        let store = Arc::new(Mutex::new(None));
        let cluster = cluster_with_store(store.clone());

        let req = InstanceRequest {
            name: "sitewhere".into(),
            minimal: true,
            ..Default::default()
        };
        let created = create_instance(&cluster, home.path(), req).await.unwrap();
        assert_eq!(created.configuration_template, "minimal");
        assert_eq!(created.microservices, FunctionalArea::minimal().len());
    }

    #[tokio::test]
    async fn test_create_fails_fast_when_unreachable() {
        let home = tempfile::tempdir().unwrap();
        let mut cluster = MockCluster::new();
        cluster
            .expect_is_reachable()
            .returning(|| Err(Error::Unreachable("connection refused".into())));
        cluster.expect_create_instance().never();

        let err = create_instance(&cluster, home.path(), request("sitewhere", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_instance() {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_get_instance()
            .returning(|name| Err(Error::not_found("sitewhere instance", name)));
        cluster.expect_delete_instance().never();

        let err = delete_instance(&cluster, "sitewhere", true).await.unwrap_err();
        assert_eq!(err.to_string(), "sitewhere instance 'sitewhere' not found");
    }

    #[tokio::test]
    async fn test_delete_with_purge() {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_get_instance()
            .returning(|name| Ok(SiteWhereInstance::new(name, InstanceSpec::default())));
        cluster.expect_delete_instance().times(1).returning(|_| Ok(()));
        cluster
            .expect_namespace_delete()
            .withf(|name| name == "sitewhere")
            .times(1)
            .returning(|_| Ok(DeleteOutcome::Deleted));

        let deleted = delete_instance(&cluster, "sitewhere", true).await.unwrap();
        assert!(deleted.namespace_deleted);
    }

    #[tokio::test]
    async fn test_list_empty_when_not_served() {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_list_instances()
            .returning(|| Err(Error::not_found("sitewhere instances", "")));

        let listing = list_instances(&cluster, None).await.unwrap();
        assert!(listing.instances.is_empty());
    }

    #[tokio::test]
    async fn test_list_single_includes_microservices() {
        let home = tempfile::tempdir().unwrap();
        let instance = build_instance(&request("iot", "3.0").with_defaults(), home.path()).unwrap();
        let microservices: Vec<SiteWhereMicroservice> = instance
            .spec
            .microservices
            .iter()
            .map(|spec| SiteWhereMicroservice::new(spec.functional_area.as_str(), spec.clone()))
            .collect();

        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_get_instance()
            .returning(move |_| Ok(instance.clone()));
        cluster
            .expect_list_microservices()
            .withf(|ns| ns == "iot")
            .returning(move |_| Ok(microservices.clone()));

        let listing = list_instances(&cluster, Some("iot")).await.unwrap();
        assert_eq!(listing.instances.len(), 1);
        assert_eq!(listing.instances[0].tag, "3.0");
        assert_eq!(listing.microservices.len(), FunctionalArea::all().len());
        assert_eq!(listing.microservices[0].functional_area, "instance-management");
    }
}
