//! SiteWhereMicroservice custom resource
//!
//! The same [`MicroserviceSpec`] is embedded by value in an instance and
//! materialized by the operator as a namespaced `SiteWhereMicroservice`.

use k8s_openapi::api::core::v1::{ContainerPort, EnvVar, ResourceRequirements, ServicePort};
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use std::collections::BTreeMap;

use super::FunctionalArea;

/// Declarative description of one microservice
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "sitewhere.io",
    version = "v1alpha4",
    kind = "SiteWhereMicroservice",
    plural = "microservices",
    singular = "microservice",
    shortname = "swm",
    namespaced,
    status = "MicroserviceStatus",
    derive = "PartialEq",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceSpec {
    pub functional_area: FunctionalArea,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    #[serde(default, rename = "multitenant")]
    pub multi_tenant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_spec: Option<PodSpecification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_spec: Option<ServiceSpecification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugSpecification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSpecification>,
    /// Opaque microservice configuration, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
}

fn default_replicas() -> i32 {
    1
}

/// Container image reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerSpec {
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub tag: String,
}

impl DockerSpec {
    /// Full image reference for an image name, e.g. `docker.io/sitewhere/service-event-sources:3.0`
    pub fn image(&self, image_name: &str) -> String {
        let mut image = String::new();
        if !self.registry.is_empty() {
            image.push_str(&self.registry);
            image.push('/');
        }
        if !self.repository.is_empty() {
            image.push_str(&self.repository);
            image.push('/');
        }
        image.push_str(image_name);
        if !self.tag.is_empty() {
            image.push(':');
            image.push_str(&self.tag);
        }
        image
    }
}

/// Pod template for a microservice deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpecification {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    #[serde(default)]
    pub docker_spec: DockerSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Service exposing a microservice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpecification {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ServicePort>,
}

/// Remote debugging switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSpecification {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub jdwp_port: i32,
    #[serde(default)]
    pub jmx_port: i32,
}

/// Logger overrides applied by the microservice at runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSpecification {
    #[serde(default)]
    pub overrides: Vec<LoggingOverride>,
}

/// A single `(logger, level)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tabled)]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LoggingOverride {
    pub logger: String,
    pub level: String,
}

impl LoggingOverride {
    pub fn new(logger: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
            level: level.into(),
        }
    }
}

/// Observed state reported by the operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_state: Option<BootstrapState>,
}

/// Bootstrap progress of a microservice or instance-wide component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BootstrapState {
    #[default]
    Unknown,
    Bootstrapped,
    NotBootstrapped,
}

impl BootstrapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapState::Unknown => "Unknown",
            BootstrapState::Bootstrapped => "Bootstrapped",
            BootstrapState::NotBootstrapped => "NotBootstrapped",
        }
    }
}

impl From<String> for BootstrapState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Bootstrapped" => BootstrapState::Bootstrapped,
            "NotBootstrapped" => BootstrapState::NotBootstrapped,
            _ => BootstrapState::Unknown,
        }
    }
}

impl From<BootstrapState> for String {
    fn from(state: BootstrapState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_image_reference() {
        let docker = DockerSpec {
            registry: "docker.io".into(),
            repository: "sitewhere".into(),
            tag: "3.0".into(),
        };
        assert_eq!(
            docker.image("service-event-sources"),
            "docker.io/sitewhere/service-event-sources:3.0"
        );

        let bare = DockerSpec::default();
        assert_eq!(bare.image("busybox"), "busybox");
    }

    #[test]
    fn test_bootstrap_state_tolerates_unknown_values() {
        let status: MicroserviceStatus = serde_json::from_value(serde_json::json!({
            "deployment": "sitewhere-event-sources",
            "bootstrapState": "Bootstrapping"
        }))
        .unwrap();
        assert_eq!(status.bootstrap_state, Some(BootstrapState::Unknown));
        assert_eq!(status.deployment.as_deref(), Some("sitewhere-event-sources"));
    }

    #[test]
    fn test_spec_rejects_unknown_functional_area() {
        let result: Result<MicroserviceSpec, _> = serde_json::from_value(serde_json::json!({
            "functionalArea": "web-rest",
            "name": "Web REST"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_spec_field_names() {
        let spec: MicroserviceSpec = serde_json::from_value(serde_json::json!({
            "functionalArea": "event-sources",
            "name": "Event Sources",
            "multitenant": true,
            "debug": {"enabled": false, "jdwpPort": 8001, "jmxPort": 1101},
            "logging": {"overrides": [{"logger": "com.sitewhere", "level": "info"}]}
        }))
        .unwrap();
        assert!(spec.multi_tenant);
        assert_eq!(spec.replicas, 1);
        assert_eq!(spec.debug.unwrap().jdwp_port, 8001);
        assert_eq!(spec.logging.unwrap().overrides.len(), 1);
    }
}
