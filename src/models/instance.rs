//! SiteWhereInstance custom resource

use kube::CustomResource;
use kube::core::ApiResource;
use serde::{Deserialize, Serialize};

use super::microservice::{BootstrapState, DockerSpec, MicroserviceSpec};

/// A named, cluster-scoped deployment of the platform
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "sitewhere.io",
    version = "v1alpha4",
    kind = "SiteWhereInstance",
    plural = "instances",
    singular = "instance",
    shortname = "swi",
    status = "InstanceStatus",
    derive = "PartialEq",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    #[serde(default)]
    pub configuration_template: String,
    #[serde(default)]
    pub dataset_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_spec: Option<DockerSpec>,
    #[serde(default)]
    pub microservices: Vec<MicroserviceSpec>,
}

/// Instance-wide bootstrap progress reported by the operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_management_bootstrap_state: Option<BootstrapState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_management_bootstrap_state: Option<BootstrapState>,
}

/// Fixed `apiVersion` for current instances
pub const INSTANCE_API_VERSION: &str = "sitewhere.io/v1alpha4";

/// Version served by clusters still running the previous operator
pub const LEGACY_VERSION: &str = "v1alpha3";

/// Resource descriptor for the legacy `v1alpha3` instance path
pub fn legacy_instance_resource() -> ApiResource {
    ApiResource {
        group: "sitewhere.io".to_string(),
        version: LEGACY_VERSION.to_string(),
        api_version: format!("sitewhere.io/{}", LEGACY_VERSION),
        kind: "SiteWhereInstance".to_string(),
        plural: "instances".to_string(),
    }
}

impl SiteWhereInstance {
    /// Tag shared by the instance's microservice images, if one was recorded
    pub fn tag(&self) -> Option<&str> {
        self.spec.docker_spec.as_ref().map(|d| d.tag.as_str())
    }
}
