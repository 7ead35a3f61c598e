//! SiteWhereTenant custom resource

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tenant living in its instance's namespace
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "sitewhere.io",
    version = "v1alpha4",
    kind = "SiteWhereTenant",
    plural = "tenants",
    singular = "tenant",
    shortname = "swt",
    namespaced,
    derive = "PartialEq",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    pub name: String,
    #[serde(default)]
    pub authentication_token: String,
    #[serde(default)]
    pub authorized_user_ids: BTreeSet<String>,
    #[serde(default)]
    pub configuration_template: String,
    #[serde(default)]
    pub dataset_template: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_field_names() {
        let tenant = SiteWhereTenant::new(
            "t1",
            TenantSpec {
                name: "t1".into(),
                authentication_token: "t1".into(),
                authorized_user_ids: ["admin".to_string()].into_iter().collect(),
                configuration_template: "default".into(),
                dataset_template: "default".into(),
            },
        );
        let value = serde_json::to_value(&tenant).unwrap();
        assert_eq!(value["kind"], "SiteWhereTenant");
        assert_eq!(value["spec"]["authorizedUserIds"][0], "admin");
        assert_eq!(value["spec"]["authenticationToken"], "t1");
    }
}
