//! Tenant management
//!
//! Tenants live in their instance's namespace. The parent instance must be
//! visible before a tenant is created under it.

use std::collections::BTreeSet;

use serde::Serialize;
use tabled::Tabled;

use crate::constants::DEFAULT_TEMPLATE;
use crate::error::{Error, Result};
use crate::kube::{Cluster, DeleteOutcome, create_if_absent, delete_if_present};
use crate::models::{SiteWhereTenant, TenantSpec};

/// User granted access to new tenants when none are named
pub const DEFAULT_AUTHORIZED_USER: &str = "admin";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantRequest {
    pub name: String,
    pub instance: String,
    pub authentication_token: String,
    pub authorized_user_ids: Vec<String>,
    pub configuration_template: String,
    pub dataset_template: String,
}

impl TenantRequest {
    /// Build the tenant resource, filling empty fields with defaults
    pub fn to_resource(&self) -> SiteWhereTenant {
        let or_default = |value: &str, default: &str| {
            if value.is_empty() { default.to_string() } else { value.to_string() }
        };
        let mut users: BTreeSet<String> = self
            .authorized_user_ids
            .iter()
            .filter(|u| !u.is_empty())
            .cloned()
            .collect();
        if users.is_empty() {
            users.insert(DEFAULT_AUTHORIZED_USER.to_string());
        }

        let mut tenant = SiteWhereTenant::new(
            &self.name,
            TenantSpec {
                name: self.name.clone(),
                authentication_token: or_default(&self.authentication_token, &self.name),
                authorized_user_ids: users,
                configuration_template: or_default(&self.configuration_template, DEFAULT_TEMPLATE),
                dataset_template: or_default(&self.dataset_template, DEFAULT_TEMPLATE),
            },
        );
        tenant.metadata.namespace = Some(self.instance.clone());
        tenant
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TenantOutcome {
    pub name: String,
    pub namespace: String,
    /// `created`, `existing`, `deleted` or `absent`
    pub status: String,
}

fn require_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::bad_input(format!("{} name is required", what)));
    }
    Ok(())
}

pub async fn create_tenant(cluster: &dyn Cluster, request: TenantRequest) -> Result<TenantOutcome> {
    require_name(&request.name, "tenant")?;
    require_name(&request.instance, "instance")?;
    cluster.is_reachable().await?;

    cluster
        .get_instance(&request.instance)
        .await
        .map_err(|e| e.with_kind("sitewhere instance"))?;

    let tenant = request.to_resource();
    let tenant = &tenant;
    let (namespace, name) = (request.instance.as_str(), request.name.as_str());
    let outcome = create_if_absent(
        "sitewhere tenant",
        name,
        || async move { cluster.get_tenant(namespace, name).await },
        || async move { cluster.create_tenant(tenant).await },
    )
    .await?;

    Ok(TenantOutcome {
        name: request.name.clone(),
        namespace: request.instance.clone(),
        status: if outcome.was_created() { "created" } else { "existing" }.to_string(),
    })
}

pub async fn delete_tenant(cluster: &dyn Cluster, instance: &str, name: &str) -> Result<TenantOutcome> {
    require_name(name, "tenant")?;
    require_name(instance, "instance")?;
    cluster.is_reachable().await?;

    let outcome = delete_if_present("sitewhere tenant", name, || async move {
        cluster.delete_tenant(instance, name).await
    })
    .await?;

    Ok(TenantOutcome {
        name: name.to_string(),
        namespace: instance.to_string(),
        status: match outcome {
            DeleteOutcome::Deleted => "deleted",
            DeleteOutcome::Absent => "absent",
        }
        .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::MockCluster;
    use crate::models::{InstanceSpec, SiteWhereInstance};

    fn reachable() -> MockCluster {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
    }

    fn request() -> TenantRequest {
        TenantRequest {
            name: "t1".into(),
            instance: "sitewhere".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resource_defaults() {
        let tenant = request().to_resource();
        assert_eq!(tenant.metadata.name.as_deref(), Some("t1"));
        assert_eq!(tenant.metadata.namespace.as_deref(), Some("sitewhere"));
        assert_eq!(tenant.spec.authentication_token, "t1");
        assert!(tenant.spec.authorized_user_ids.contains("admin"));
        assert_eq!(tenant.spec.configuration_template, "default");
    }

    #[tokio::test]
    async fn test_create_under_present_instance() {
        let mut cluster = reachable();
        cluster
            .expect_get_instance()
            .returning(|name| Ok(SiteWhereInstance::new(name, InstanceSpec::default())));
        cluster
            .expect_get_tenant()
            .returning(|_, name| Err(Error::not_found("sitewhere tenant", name)));
        cluster
            .expect_create_tenant()
            .withf(|t| t.metadata.namespace.as_deref() == Some("sitewhere"))
            .times(1)
            .returning(|t| Ok(t.clone()));

        let outcome = create_tenant(&cluster, request()).await.unwrap();
        assert_eq!(outcome.status, "created");
    }

    #[tokio::test]
    async fn test_create_requires_instance() {
        let mut cluster = reachable();
        cluster
            .expect_get_instance()
            .returning(|name| Err(Error::not_found("sitewhere instance", name)));
        cluster.expect_create_tenant().never();

        let err = create_tenant(&cluster, request()).await.unwrap_err();
        assert_eq!(err.to_string(), "sitewhere instance 'sitewhere' not found");
    }

    #[tokio::test]
    async fn test_delete_absent_is_success() {
        let mut cluster = reachable();
        cluster
            .expect_delete_tenant()
            .returning(|_, name| Err(Error::not_found("sitewhere tenant", name)));

        let outcome = delete_tenant(&cluster, "sitewhere", "t1").await.unwrap();
        assert_eq!(outcome.status, "absent");
    }

    #[tokio::test]
    async fn test_missing_instance_name() {
        let cluster = MockCluster::new();
        let err = delete_tenant(&cluster, "", "t1").await.unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }
}
