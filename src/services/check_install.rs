//! Installation health report

use serde::Serialize;
use tabled::Tabled;

use crate::constants::{MESH_NAMESPACE, RELEASE_NAME, SYSTEM_NAMESPACE};
use crate::error::Result;
use crate::kube::helm_release::{ReleaseSummary, latest_release};
use crate::kube::readiness::crd_established;
use crate::kube::{Cluster, ManifestObject};
use crate::manifests::ManifestArchive;

/// State of one bundled custom resource definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CrdStatus {
    pub name: String,
    pub established: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInstallResult {
    pub mesh_installed: bool,
    pub system_namespace: bool,
    pub custom_resource_definitions: Vec<CrdStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseSummary>,
}

impl CheckInstallResult {
    /// Every component present and ready
    pub fn healthy(&self) -> bool {
        self.mesh_installed
            && self.system_namespace
            && self.custom_resource_definitions.iter().all(|c| c.established)
            && self
                .release
                .as_ref()
                .is_some_and(|r| r.status == "deployed")
    }
}

/// Names of the CRDs in the archive's `crd` directory
pub fn bundled_crds(archive: &dyn ManifestArchive) -> Result<Vec<String>> {
    Ok(archive
        .objects_in("crd")?
        .into_iter()
        .filter(|object: &ManifestObject| object.kind == "CustomResourceDefinition")
        .map(|object| object.name)
        .collect())
}

pub async fn check_install(
    cluster: &dyn Cluster,
    archive: &dyn ManifestArchive,
) -> Result<CheckInstallResult> {
    cluster.is_reachable().await?;

    let mesh_installed = cluster.namespace_exists(MESH_NAMESPACE).await?;
    let system_namespace = cluster.namespace_exists(SYSTEM_NAMESPACE).await?;

    let mut custom_resource_definitions = Vec::new();
    for name in bundled_crds(archive)? {
        let established = match cluster.get_crd(&name).await {
            Ok(crd) => crd_established(&crd),
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };
        custom_resource_definitions.push(CrdStatus { name, established });
    }

    let release = match latest_release(cluster, SYSTEM_NAMESPACE, RELEASE_NAME).await {
        Ok(release) => Some(release),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    Ok(CheckInstallResult {
        mesh_installed,
        system_namespace,
        custom_resource_definitions,
        release,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::kube::MockCluster;
    use crate::manifests::EmbeddedArchive;

    #[test]
    fn test_bundled_crds() {
        let names = bundled_crds(&EmbeddedArchive).unwrap();
        assert!(names.contains(&"instances.sitewhere.io".to_string()));
        assert!(names.contains(&"microservices.sitewhere.io".to_string()));
        assert!(names.contains(&"tenants.sitewhere.io".to_string()));
    }

    #[tokio::test]
    async fn test_nothing_installed() {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster.expect_namespace_exists().returning(|_| Ok(false));
        cluster
            .expect_get_crd()
            .returning(|name| Err(Error::not_found("custom resource definition", name)));
        cluster.expect_list_secrets().returning(|_, _| Ok(vec![]));

        let result = check_install(&cluster, &EmbeddedArchive).await.unwrap();
        assert!(!result.mesh_installed);
        assert!(result.release.is_none());
        assert!(!result.custom_resource_definitions.is_empty());
        assert!(result.custom_resource_definitions.iter().all(|c| !c.established));
        assert!(!result.healthy());
    }

    #[tokio::test]
    async fn test_unreachable() {
        let mut cluster = MockCluster::new();
        cluster
            .expect_is_reachable()
            .returning(|| Err(Error::Unreachable("connection refused".into())));
        let err = check_install(&cluster, &EmbeddedArchive).await.unwrap_err();
        assert!(matches!(err, Error::Unreachable(_)));
    }
}
