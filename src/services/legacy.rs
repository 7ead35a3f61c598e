//! Manifest-based installer
//!
//! Applies the bundled manifests directly through generic apply instead of
//! installing the platform chart. CRDs are applied first and each must be
//! Established before the next family goes in.

use std::collections::BTreeMap;

use serde::Serialize;
use tabled::Tabled;

use crate::constants::SYSTEM_NAMESPACE;
use crate::error::Result;
use crate::kube::readiness::{Poll, wait_for_crd};
use crate::kube::{Cluster, DeleteOutcome, ManifestObject};
use crate::manifests::ManifestArchive;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyOptions {
    pub minimal: bool,
    pub skip_crd: bool,
    pub skip_templates: bool,
    pub skip_operator: bool,
    pub skip_infra: bool,
}

impl LegacyOptions {
    /// Archive directories to install, in order
    pub fn families(&self) -> Vec<&'static str> {
        let mut families = Vec::new();
        if !self.skip_crd {
            families.push("crd");
        }
        if !self.skip_templates {
            families.push("templates");
        }
        if !self.skip_operator {
            families.push("operator");
        }
        if !self.skip_infra {
            families.push(if self.minimal { "infra-min" } else { "infra" });
        }
        families
    }
}

/// One manifest object and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ManifestResult {
    pub object: String,
    pub outcome: String,
}

fn system_namespace_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), SYSTEM_NAMESPACE.to_string()),
        ("istio-injection".to_string(), "enabled".to_string()),
    ])
}

fn objects_for(archive: &dyn ManifestArchive, options: &LegacyOptions) -> Result<Vec<ManifestObject>> {
    let mut objects = Vec::new();
    for family in options.families() {
        let found = archive.objects_in(family)?;
        tracing::debug!("{} objects in /{}", found.len(), family);
        objects.extend(found);
    }
    Ok(objects)
}

pub async fn legacy_install(
    cluster: &dyn Cluster,
    archive: &dyn ManifestArchive,
    options: &LegacyOptions,
    poll: Poll,
) -> Result<Vec<ManifestResult>> {
    cluster.is_reachable().await?;
    cluster
        .namespace_ensure(SYSTEM_NAMESPACE, system_namespace_labels())
        .await?;

    let mut results = Vec::new();
    for object in objects_for(archive, options)? {
        let outcome = cluster.apply_manifest(&object).await?;
        if object.kind == "CustomResourceDefinition" {
            wait_for_crd(cluster, &object.name, poll).await?;
        }
        results.push(ManifestResult {
            object: object.to_string(),
            outcome: outcome.to_string(),
        });
    }
    Ok(results)
}

pub async fn legacy_uninstall(
    cluster: &dyn Cluster,
    archive: &dyn ManifestArchive,
    options: &LegacyOptions,
) -> Result<Vec<ManifestResult>> {
    cluster.is_reachable().await?;

    let mut results = Vec::new();
    for object in objects_for(archive, options)?.into_iter().rev() {
        let outcome = match cluster.delete_manifest(&object).await? {
            DeleteOutcome::Deleted => "deleted",
            DeleteOutcome::Absent => "absent",
        };
        results.push(ManifestResult {
            object: object.to_string(),
            outcome: outcome.to_string(),
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::{ApplyOutcome, Created, MockCluster};
    use crate::manifests::EmbeddedArchive;
    use k8s_openapi::api::core::v1::Namespace;
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
        CustomResourceDefinition, CustomResourceDefinitionCondition,
        CustomResourceDefinitionStatus,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn established() -> CustomResourceDefinition {
        CustomResourceDefinition {
            status: Some(CustomResourceDefinitionStatus {
                conditions: Some(vec![CustomResourceDefinitionCondition {
                    type_: "Established".into(),
                    status: "True".into(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_families() {
        assert_eq!(
            LegacyOptions::default().families(),
            vec!["crd", "templates", "operator", "infra"]
        );
        let minimal = LegacyOptions {
            minimal: true,
            skip_templates: true,
            ..Default::default()
        };
        assert_eq!(minimal.families(), vec!["crd", "operator", "infra-min"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_applies_in_order() {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let log = applied.clone();

        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_namespace_ensure()
            .withf(|name, labels| {
                name == "sitewhere-system"
                    && labels.get("istio-injection").map(String::as_str) == Some("enabled")
            })
            .times(1)
            .returning(|_, _| Ok(Created::Created(Namespace::default())));
        cluster.expect_apply_manifest().returning(move |object| {
            log.lock().unwrap().push(object.kind.clone());
            Ok(ApplyOutcome::Created)
        });
        cluster.expect_get_crd().returning(|_| Ok(established()));

        let poll = Poll {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        };
        let options = LegacyOptions {
            skip_templates: true,
            skip_operator: true,
            skip_infra: true,
            ..Default::default()
        };
        let results = legacy_install(&cluster, &EmbeddedArchive, &options, poll)
            .await
            .unwrap();

        let kinds = applied.lock().unwrap().clone();
        assert_eq!(results.len(), kinds.len());
        assert!(kinds.iter().all(|k| k == "CustomResourceDefinition"));
        assert!(results[0].object.contains("instances.sitewhere.io"));
    }

    #[tokio::test]
    async fn test_uninstall_reverses_order() {
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let log = deleted.clone();

        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster.expect_delete_manifest().returning(move |object| {
            log.lock().unwrap().push(object.name.clone());
            Ok(DeleteOutcome::Absent)
        });

        let options = LegacyOptions {
            skip_templates: true,
            skip_operator: true,
            skip_infra: true,
            ..Default::default()
        };
        let results = legacy_uninstall(&cluster, &EmbeddedArchive, &options).await.unwrap();
        let names = deleted.lock().unwrap().clone();
        assert_eq!(names.last().map(String::as_str), Some("instances.sitewhere.io"));
        assert!(results.iter().all(|r| r.outcome == "absent"));
    }
}
