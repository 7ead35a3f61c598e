//! Log level mutation and log streaming for microservices

use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::kube::Cluster;
use crate::models::{LoggingLevel, LoggingOverride, SiteWhereInstance, SiteWhereMicroservice};

/// Result of `log-level`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLevelChanged {
    pub instance: String,
    pub microservice: String,
    pub overrides: Vec<LoggingOverride>,
}

/// Set `level` on every selected override, or on all of them when
/// `selected` is empty
///
/// Order and length are preserved; loggers never change.
pub fn rewrite_overrides(
    overrides: &[LoggingOverride],
    selected: &[String],
    level: LoggingLevel,
) -> Vec<LoggingOverride> {
    overrides
        .iter()
        .map(|entry| {
            if selected.is_empty() || selected.iter().any(|s| s == &entry.logger) {
                LoggingOverride::new(entry.logger.clone(), level.as_str())
            } else {
                entry.clone()
            }
        })
        .collect()
}

async fn lookup(
    cluster: &dyn Cluster,
    instance: &str,
    microservice: &str,
) -> Result<(SiteWhereInstance, SiteWhereMicroservice)> {
    cluster.is_reachable().await?;
    let instance = cluster
        .get_instance(instance)
        .await
        .map_err(|e| e.with_kind("sitewhere instance"))?;
    let namespace = instance.metadata.name.clone().unwrap_or_default();
    let microservice = cluster
        .get_microservice(&namespace, microservice)
        .await
        .map_err(|e| e.with_kind("sitewhere microservice"))?;
    Ok((instance, microservice))
}

pub async fn set_log_level(
    cluster: &dyn Cluster,
    instance: &str,
    microservice: &str,
    level: LoggingLevel,
    loggers: &[String],
) -> Result<LogLevelChanged> {
    let (_, mut target) = lookup(cluster, instance, microservice).await?;

    let logging = target.spec.logging.get_or_insert_with(Default::default);
    logging.overrides = rewrite_overrides(&logging.overrides, loggers, level);
    let overrides = logging.overrides.clone();
    tracing::debug!("Setting {} loggers of {} to {}", overrides.len(), microservice, level);

    // Conflict on a stale resourceVersion goes straight to the caller
    cluster.update_microservice(&target).await?;

    Ok(LogLevelChanged {
        instance: instance.to_string(),
        microservice: microservice.to_string(),
        overrides,
    })
}

/// Copy the log of the microservice's first pod to `out`, line by line
pub async fn follow_logs<W>(
    cluster: &dyn Cluster,
    instance: &str,
    microservice: &str,
    follow: bool,
    out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let (instance, microservice) = lookup(cluster, instance, microservice).await?;
    let namespace = instance.metadata.name.clone().unwrap_or_default();
    let container = microservice.metadata.name.clone().unwrap_or_default();
    let deployment_name = microservice
        .status
        .as_ref()
        .and_then(|status| status.deployment.clone())
        .ok_or_else(|| {
            Error::Other(anyhow::anyhow!(
                "microservice '{}' has no deployment yet",
                container
            ))
        })?;

    let deployment = cluster.get_deployment(&namespace, &deployment_name).await?;
    let pods = cluster.pods_for_deployment(&deployment).await?;
    let pod = pods
        .first()
        .and_then(|pod| pod.metadata.name.clone())
        .ok_or_else(|| Error::not_found("pod for deployment", &deployment_name))?;
    tracing::debug!("Streaming logs of {}/{} container {}", namespace, pod, container);

    let mut lines = cluster.pod_logs(&namespace, &pod, &container, follow).await?;
    while let Some(line) = lines.next().await {
        let line = line?;
        out.write_all(&line).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::MockCluster;
    use crate::models::{InstanceSpec, LoggingSpecification, MicroserviceSpec, MicroserviceStatus};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::Pod;
    use kube::api::ObjectMeta;

    fn overrides() -> Vec<LoggingOverride> {
        vec![
            LoggingOverride::new("com.sitewhere", "info"),
            LoggingOverride::new("com.sitewhere.sources", "info"),
        ]
    }

    fn microservice() -> SiteWhereMicroservice {
        let spec: MicroserviceSpec = serde_json::from_value(serde_json::json!({
            "functionalArea": "event-sources",
            "name": "Event Sources"
        }))
        .unwrap();
        let mut ms = SiteWhereMicroservice::new(
            "event-sources",
            MicroserviceSpec {
                logging: Some(LoggingSpecification { overrides: overrides() }),
                ..spec
            },
        );
        ms.metadata.namespace = Some("sitewhere".into());
        ms.status = Some(MicroserviceStatus {
            deployment: Some("sitewhere-event-sources".into()),
            ..Default::default()
        });
        ms
    }

    fn cluster() -> MockCluster {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_get_instance()
            .returning(|name| Ok(SiteWhereInstance::new(name, InstanceSpec::default())));
        cluster
            .expect_get_microservice()
            .withf(|ns, _| ns == "sitewhere")
            .returning(|_, _| Ok(microservice()));
        cluster
    }

    #[test]
    fn test_rewrite_selected() {
        let out = rewrite_overrides(
            &overrides(),
            &["com.sitewhere.sources".to_string()],
            LoggingLevel::Debug,
        );
        assert_eq!(
            out,
            vec![
                LoggingOverride::new("com.sitewhere", "info"),
                LoggingOverride::new("com.sitewhere.sources", "debug"),
            ]
        );
    }

    #[test]
    fn test_rewrite_all_when_none_selected() {
        let out = rewrite_overrides(&overrides(), &[], LoggingLevel::Warn);
        assert!(out.iter().all(|o| o.level == "warn"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_unknown_logger_changes_nothing() {
        let out = rewrite_overrides(&overrides(), &["org.redisson".to_string()], LoggingLevel::Off);
        assert_eq!(out, overrides());
    }

    #[tokio::test]
    async fn test_set_log_level_persists() {
        let mut cluster = cluster();
        cluster
            .expect_update_microservice()
            .withf(|ms| {
                ms.spec.logging.as_ref().unwrap().overrides[1].level == "debug"
                    && ms.spec.logging.as_ref().unwrap().overrides[0].level == "info"
            })
            .times(1)
            .returning(|ms| Ok(ms.clone()));

        let changed = set_log_level(
            &cluster,
            "sitewhere",
            "event-sources",
            LoggingLevel::Debug,
            &["com.sitewhere.sources".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(changed.overrides.len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_is_surfaced() {
        let mut cluster = cluster();
        cluster.expect_update_microservice().times(1).returning(|_| {
            Err(Error::Conflict {
                kind: "sitewhere microservice".into(),
                name: "event-sources".into(),
                message: "the object has been modified".into(),
            })
        });

        let err = set_log_level(&cluster, "sitewhere", "event-sources", LoggingLevel::Info, &[])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_missing_microservice() {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_get_instance()
            .returning(|name| Ok(SiteWhereInstance::new(name, InstanceSpec::default())));
        cluster
            .expect_get_microservice()
            .returning(|_, name| Err(Error::not_found("sitewhere microservice", name)));

        let err = set_log_level(&cluster, "sitewhere", "billing", LoggingLevel::Info, &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "sitewhere microservice 'billing' not found");
    }

    #[tokio::test]
    async fn test_follow_logs_copies_first_pod() {
        let mut cluster = cluster();
        cluster
            .expect_get_deployment()
            .withf(|ns, name| ns == "sitewhere" && name == "sitewhere-event-sources")
            .returning(|_, _| Ok(Deployment::default()));
        cluster.expect_pods_for_deployment().returning(|_| {
            let pod = |name: &str| Pod {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            };
            Ok(vec![pod("event-sources-a"), pod("event-sources-b")])
        });
        cluster
            .expect_pod_logs()
            .withf(|_, pod, container, follow| {
                pod == "event-sources-a" && container == "event-sources" && !*follow
            })
            .returning(|_, _, _, _| {
                let lines = vec![Ok(b"started".to_vec()), Ok(b"ready".to_vec())];
                Ok(futures::stream::iter(lines).boxed())
            });

        let mut out = Vec::new();
        follow_logs(&cluster, "sitewhere", "event-sources", false, &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "started\nready\n");
    }

    #[tokio::test]
    async fn test_follow_logs_copies_undecodable_lines() {
        let mut cluster = cluster();
        cluster
            .expect_get_deployment()
            .returning(|_, _| Ok(Deployment::default()));
        cluster.expect_pods_for_deployment().returning(|_| {
            Ok(vec![Pod {
                metadata: ObjectMeta {
                    name: Some("event-sources-a".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }])
        });
        cluster.expect_pod_logs().returning(|_, _, _, _| {
            let lines = vec![Ok(b"latin-1 \xe9t\xe9".to_vec()), Ok(b"after".to_vec())];
            Ok(futures::stream::iter(lines).boxed())
        });

        let mut out = Vec::new();
        follow_logs(&cluster, "sitewhere", "event-sources", true, &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"latin-1 \xe9t\xe9\nafter\n".to_vec());
    }

    #[tokio::test]
    async fn test_follow_logs_without_pods() {
        let mut cluster = cluster();
        cluster
            .expect_get_deployment()
            .returning(|_, _| Ok(Deployment::default()));
        cluster.expect_pods_for_deployment().returning(|_| Ok(vec![]));
        cluster.expect_pod_logs().never();

        let mut out = Vec::new();
        let err = follow_logs(&cluster, "sitewhere", "event-sources", true, &mut out)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
