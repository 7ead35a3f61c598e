//! Platform installer and uninstaller
//!
//! Install runs: mesh prerequisite, repository add, repository refresh,
//! chart resolve, dependency check, values assembly, chart install. The
//! mesh check happens before any repository or chart work. With `--wait`
//! the install also blocks until the operator deployment is ready.

use std::path::PathBuf;

use serde_json::{Map, Value, json};

use crate::chart::{Chart, ChartDriver, InstallRequest, ReleaseInfo};
use crate::constants::{
    CHART_NAME, DEFAULT_CHART_VERSION, MESH_MISSING_MESSAGE, MESH_NAMESPACE, OPERATOR_DEPLOYMENT,
    READINESS_TIMEOUT, RELEASE_NAME, REPO_NAME, REPO_URL, SYSTEM_NAMESPACE,
};
use crate::error::{Error, Result};
use crate::kube::Cluster;
use crate::kube::readiness::{Poll, wait_for_deployment};
use crate::repo::RepoManager;

/// Sub-charts switched by `--skip-infra`
const INFRASTRUCTURE: &[&str] = &[
    "postgresql",
    "influxdb",
    "redis",
    "nifi",
    "mosquitto",
    "strimzi",
    "keycloak",
];

/// Values paths that take the storage class
const STORAGE_CLASS_PATHS: &[&str] = &[
    "influxdb.persistence.storageClass",
    "redis.global.storageClass",
    "redis.master.persistence.storageClass",
    "redis.slave.persistence.storageClass",
    "nifi.persistence.storageClass",
    "nifi.zookeeper.global.storageClass",
    "nifi.zookeeper.persistence.storageClass",
    "postgresql.global.storageClass",
    "postgresql.persistence.storageClass",
    "keycloak.postgresql.persistence.storageClass",
    "strimzi.storage.class",
];

/// Flags of `install`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub wait: bool,
    pub skip_crd: bool,
    pub skip_templates: bool,
    pub skip_operator: bool,
    pub skip_infra: bool,
    pub minimal: bool,
    pub storage_class: String,
    pub kafka_storage_size: String,
    pub chart_version: Option<String>,
    pub dependency_update: bool,
}

/// Set a dotted path in a JSON object, creating intermediate objects
pub fn set_path(values: &mut Value, path: &str, value: Value) {
    let mut current = values;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Chart values for the install flags
pub fn values_matrix(options: &InstallOptions) -> Value {
    let mut values = json!({});

    set_path(&mut values, "operator.enabled", json!(!options.skip_operator));
    set_path(&mut values, "templates.enabled", json!(!options.skip_templates));
    set_path(&mut values, "tags.infrastructure", json!(!options.skip_infra));
    for component in INFRASTRUCTURE {
        set_path(&mut values, &format!("{}.enabled", component), json!(!options.skip_infra));
    }

    if options.minimal {
        set_path(&mut values, "strimzi.replicas", json!(1));
        set_path(&mut values, "strimzi.isr", json!(1));
    }

    if !options.storage_class.is_empty() {
        for path in STORAGE_CLASS_PATHS {
            set_path(&mut values, path, json!(options.storage_class));
        }
        set_path(&mut values, "strimzi.storage.type", json!("persistent-claim"));
    }

    if !options.kafka_storage_size.is_empty() {
        set_path(&mut values, "strimzi.storage.size", json!(options.kafka_storage_size));
    }

    values
}

/// Fail unless the service mesh namespace exists
pub async fn check_mesh(cluster: &dyn Cluster) -> Result<()> {
    if cluster.namespace_exists(MESH_NAMESPACE).await? {
        tracing::debug!("Found service mesh namespace {}", MESH_NAMESPACE);
        Ok(())
    } else {
        Err(Error::Other(anyhow::anyhow!(MESH_MISSING_MESSAGE)))
    }
}

pub async fn install(
    cluster: &dyn Cluster,
    repos: &RepoManager,
    driver: &dyn ChartDriver,
    options: &InstallOptions,
) -> Result<ReleaseInfo> {
    cluster.is_reachable().await?;
    check_mesh(cluster).await?;

    repos.ensure_repo(REPO_NAME, REPO_URL).await?;
    for update in repos.update_all_repos().await? {
        if let Some(error) = &update.error {
            tracing::warn!("Repository '{}' was not refreshed: {}", update.name, error);
        }
    }

    let version = options
        .chart_version
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CHART_VERSION);
    let archive = repos.resolve_chart(REPO_NAME, CHART_NAME, Some(version)).await?;
    tracing::debug!("Resolved {}/{} {} to {}", REPO_NAME, CHART_NAME, version, archive.display());

    let chart = Chart::load(&archive)?;
    chart.validate_installable()?;

    // Keeps an unpacked chart alive until the install finishes
    let mut scratch = None;
    let chart_path = prepare_dependencies(&chart, driver, options.dependency_update, &mut scratch).await?;

    let request = InstallRequest {
        release: RELEASE_NAME.to_string(),
        namespace: SYSTEM_NAMESPACE.to_string(),
        chart: chart_path,
        values: values_matrix(options),
        create_namespace: true,
        skip_crds: options.skip_crd,
        wait: options.wait,
        timeout: READINESS_TIMEOUT,
    };
    let release = driver.install(&request).await?;
    tracing::info!("Installed release '{}' in {}", release.release_name, release.namespace);

    wait_for_operator(cluster, options, Poll::default()).await?;
    Ok(release)
}

/// Block until the operator is ready, when the install waits and deploys it
pub async fn wait_for_operator(cluster: &dyn Cluster, options: &InstallOptions, poll: Poll) -> Result<()> {
    if !options.wait || options.skip_operator {
        return Ok(());
    }
    tracing::info!("Waiting for deployment {}/{}", SYSTEM_NAMESPACE, OPERATOR_DEPLOYMENT);
    wait_for_deployment(cluster, SYSTEM_NAMESPACE, OPERATOR_DEPLOYMENT, poll).await
}

async fn prepare_dependencies(
    chart: &Chart,
    driver: &dyn ChartDriver,
    dependency_update: bool,
    scratch: &mut Option<tempfile::TempDir>,
) -> Result<PathBuf> {
    let missing = chart.missing_dependencies();
    if missing.is_empty() {
        return Ok(chart.path.clone());
    }
    if !dependency_update {
        return Err(Error::Other(anyhow::anyhow!(
            "found in Chart.yaml, but missing in charts/ directory: {}",
            missing.join(", ")
        )));
    }

    tracing::info!("Updating chart dependencies: {}", missing.join(", "));
    let dir = tempfile::Builder::new().prefix("swctl-chart-").tempdir()?;
    let chart_dir = chart.unpack(dir.path())?;
    driver.dependency_update(&chart_dir).await?;
    *scratch = Some(dir);
    Ok(chart_dir)
}

pub async fn uninstall(cluster: &dyn Cluster, driver: &dyn ChartDriver, purge: bool) -> Result<ReleaseInfo> {
    cluster.is_reachable().await?;
    let release = driver.uninstall(RELEASE_NAME, SYSTEM_NAMESPACE).await?;
    tracing::info!("Uninstalled release '{}'", release.release_name);
    if purge {
        cluster.namespace_delete(SYSTEM_NAMESPACE).await?;
    }
    Ok(release)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::MockChartDriver;
    use crate::chart::testing::chart_archive;
    use crate::kube::{DeleteOutcome, MockCluster};

    #[test]
    fn test_set_path_creates_and_overwrites() {
        let mut values = json!({"a": 1});
        set_path(&mut values, "a.b.c", json!(true));
        set_path(&mut values, "a.b.d", json!("x"));
        assert_eq!(values, json!({"a": {"b": {"c": true, "d": "x"}}}));
    }

    #[test]
    fn test_defaults_enable_everything() {
        let values = values_matrix(&InstallOptions::default());
        assert_eq!(values["operator"]["enabled"], true);
        assert_eq!(values["templates"]["enabled"], true);
        assert_eq!(values["tags"]["infrastructure"], true);
        for component in INFRASTRUCTURE {
            assert_eq!(values[component]["enabled"], true, "{}", component);
        }
        assert!(values["strimzi"].get("storage").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waited_install_polls_operator() {
        let mut cluster = MockCluster::new();
        cluster
            .expect_get_deployment()
            .withf(|ns, name| ns == "sitewhere-system" && name == "sitewhere-operator")
            .times(1)
            .returning(|_, name| Err(Error::not_found("deployment", name)));
        let options = InstallOptions {
            wait: true,
            ..InstallOptions::default()
        };
        let poll = Poll {
            interval: std::time::Duration::from_secs(2),
            timeout: std::time::Duration::from_secs(1),
        };

        let err = wait_for_operator(&cluster, &options, poll).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unwaited_or_operatorless_install_skips_polling() {
        let mut cluster = MockCluster::new();
        cluster.expect_get_deployment().never();

        wait_for_operator(&cluster, &InstallOptions::default(), Poll::default())
            .await
            .unwrap();
        let options = InstallOptions {
            wait: true,
            skip_operator: true,
            ..InstallOptions::default()
        };
        wait_for_operator(&cluster, &options, Poll::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_mesh_aborts_before_chart_work() {
        let dir = tempfile::tempdir().unwrap();
        let repos = RepoManager::new(dir.path().join("repositories.yaml"), dir.path().join("cache")).unwrap();
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_namespace_exists()
            .withf(|ns| ns == "istio-system")
            .returning(|_| Ok(false));
        let mut driver = MockChartDriver::new();
        driver.expect_install().never();
        driver.expect_dependency_update().never();

        let err = install(&cluster, &repos, &driver, &InstallOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Istio is not installed"));
        assert!(!dir.path().join("repositories.yaml").exists());
    }

    #[tokio::test]
    async fn test_unmet_dependencies_abort_without_update() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("chart.tgz");
        std::fs::write(
            &archive,
            chart_archive(&[(
                "sitewhere-infrastructure/Chart.yaml",
                b"apiVersion: v2\nname: sitewhere-infrastructure\nversion: 0.1.10\ndependencies:\n  - name: redis\n    version: 10.5.7\n",
            )]),
        )
        .unwrap();
        let chart = Chart::load(&archive).unwrap();
        let driver = MockChartDriver::new();
        let mut scratch = None;

        let err = prepare_dependencies(&chart, &driver, false, &mut scratch)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing in charts/ directory: redis"));
    }

    #[tokio::test]
    async fn test_dependency_update_runs_on_unpacked_chart() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("chart.tgz");
        std::fs::write(
            &archive,
            chart_archive(&[(
                "sitewhere-infrastructure/Chart.yaml",
                b"apiVersion: v2\nname: sitewhere-infrastructure\nversion: 0.1.10\ndependencies:\n  - name: redis\n    version: 10.5.7\n",
            )]),
        )
        .unwrap();
        let chart = Chart::load(&archive).unwrap();
        let mut driver = MockChartDriver::new();
        driver
            .expect_dependency_update()
            .withf(|path| path.ends_with("sitewhere-infrastructure"))
            .times(1)
            .returning(|_| Ok(()));
        let mut scratch = None;

        let path = prepare_dependencies(&chart, &driver, true, &mut scratch).await.unwrap();
        assert!(path.join("Chart.yaml").exists());
        assert!(scratch.is_some());
    }

    #[tokio::test]
    async fn test_uninstall_with_purge() {
        let mut cluster = MockCluster::new();
        cluster.expect_is_reachable().returning(|| Ok(()));
        cluster
            .expect_namespace_delete()
            .withf(|ns| ns == "sitewhere-system")
            .times(1)
            .returning(|_| Ok(DeleteOutcome::Absent));
        let mut driver = MockChartDriver::new();
        driver.expect_uninstall().returning(|release, namespace| {
            Ok(ReleaseInfo {
                release_name: release.to_string(),
                namespace: namespace.to_string(),
            })
        });

        let release = uninstall(&cluster, &driver, true).await.unwrap();
        assert_eq!(release.release_name, "sitewhere");
        assert_eq!(release.namespace, "sitewhere-system");
    }
}
