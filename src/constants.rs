//! Fixed identifiers used throughout swctl
//!
//! Centralizes names and timings shared by the installer, the
//! materializer and the readiness helpers.

use std::time::Duration;

/// Namespace holding the platform's cluster-wide infrastructure
pub const SYSTEM_NAMESPACE: &str = "sitewhere-system";

/// Deployment of the platform operator in [`SYSTEM_NAMESPACE`]
pub const OPERATOR_DEPLOYMENT: &str = "sitewhere-operator";

/// Helm release name of the platform chart
pub const RELEASE_NAME: &str = "sitewhere";

/// Name under which the chart repository is registered
pub const REPO_NAME: &str = "sitewhere";

/// Chart repository URL
pub const REPO_URL: &str = "https://sitewhere.io/helm-charts";

/// Platform chart name
pub const CHART_NAME: &str = "sitewhere-infrastructure";

/// Default platform chart version
pub const DEFAULT_CHART_VERSION: &str = "0.1.10";

/// Namespace whose presence proves the service mesh is installed
pub const MESH_NAMESPACE: &str = "istio-system";

/// Message shown when the service mesh is missing
pub const MESH_MISSING_MESSAGE: &str = "Istio is not installed. SiteWhere requires Istio in namespace 'istio-system'; install it first (https://istio.io/latest/docs/setup/getting-started/)";

/// Default instance name when none is given
pub const DEFAULT_INSTANCE_NAME: &str = "sitewhere";

/// Default image tag for microservices
pub const DEFAULT_TAG: &str = "3.0";

/// Default image registry for microservices
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Default image repository for microservices
pub const DEFAULT_REPOSITORY: &str = "sitewhere";

/// Default configuration and dataset template key
pub const DEFAULT_TEMPLATE: &str = "default";

/// Configuration template key used by the minimal profile
pub const MINIMAL_TEMPLATE: &str = "minimal";

/// Bounded wait for the repository file lock
pub const REPO_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for the repository file lock
pub const REPO_LOCK_POLL: Duration = Duration::from_secs(1);

/// Poll interval for readiness checks
pub const READINESS_POLL: Duration = Duration::from_secs(2);

/// Deadline for readiness checks
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for repository index and chart downloads
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
