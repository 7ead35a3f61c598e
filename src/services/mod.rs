//! Service layer
//!
//! Each action the CLI exposes is an async function taking the
//! [`Cluster`](crate::kube::Cluster) gateway plus whatever local
//! collaborators it needs, and returning a serializable result.

pub mod check_install;
pub mod instance;
pub mod legacy;
pub mod logs;
pub mod platform;
pub mod tenant;

pub use check_install::{CheckInstallResult, CrdStatus, check_install};
pub use instance::{
    InstanceCreated, InstanceDeleted, InstanceListing, InstanceRequest, InstanceSummary,
    MicroserviceSummary, create_instance, delete_instance, list_instances,
};
pub use legacy::{LegacyOptions, ManifestResult, legacy_install, legacy_uninstall};
pub use logs::{LogLevelChanged, follow_logs, rewrite_overrides, set_log_level};
pub use platform::{InstallOptions, install, set_path, uninstall, values_matrix};
pub use tenant::{TenantOutcome, TenantRequest, create_tenant, delete_tenant};
