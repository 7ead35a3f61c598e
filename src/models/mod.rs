//! SiteWhere model layer
//!
//! Rust types for the SiteWhere custom resources (`sitewhere.io/v1alpha4`)
//! and the small enumerations the CLI accepts.

pub mod functional_area;
pub mod instance;
pub mod logging_level;
pub mod microservice;
pub mod profile;
pub mod tenant;

pub use functional_area::FunctionalArea;
pub use instance::{
    INSTANCE_API_VERSION, InstanceSpec, InstanceStatus, SiteWhereInstance, legacy_instance_resource,
};
pub use logging_level::LoggingLevel;
pub use microservice::{
    BootstrapState, DebugSpecification, DockerSpec, LoggingOverride, LoggingSpecification,
    MicroserviceSpec, MicroserviceStatus, PodSpecification, ServiceSpecification,
    SiteWhereMicroservice,
};
pub use profile::Profile;
pub use tenant::{SiteWhereTenant, TenantSpec};
