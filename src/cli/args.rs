//! Command line surface

use clap::{Args, Parser, Subcommand};

use super::output::OutputFormat;

/// swctl - SiteWhere control
#[derive(Parser, Debug)]
#[command(name = "swctl", version)]
#[command(about = "Install and operate SiteWhere on Kubernetes", long_about = None)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format for commands that return data
    #[arg(short = 'o', long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the SiteWhere platform chart
    Install(InstallArgs),
    /// Uninstall the SiteWhere platform chart
    Uninstall {
        /// Also delete the sitewhere-system namespace
        #[arg(long)]
        purge: bool,
    },
    /// Report what parts of SiteWhere are installed
    CheckInstall,
    /// Create SiteWhere resources
    Create {
        #[command(subcommand)]
        resource: CreateCommand,
    },
    /// Delete SiteWhere resources
    Delete {
        #[command(subcommand)]
        resource: DeleteCommand,
    },
    /// List instances, or show one with its microservices
    Instances {
        /// Instance name
        args: Vec<String>,
    },
    /// Show the log of a microservice
    Logs {
        instance: String,
        microservice: String,
        /// Keep streaming new lines
        #[arg(short = 'f', long)]
        follow: bool,
    },
    /// Change logger levels of a microservice
    LogLevel {
        instance: String,
        microservice: String,
        /// One of debug, info, warn, error, fatal, off
        level: String,
        /// Only change these loggers (repeatable); all loggers when omitted
        #[arg(long = "logger")]
        loggers: Vec<String>,
    },
    /// Print version information
    Version {
        /// Print only the version number
        #[arg(long)]
        short: bool,
        /// Template using {{ .Version }} and {{ .Name }}
        #[arg(long)]
        template: Option<String>,
    },
    /// Install or remove the bundled manifests without the chart
    Legacy {
        #[command(subcommand)]
        command: LegacyCommand,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Wait until the release is ready
    #[arg(long)]
    pub wait: bool,
    /// Do not install custom resource definitions
    #[arg(long)]
    pub skip_crd: bool,
    /// Do not install templates
    #[arg(long)]
    pub skip_templates: bool,
    /// Do not install the operator
    #[arg(long)]
    pub skip_operator: bool,
    /// Do not install infrastructure
    #[arg(long)]
    pub skip_infra: bool,
    /// Single-replica infrastructure
    #[arg(short = 'm', long)]
    pub minimal: bool,
    /// Storage class for persistent volumes
    #[arg(long, default_value = "")]
    pub storage_class: String,
    /// Size of the Kafka volumes
    #[arg(long, default_value = "")]
    pub kafka_storage_size: String,
    /// Platform chart version
    #[arg(long)]
    pub chart_version: Option<String>,
    /// Fetch missing chart dependencies before installing
    #[arg(long)]
    pub dependency_update: bool,
}

#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Create an instance
    Instance(CreateInstanceArgs),
    /// Create a tenant under an instance
    Tenant(CreateTenantArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateInstanceArgs {
    /// Instance name (default: sitewhere)
    pub args: Vec<String>,
    /// Namespace (default: the instance name)
    #[arg(short = 'n', long, default_value = "")]
    pub namespace: String,
    /// Use the minimal profile
    #[arg(short = 'm', long)]
    pub minimal: bool,
    /// Image tag
    #[arg(short = 't', long, default_value = "")]
    pub tag: String,
    /// Use the debug profile
    #[arg(short = 'd', long = "debug-profile")]
    pub debug_profile: bool,
    /// Configuration template
    #[arg(short = 'c', long = "config-template", default_value = "")]
    pub configuration_template: String,
    /// Dataset template
    #[arg(short = 'x', long = "dataset-template", default_value = "")]
    pub dataset_template: String,
    /// Image registry
    #[arg(long, default_value = "")]
    pub registry: String,
    /// Image repository
    #[arg(long, default_value = "")]
    pub repository: String,
    /// Replicas per microservice
    #[arg(short = 'r', long, default_value_t = 1)]
    pub replicas: i32,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateTenantArgs {
    /// Tenant name
    pub args: Vec<String>,
    /// Instance the tenant belongs to
    #[arg(short = 'i', long)]
    pub instance: String,
    /// Authorized user ids, comma separated
    #[arg(short = 'u', long = "users", value_delimiter = ',')]
    pub users: Vec<String>,
    /// Authentication token (default: the tenant name)
    #[arg(short = 't', long = "token", default_value = "")]
    pub token: String,
    /// Configuration template
    #[arg(short = 'c', long = "config-template", default_value = "")]
    pub configuration_template: String,
    /// Dataset template
    #[arg(short = 'd', long = "dataset-template", default_value = "")]
    pub dataset_template: String,
}

#[derive(Subcommand, Debug)]
pub enum DeleteCommand {
    /// Delete an instance
    Instance {
        /// Instance name (default: sitewhere)
        args: Vec<String>,
        /// Also delete the instance namespace
        #[arg(short = 'p', long)]
        purge: bool,
    },
    /// Delete a tenant
    Tenant {
        /// Tenant name
        args: Vec<String>,
        /// Instance the tenant belongs to
        #[arg(short = 'i', long)]
        instance: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum LegacyCommand {
    /// Apply the bundled manifests
    Install(LegacyArgs),
    /// Delete the bundled manifests
    Uninstall(LegacyArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct LegacyArgs {
    #[arg(short = 'm', long)]
    pub minimal: bool,
    #[arg(long)]
    pub skip_crd: bool,
    #[arg(long)]
    pub skip_templates: bool,
    #[arg(long)]
    pub skip_operator: bool,
    #[arg(long)]
    pub skip_infra: bool,
}
