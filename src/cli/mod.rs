//! CLI command handling module
//!
//! Argument parsing, dispatch to the services and output rendering.

mod args;
mod commands;
mod extract;
mod logging;
mod output;
mod version;

pub use args::{
    Cli, Command, CreateCommand, CreateInstanceArgs, CreateTenantArgs, DeleteCommand, InstallArgs,
    LegacyArgs, LegacyCommand,
};
pub use commands::run;
pub use extract::{TooManyArgs, extract_instance_name, extract_tenant_name};
pub use logging::init_logging;
pub use output::{OutputFormat, render, render_one, table};
pub use version::{NAME, VERSION, version_text};
