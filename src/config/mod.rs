//! Configuration for swctl
//!
//! Settings come from built-in defaults, an optional `~/.swctl/config.yaml`
//! file and `SWCTL_*` / `HELM_*` environment variables.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::SettingsLoader;
pub use schema::{HelmSettings, Settings};
