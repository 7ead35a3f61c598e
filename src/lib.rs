//! swctl library
//!
//! Installs the SiteWhere platform on Kubernetes and manages instances,
//! tenants and microservice logging through SiteWhere custom resources.
//! The binary is a thin wrapper around [`cli::run`].

pub mod chart;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod kube;
pub mod manifests;
pub mod models;
pub mod render;
pub mod repo;
pub mod services;

pub use error::{Error, Result};
