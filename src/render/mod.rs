//! Configuration renderer
//!
//! Turns a profile's microservice template into the list of
//! [`MicroserviceSpec`]s an instance is created with. Templates use
//! `{{ .Variable }}` placeholders; the recognised variables are
//! `InstanceName`, `Replicas`, `Tag`, `Registry` and `Repository`.

mod embedded;
mod environment;
mod template;

pub use embedded::embedded_template;
pub use environment::{CLIENT_SECRET_KEY, CLIENT_SECRET_NAME, inject_environment};
pub use template::{substitute, substitute_with};

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INSTANCE_NAME, DEFAULT_REGISTRY, DEFAULT_REPOSITORY, DEFAULT_TAG};
use crate::error::{Error, Result};
use crate::models::{DebugSpecification, MicroserviceSpec, Profile};

/// Values substituted into a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceHolder {
    pub instance_name: String,
    pub replicas: i32,
    pub tag: String,
    pub registry: String,
    pub repository: String,
}

impl Default for PlaceHolder {
    fn default() -> Self {
        Self {
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            replicas: 1,
            tag: DEFAULT_TAG.to_string(),
            registry: DEFAULT_REGISTRY.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
        }
    }
}

impl PlaceHolder {
    /// Value of a template variable, `None` for unknown names
    pub fn lookup(&self, variable: &str) -> Option<String> {
        match variable {
            "InstanceName" => Some(self.instance_name.clone()),
            "Replicas" => Some(self.replicas.to_string()),
            "Tag" => Some(self.tag.clone()),
            "Registry" => Some(self.registry.clone()),
            "Repository" => Some(self.repository.clone()),
            _ => None,
        }
    }
}

/// A rendered template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub microservices: Vec<MicroserviceSpec>,
}

/// Read the user's template for `profile` from `home`
///
/// Returns `NotFound` when the user has no override, which callers treat
/// as a cue to use the embedded template.
pub fn load_template(home: &Path, profile: Profile) -> Result<String> {
    let path = home.join(profile.template_file());
    if !path.is_file() {
        return Err(Error::not_found("template", path.display().to_string()));
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read template {}", path.display()))?;
    tracing::debug!("Using template {}", path.display());
    Ok(text)
}

/// Substitute placeholders and parse the result
pub fn render(template: &str, placeholder: &PlaceHolder) -> Result<Configuration> {
    let text = substitute(template, placeholder)?;
    let configuration: Configuration = serde_yaml::from_str(&text)
        .map_err(|e| Error::bad_input(format!("template does not parse: {}", e)))?;
    validate(&configuration)?;
    Ok(configuration)
}

/// One microservice per functional area, one override per logger
fn validate(configuration: &Configuration) -> Result<()> {
    let mut seen_areas = HashSet::new();
    for microservice in &configuration.microservices {
        if !seen_areas.insert(microservice.functional_area) {
            return Err(Error::bad_input(format!(
                "duplicate functional area '{}' in template",
                microservice.functional_area
            )));
        }
        let Some(logging) = &microservice.logging else {
            continue;
        };
        let mut seen_loggers = HashSet::new();
        for entry in &logging.overrides {
            if !seen_loggers.insert(entry.logger.as_str()) {
                return Err(Error::bad_input(format!(
                    "duplicate logger '{}' in overrides of '{}'",
                    entry.logger, microservice.functional_area
                )));
            }
        }
    }
    Ok(())
}

/// Render the user's template for `profile`, or the embedded one
pub fn load_or_default(home: &Path, profile: Profile, placeholder: &PlaceHolder) -> Result<Configuration> {
    let placeholder = match profile {
        Profile::Debug => PlaceHolder {
            tag: format!("debug-{}", placeholder.tag),
            ..placeholder.clone()
        },
        _ => placeholder.clone(),
    };

    let template = match load_template(home, profile) {
        Ok(text) => text,
        Err(e) if e.is_not_found() => {
            tracing::debug!("No user template for {:?}, using embedded template", profile);
            embedded_template(profile).to_string()
        }
        Err(e) => return Err(e),
    };

    let mut configuration = render(&template, &placeholder)?;
    for microservice in &mut configuration.microservices {
        inject_environment(microservice, &placeholder.instance_name)?;
    }
    if profile.is_debug() {
        enable_debug(&mut configuration);
    }
    Ok(configuration)
}

/// Turn on remote debugging and expose the JDWP and JMX ports
pub fn enable_debug(configuration: &mut Configuration) {
    use k8s_openapi::api::core::v1::{ContainerPort, ServicePort};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    for (i, microservice) in configuration.microservices.iter_mut().enumerate() {
        let offset = i as i32 + 1;
        let debug = microservice.debug.get_or_insert_with(DebugSpecification::default);
        debug.enabled = true;
        if debug.jdwp_port == 0 {
            debug.jdwp_port = 8000 + offset;
        }
        if debug.jmx_port == 0 {
            debug.jmx_port = 1100 + offset;
        }
        let ports = [("http-jdwp", debug.jdwp_port), ("http-jmx", debug.jmx_port)];

        let pod = microservice.pod_spec.get_or_insert_with(Default::default);
        if !pod.docker_spec.tag.starts_with("debug-") {
            pod.docker_spec.tag = format!("debug-{}", pod.docker_spec.tag);
        }
        for (name, port) in ports {
            if !pod.ports.iter().any(|p| p.container_port == port) {
                pod.ports.push(ContainerPort {
                    name: Some(name.to_string()),
                    container_port: port,
                    ..Default::default()
                });
            }
        }

        let service = microservice.service_spec.get_or_insert_with(Default::default);
        for (name, port) in ports {
            if !service.ports.iter().any(|p| p.port == port) {
                service.ports.push(ServicePort {
                    name: Some(name.to_string()),
                    port,
                    target_port: Some(IntOrString::Int(port)),
                    ..Default::default()
                });
            }
        }
    }
}
