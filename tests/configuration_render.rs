//! Rendering the embedded configuration templates

use swctl::models::{FunctionalArea, Profile};
use swctl::render::{CLIENT_SECRET_NAME, PlaceHolder, load_or_default, render, substitute};

fn placeholder() -> PlaceHolder {
    PlaceHolder {
        instance_name: "iot".to_string(),
        replicas: 2,
        tag: "3.0.4".to_string(),
        registry: "registry.example.com".to_string(),
        repository: "acme".to_string(),
    }
}

fn empty_home() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_default_profile_renders_every_microservice() {
    let home = empty_home();
    let configuration = load_or_default(home.path(), Profile::Default, &placeholder()).unwrap();
    assert_eq!(configuration.microservices.len(), 14);

    for microservice in &configuration.microservices {
        assert_eq!(microservice.replicas, 2);
        let pod = microservice.pod_spec.as_ref().unwrap();
        assert_eq!(pod.docker_spec.registry, "registry.example.com");
        assert_eq!(pod.docker_spec.repository, "acme");
        assert_eq!(pod.docker_spec.tag, "3.0.4");
        assert!(!microservice.debug.as_ref().is_some_and(|d| d.enabled));
    }
}

#[test]
fn test_minimal_profile_is_smaller() {
    let home = empty_home();
    let configuration = load_or_default(home.path(), Profile::Minimal, &placeholder()).unwrap();
    assert_eq!(configuration.microservices.len(), 6);
    assert!(
        configuration
            .microservices
            .iter()
            .any(|m| m.functional_area == FunctionalArea::InstanceManagement)
    );
}

#[test]
fn test_debug_profile_tags_and_ports() {
    let home = empty_home();
    let configuration = load_or_default(home.path(), Profile::Debug, &placeholder()).unwrap();

    for microservice in &configuration.microservices {
        let pod = microservice.pod_spec.as_ref().unwrap();
        assert_eq!(pod.docker_spec.tag, "debug-3.0.4");
        assert!(pod.ports.iter().any(|p| p.name.as_deref() == Some("http-jdwp")));
        assert!(pod.ports.iter().any(|p| p.name.as_deref() == Some("http-jmx")));
        assert!(microservice.debug.as_ref().unwrap().enabled);
    }
}

#[test]
fn test_environment_is_injected() {
    let home = empty_home();
    let configuration = load_or_default(home.path(), Profile::Minimal, &placeholder()).unwrap();
    let env = &configuration.microservices[0].pod_spec.as_ref().unwrap().env;

    let product = env.iter().find(|e| e.name == "sitewhere.config.product.id").unwrap();
    assert_eq!(product.value.as_deref(), Some("iot"));

    let secret = env
        .iter()
        .find(|e| e.name == "sitewhere.config.keycloak.oauth.client.secret")
        .unwrap();
    let selector = secret
        .value_from
        .as_ref()
        .and_then(|v| v.secret_key_ref.as_ref())
        .unwrap();
    assert_eq!(selector.name, CLIENT_SECRET_NAME);
}

#[test]
fn test_user_template_overrides_embedded() {
    let home = empty_home();
    std::fs::write(
        home.path().join("default.yaml"),
        "microservices:\n  - functionalArea: device-management\n    name: Devices for {{ .InstanceName }}\n",
    )
    .unwrap();

    let configuration = load_or_default(home.path(), Profile::Default, &placeholder()).unwrap();
    assert_eq!(configuration.microservices.len(), 1);
    assert_eq!(configuration.microservices[0].name, "Devices for iot");
}

#[test]
fn test_substitute_rejects_unknown_variable() {
    let err = substitute("tag: {{ .Version }}", &placeholder()).unwrap_err();
    assert!(err.to_string().contains("Version"));
}

#[test]
fn test_render_rejects_invalid_yaml() {
    let err = render("microservices: [", &placeholder()).unwrap_err();
    assert!(err.to_string().contains("template does not parse"));
}
