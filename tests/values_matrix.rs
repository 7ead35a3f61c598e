//! Chart values assembled from install flags

use serde_json::json;
use swctl::services::{InstallOptions, set_path, values_matrix};

#[test]
fn test_defaults_enable_everything() {
    let values = values_matrix(&InstallOptions::default());
    assert_eq!(values["operator"]["enabled"], json!(true));
    assert_eq!(values["templates"]["enabled"], json!(true));
    assert_eq!(values["tags"]["infrastructure"], json!(true));
    assert_eq!(values["keycloak"]["enabled"], json!(true));
    assert!(values.get("strimzi").and_then(|s| s.get("replicas")).is_none());
}

#[test]
fn test_skips_disable_components() {
    let options = InstallOptions {
        skip_operator: true,
        skip_templates: true,
        skip_infra: true,
        ..Default::default()
    };
    let values = values_matrix(&options);
    assert_eq!(values["operator"]["enabled"], json!(false));
    assert_eq!(values["templates"]["enabled"], json!(false));
    assert_eq!(values["tags"]["infrastructure"], json!(false));
    for component in ["postgresql", "redis", "strimzi", "mosquitto"] {
        assert_eq!(values[component]["enabled"], json!(false), "{}", component);
    }
}

#[test]
fn test_minimal_single_kafka_replica() {
    let values = values_matrix(&InstallOptions {
        minimal: true,
        ..Default::default()
    });
    assert_eq!(values["strimzi"]["replicas"], json!(1));
    assert_eq!(values["strimzi"]["isr"], json!(1));
}

#[test]
fn test_storage_settings() {
    let values = values_matrix(&InstallOptions {
        storage_class: "fast-ssd".to_string(),
        kafka_storage_size: "20Gi".to_string(),
        ..Default::default()
    });
    assert_eq!(values["redis"]["master"]["persistence"]["storageClass"], json!("fast-ssd"));
    assert_eq!(values["postgresql"]["global"]["storageClass"], json!("fast-ssd"));
    assert_eq!(values["strimzi"]["storage"]["class"], json!("fast-ssd"));
    assert_eq!(values["strimzi"]["storage"]["type"], json!("persistent-claim"));
    assert_eq!(values["strimzi"]["storage"]["size"], json!("20Gi"));
}

#[test]
fn test_set_path_replaces_scalars() {
    let mut values = json!({ "redis": "off" });
    set_path(&mut values, "redis.master.enabled", json!(true));
    assert_eq!(values, json!({ "redis": { "master": { "enabled": true } } }));
}
