//! Standard environment entries every microservice pod receives

use k8s_openapi::api::core::v1::EnvVar;
use serde_json::json;

use crate::error::Result;
use crate::models::MicroserviceSpec;

/// Secret holding the identity provider client secret
pub const CLIENT_SECRET_NAME: &str = "sitewhere-keycloak-client";

/// Key within [`CLIENT_SECRET_NAME`]
pub const CLIENT_SECRET_KEY: &str = "client-secret";

fn standard_entries(instance_name: &str) -> Result<Vec<EnvVar>> {
    let values = [
        json!({
            "name": "sitewhere.config.k8s.name",
            "valueFrom": { "fieldRef": { "fieldPath": "metadata.name" } }
        }),
        json!({
            "name": "sitewhere.config.k8s.namespace",
            "valueFrom": { "fieldRef": { "fieldPath": "metadata.namespace" } }
        }),
        json!({
            "name": "sitewhere.config.k8s.pod.ip",
            "valueFrom": { "fieldRef": { "fieldPath": "status.podIP" } }
        }),
        json!({
            "name": "sitewhere.config.product.id",
            "value": instance_name
        }),
        json!({
            "name": "sitewhere.config.keycloak.oauth.client.secret",
            "valueFrom": {
                "secretKeyRef": { "name": CLIENT_SECRET_NAME, "key": CLIENT_SECRET_KEY }
            }
        }),
    ];
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(Into::into))
        .collect()
}

/// Add the standard entries to a microservice's pod spec, keeping any
/// entry the template already sets
pub fn inject_environment(microservice: &mut MicroserviceSpec, instance_name: &str) -> Result<()> {
    let pod = microservice.pod_spec.get_or_insert_with(Default::default);
    for entry in standard_entries(instance_name)? {
        if !pod.env.iter().any(|e| e.name == entry.name) {
            pod.env.push(entry);
        }
    }
    Ok(())
}
