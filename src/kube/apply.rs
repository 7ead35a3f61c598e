//! Generic apply of manifest objects
//!
//! Well-known kinds go through their typed `Api<K>`; anything else is
//! resolved through the [`RestMapper`] and handled as a `DynamicObject`.
//! Apply is create-if-absent: existing objects are never modified.

use std::fmt;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{DeleteParams, DynamicObject, PostParams};
use kube::core::GroupVersionKind;
use kube::discovery::Scope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::errors::classify;
use super::idempotent::{DeleteOutcome, create_if_absent, delete_if_present};
use super::mapper::RestMapper;
use crate::error::{Error, Result};

/// One object of a multi-document manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestObject {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub body: serde_json::Value,
}

impl ManifestObject {
    /// Parse a decoded manifest document
    pub fn from_value(body: serde_json::Value) -> Result<Self> {
        let field = |path: &[&str]| -> Option<String> {
            let mut cur = &body;
            for key in path {
                cur = cur.get(key)?;
            }
            cur.as_str().map(str::to_string)
        };

        let api_version = field(&["apiVersion"])
            .ok_or_else(|| Error::bad_input("manifest object is missing apiVersion"))?;
        let kind =
            field(&["kind"]).ok_or_else(|| Error::bad_input("manifest object is missing kind"))?;
        let name = field(&["metadata", "name"]).ok_or_else(|| {
            Error::bad_input(format!("{} manifest object is missing metadata.name", kind))
        })?;
        let namespace = field(&["metadata", "namespace"]);

        Ok(Self {
            api_version,
            kind,
            name,
            namespace,
            body,
        })
    }

    pub fn from_yaml(doc: serde_yaml::Value) -> Result<Self> {
        Self::from_value(serde_json::to_value(doc)?)
    }

    pub fn gvk(&self) -> GroupVersionKind {
        match self.api_version.split_once('/') {
            Some((group, version)) => GroupVersionKind::gvk(group, version, &self.kind),
            None => GroupVersionKind::gvk("", &self.api_version, &self.kind),
        }
    }
}

impl fmt::Display for ManifestObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} ({})", self.kind, self.name, ns),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Result of applying one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Unchanged,
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::Created => write!(f, "created"),
            ApplyOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Dispatch an operation to the typed API for well-known kinds
macro_rules! dispatch_typed {
    ($op:ident, $client:expr, $ns:expr, $object:expr, $fallback:expr) => {
        match ($object.api_version.as_str(), $object.kind.as_str()) {
            ("v1", "Namespace") => $op::<Namespace>(Api::all($client.clone()), $object).await,
            ("v1", "Pod") => $op::<Pod>(Api::namespaced($client.clone(), $ns), $object).await,
            ("v1", "ConfigMap") => {
                $op::<ConfigMap>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("v1", "Secret") => $op::<Secret>(Api::namespaced($client.clone(), $ns), $object).await,
            ("v1", "ServiceAccount") => {
                $op::<ServiceAccount>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("v1", "PersistentVolumeClaim") => {
                $op::<PersistentVolumeClaim>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("v1", "Service") => {
                $op::<Service>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("apps/v1", "Deployment") => {
                $op::<Deployment>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("apps/v1", "StatefulSet") => {
                $op::<StatefulSet>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("rbac.authorization.k8s.io/v1", "ClusterRole") => {
                $op::<ClusterRole>(Api::all($client.clone()), $object).await
            }
            ("rbac.authorization.k8s.io/v1", "ClusterRoleBinding") => {
                $op::<ClusterRoleBinding>(Api::all($client.clone()), $object).await
            }
            ("rbac.authorization.k8s.io/v1", "Role") => {
                $op::<Role>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("rbac.authorization.k8s.io/v1", "RoleBinding") => {
                $op::<RoleBinding>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("policy/v1", "PodDisruptionBudget") => {
                $op::<PodDisruptionBudget>(Api::namespaced($client.clone(), $ns), $object).await
            }
            ("apiextensions.k8s.io/v1", "CustomResourceDefinition") => {
                $op::<CustomResourceDefinition>(Api::all($client.clone()), $object).await
            }
            _ => $fallback.await,
        }
    };
}

/// Create the object unless it already exists
pub async fn apply(
    client: &Client,
    mapper: &RestMapper,
    default_namespace: &str,
    object: &ManifestObject,
) -> Result<ApplyOutcome> {
    let namespace = object.namespace.as_deref().unwrap_or(default_namespace);
    tracing::debug!("Applying {}", object);
    dispatch_typed!(
        create_typed,
        client,
        namespace,
        object,
        apply_dynamic(client, mapper, namespace, object)
    )
}

/// Delete the object; a missing object is success
pub async fn delete(
    client: &Client,
    mapper: &RestMapper,
    default_namespace: &str,
    object: &ManifestObject,
) -> Result<DeleteOutcome> {
    let namespace = object.namespace.as_deref().unwrap_or(default_namespace);
    tracing::debug!("Deleting {}", object);
    dispatch_typed!(
        delete_typed,
        client,
        namespace,
        object,
        delete_dynamic(client, mapper, namespace, object)
    )
}

async fn create_typed<K>(api: Api<K>, object: &ManifestObject) -> Result<ApplyOutcome>
where
    K: Resource + Clone + fmt::Debug + Serialize + DeserializeOwned,
{
    let typed: K = serde_json::from_value(object.body.clone())?;
    create_in(&api, object, &typed).await
}

async fn delete_typed<K>(api: Api<K>, object: &ManifestObject) -> Result<DeleteOutcome>
where
    K: Resource + Clone + fmt::Debug + DeserializeOwned,
{
    delete_in(&api, object).await
}

async fn create_in<K>(api: &Api<K>, object: &ManifestObject, typed: &K) -> Result<ApplyOutcome>
where
    K: Resource + Clone + fmt::Debug + Serialize + DeserializeOwned,
{
    let kind = object.kind.as_str();
    let name = object.name.as_str();
    let outcome = create_if_absent(
        kind,
        name,
        || async move { api.get(name).await.map_err(|e| classify(e, kind, name)) },
        || async move {
            api.create(&PostParams::default(), typed)
                .await
                .map_err(|e| classify(e, kind, name))
        },
    )
    .await?;

    Ok(if outcome.was_created() {
        ApplyOutcome::Created
    } else {
        ApplyOutcome::Unchanged
    })
}

async fn delete_in<K>(api: &Api<K>, object: &ManifestObject) -> Result<DeleteOutcome>
where
    K: Resource + Clone + fmt::Debug + DeserializeOwned,
{
    let kind = object.kind.as_str();
    let name = object.name.as_str();
    delete_if_present(kind, name, || async move {
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, kind, name))
    })
    .await
}

async fn dynamic_api(
    client: &Client,
    mapper: &RestMapper,
    namespace: &str,
    object: &ManifestObject,
) -> Result<Api<DynamicObject>> {
    let (resource, caps) = mapper.resolve(&object.gvk()).await?;
    Ok(match caps.scope {
        Scope::Namespaced => Api::namespaced_with(client.clone(), namespace, &resource),
        Scope::Cluster => Api::all_with(client.clone(), &resource),
    })
}

async fn apply_dynamic(
    client: &Client,
    mapper: &RestMapper,
    namespace: &str,
    object: &ManifestObject,
) -> Result<ApplyOutcome> {
    let api = dynamic_api(client, mapper, namespace, object).await?;
    let dynamic: DynamicObject = serde_json::from_value(object.body.clone())?;
    let result = create_in(&api, object, &dynamic).await;
    if matches!(&result, Err(e) if e.is_not_found()) {
        // the resource type itself went away since it was discovered
        mapper.invalidate(&object.gvk());
    }
    result
}

async fn delete_dynamic(
    client: &Client,
    mapper: &RestMapper,
    namespace: &str,
    object: &ManifestObject,
) -> Result<DeleteOutcome> {
    let api = match dynamic_api(client, mapper, namespace, object).await {
        Ok(api) => api,
        // no such resource type means no such object
        Err(e) if e.is_not_found() => return Ok(DeleteOutcome::Absent),
        Err(e) => return Err(e),
    };
    delete_in(&api, object).await
}

/// Parse every object of a multi-document YAML stream, skipping empty documents
pub fn parse_documents(contents: &str) -> Result<Vec<ManifestObject>> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(contents) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        objects.push(ManifestObject::from_yaml(value)?);
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: sitewhere-system
---
# comment-only document
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: sitewhere-operator
  namespace: sitewhere-system
spec:
  replicas: 1
---
apiVersion: networking.istio.io/v1beta1
kind: Gateway
metadata:
  name: sitewhere-gateway
"#;

    #[test]
    fn test_parse_documents() {
        let objects = parse_documents(MANIFEST).unwrap();
        assert_eq!(objects.len(), 3);
        assert_eq!(objects[0].kind, "Namespace");
        assert_eq!(objects[0].namespace, None);
        assert_eq!(objects[1].namespace.as_deref(), Some("sitewhere-system"));
        assert_eq!(objects[1].to_string(), "Deployment/sitewhere-operator (sitewhere-system)");
    }

    #[test]
    fn test_gvk_split() {
        let objects = parse_documents(MANIFEST).unwrap();
        let core = objects[0].gvk();
        assert_eq!((core.group.as_str(), core.version.as_str()), ("", "v1"));
        let istio = objects[2].gvk();
        assert_eq!(istio.group, "networking.istio.io");
        assert_eq!(istio.version, "v1beta1");
        assert_eq!(istio.kind, "Gateway");
    }

    #[test]
    fn test_missing_name_is_bad_input() {
        let err = parse_documents("apiVersion: v1\nkind: ConfigMap\nmetadata: {}\n").unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }
}
